//! Testing utilities for sessions
//!
//! - **MemoryConnector**: engine double persisting `nvmefs://` databases into
//!   a fake device's blocks
//!
//! # Example
//!
//! ```ignore
//! use nvmefs_device::testing::FakeNvme;
//! use nvmefs_session::testing::MemoryConnector;
//!
//! let fake = Arc::new(FakeNvme::new("/dev/nvme1", 1 << 20));
//! let connector = MemoryConnector::new().with_device(fake.clone(), 1);
//! ```

mod memory_engine;

pub use memory_engine::{MemoryConnection, MemoryConnector};

//! Testing utilities for device administration
//!
//! - **FakeNvme**: in-memory controller implementing `DeviceAdmin` and block I/O
//! - **ScriptedRunner**: replays canned `nvme` outputs and records invocations
//!
//! # Example
//!
//! ```ignore
//! use nvmefs_device::testing::FakeNvme;
//! use nvmefs_device::DeviceManager;
//!
//! let manager = DeviceManager::new(FakeNvme::new("/dev/nvme1", 1 << 30));
//! let mut device = manager.open("/dev/nvme1")?;
//! manager.provision(&mut device, 1, true)?;
//! ```

mod fake_nvme;
mod scripted_runner;

pub use fake_nvme::{AdminOp, BlockDevice, FakeNvme, MAX_PLACEMENT_HANDLES};
pub use scripted_runner::ScriptedRunner;

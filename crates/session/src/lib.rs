//! # nvmefs sessions
//!
//! Binds a provisioned device and an engine connection to a fixture scope.
//!
//! [`SessionController::acquire`] opens and (depending on scope) provisions
//! the device, connects the engine with the requested resource budget, loads
//! the storage extension and registers the [`BackendSecret`] pointing at the
//! device. The returned [`SessionGuard`] closes the connection and
//! deallocates the device exactly once, on release or on drop.
//!
//! ```text
//! let controller = SessionController::new(DeviceManager::new(NvmeCli::new()), connector);
//! let backend = BackendConfig::default()
//!     .with_placement()
//!     .attach("nvmefs:///tpch.db", "tpch");
//! let mut session = controller.acquire(FixtureScope::Module, "/dev/ng1n1", &backend)?;
//! session.execute("CALL dbgen(sf=1);")?;
//! session.release()?;
//! ```

#![warn(missing_docs)]

mod controller;
mod engine;
mod env;
mod scope;
mod secret;

pub mod testing;

pub use controller::{Attachment, BackendConfig, SessionController, SessionGuard, EXTENSION_SUFFIX};
pub use engine::{EngineConfig, EngineConnection, EngineConnector};
pub use env::EnvToggle;
pub use scope::FixtureScope;
pub use secret::{BackendSecret, Transport, SECRET_NAME, SECRET_SCOPE};

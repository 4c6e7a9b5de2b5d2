//! nvmefs harness - device lifecycle and reference validation for the nvmefs
//! storage backend
//!
//! The harness drives a raw NVMe device through namespace provisioning,
//! placement-mode configuration and teardown, binds the device to an engine
//! session for the duration of a test scope, and validates query results
//! produced under a constrained memory budget against reference answers.
//!
//! # Quick Start
//!
//! ```ignore
//! use nvmefs_harness::{
//!     BackendConfig, DeviceManager, EngineConfig, FixtureScope, NvmeCli, ReferenceWorkload,
//!     SessionController,
//! };
//!
//! let controller = SessionController::new(DeviceManager::new(NvmeCli::new()), connector);
//! let backend = BackendConfig {
//!     engine: EngineConfig::spill_profile(),
//!     ..BackendConfig::default()
//! }
//! .attach("nvmefs:///tpch.db", "tpch");
//!
//! controller.with_session(FixtureScope::Module, "/dev/ng1n1", &backend, |conn| {
//!     nvmefs_harness::tpch::generate(conn, 1)?;
//!     ReferenceWorkload::tpch(1, 1)?.run(conn)?.into_result()
//! })?;
//! ```
//!
//! # Crates
//!
//! | Module | Crate | Role |
//! |--------|-------|------|
//! | [`common`] | `nvmefs-core` | errors, values, config, fixed limits |
//! | [`device`] | `nvmefs-device` | `nvme` CLI administration and lifecycle |
//! | [`session`] | `nvmefs-session` | scoped device + engine sessions |
//! | [`reference`] | `nvmefs-reference` | reference parsing and validation |

pub use nvmefs_core as common;
pub use nvmefs_device as device;
pub use nvmefs_reference as reference;
pub use nvmefs_session as session;

pub use nvmefs_core::{Divergence, Error, HarnessConfig, Result, Row, Value};
pub use nvmefs_device::{Device, DeviceAdmin, DeviceManager, Namespace, NvmeCli, ProvisioningState};
pub use nvmefs_reference::{
    parse, tpch, validate, ColumnSchema, ColumnType, ReferenceWorkload, ValidationOutcome,
};
pub use nvmefs_session::{
    BackendConfig, BackendSecret, EngineConfig, EngineConnection, EngineConnector, FixtureScope,
    SessionController, SessionGuard, Transport,
};

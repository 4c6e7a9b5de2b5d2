//! # nvmefs device lifecycle
//!
//! Drives a physical NVMe device through namespace provisioning, placement
//! mode (FDP) configuration and teardown via the `nvme` administrative CLI.
//!
//! ## Layers
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Command executor | [`CommandRunner`] | run one external program, capture status and output |
//! | Capability | [`DeviceAdmin`] | one method per administrative action |
//! | Implementation | [`NvmeCli`] | `DeviceAdmin` over `nvme` |
//! | Lifecycle | [`DeviceManager`] | sequencing and state tracking |
//!
//! ## Quick Start
//!
//! ```text
//! use nvmefs_device::{DeviceManager, NvmeCli};
//!
//! let manager = DeviceManager::new(NvmeCli::new());
//! let mut device = manager.open("/dev/nvme1")?;
//! let ns = manager.provision(&mut device, 1, true)?;   // 7 placement handles
//! // ... run the workload ...
//! manager.teardown(&mut device, 1)?;
//! ```

#![warn(missing_docs)]

mod admin;
mod command;
mod device;
mod manager;
mod nvme_cli;

pub mod testing;

pub use admin::DeviceAdmin;
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use device::{parse_device_id, Device, Namespace, NamespaceSpec, ProvisioningState};
pub use manager::{DeviceManager, DeviceProfile};
pub use nvme_cli::{parse_tnvmcap, NvmeCli};

//! Device and namespace model
//!
//! A [`Device`] is owned exclusively by one [`DeviceManager`] caller for the
//! duration of a test scope. Its capacity is read once when the device is
//! opened and never changes afterwards.
//!
//! [`DeviceManager`]: crate::DeviceManager

use nvmefs_core::{Error, Result};
use std::fmt;
use std::path::Path;

/// Provisioning lifecycle of a device within one scope.
///
/// ```text
/// Unconfigured ──► Provisioned ──► InUse ──► TornDown
///      │  ▲             │  ▲          │
///      │  └─────────────┘  └──────────┘ (re-provision)
///      └──────────────────────────► InUse / TornDown
/// ```
///
/// `TornDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    /// Opened, nothing configured by this scope yet
    Unconfigured,
    /// Namespace created and attached with the requested placement mode
    Provisioned,
    /// Handed to an engine connection as its storage backend
    InUse,
    /// Erased at scope exit; no further configuration allowed
    TornDown,
}

impl ProvisioningState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: ProvisioningState) -> bool {
        use ProvisioningState::*;
        match (self, next) {
            (TornDown, _) => false,
            (_, TornDown) => true,
            (Unconfigured, Provisioned) | (Unconfigured, InUse) => true,
            (Provisioned, Provisioned) | (Provisioned, InUse) => true,
            (InUse, Provisioned) => true,
            _ => false,
        }
    }

    /// Returns true for the terminal state
    pub fn is_terminal(self) -> bool {
        self == ProvisioningState::TornDown
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::Unconfigured => "unconfigured",
            ProvisioningState::Provisioned => "provisioned",
            ProvisioningState::InUse => "in use",
            ProvisioningState::TornDown => "torn down",
        };
        f.write_str(s)
    }
}

/// A namespace as created by the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Namespace identifier (nsid)
    pub namespace_id: u32,
    /// Size in logical blocks; never exceeds the device capacity
    pub capacity_blocks: u64,
    /// Whether placement handles were assigned at creation
    pub placement_enabled: bool,
    /// Number of placement handles; 0 unless `placement_enabled`
    pub placement_handle_count: u16,
}

/// Parameters of a `create-ns` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    /// Namespace the caller intends to attach afterwards
    pub namespace_id: u32,
    /// Logical block size in bytes
    pub block_size: u32,
    /// Namespace size (`nsze`) in blocks
    pub size_blocks: u64,
    /// Namespace capacity (`ncap`) in blocks
    pub capacity_blocks: u64,
    /// Placement handle indices; empty when placement is disabled
    pub placement_handles: Vec<u16>,
}

/// A block device opened by the manager
#[derive(Debug, Clone)]
pub struct Device {
    pub(crate) path: String,
    pub(crate) block_size: u32,
    pub(crate) device_id: u32,
    pub(crate) capacity_blocks: u64,
    pub(crate) state: ProvisioningState,
    pub(crate) placement_enabled: Option<bool>,
    pub(crate) namespace: Option<Namespace>,
}

impl Device {
    pub(crate) fn new(path: String, block_size: u32, device_id: u32, capacity_blocks: u64) -> Self {
        Self {
            path,
            block_size,
            device_id,
            capacity_blocks,
            state: ProvisioningState::Unconfigured,
            placement_enabled: None,
            namespace: None,
        }
    }

    /// Device node path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Logical block size in bytes
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Controller index derived from the path
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Total capacity in logical blocks
    pub fn capacity_blocks(&self) -> u64 {
        self.capacity_blocks
    }

    /// Total capacity in bytes
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_blocks * u64::from(self.block_size)
    }

    /// Current provisioning state
    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Last placement mode set through the manager; `None` if never set
    pub fn placement_enabled(&self) -> Option<bool> {
        self.placement_enabled
    }

    /// Namespace created by the manager in this scope, if any
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Block device node of namespace `namespace_id` under `dev_root`
    pub fn namespace_node(&self, dev_root: &Path, namespace_id: u32) -> std::path::PathBuf {
        dev_root.join(format!("nvme{}n{}", self.device_id, namespace_id))
    }

    pub(crate) fn transition(&mut self, next: ProvisioningState, op: &'static str) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(self.invalid_state(op));
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn ensure_configurable(&self, op: &'static str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid_state(op));
        }
        Ok(())
    }

    fn invalid_state(&self, op: &'static str) -> Error {
        Error::InvalidState {
            device: self.path.clone(),
            state: self.state.to_string(),
            op,
        }
    }
}

/// Derive the controller index from a device path.
///
/// `/dev/nvme1`, `/dev/nvme1n1` and `/dev/ng1n1` all map to `1`. Any other
/// name falls back to its trailing digits.
pub fn parse_device_id(device_path: &str) -> Result<u32> {
    let name = Path::new(device_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(device_path);

    let rest = name
        .strip_prefix("nvme")
        .or_else(|| name.strip_prefix("ng"));

    let digits: String = match rest {
        Some(rest) => rest.chars().take_while(|c| c.is_ascii_digit()).collect(),
        None => {
            let tail: String = name
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            tail.chars().rev().collect()
        }
    };

    digits.parse().map_err(|_| Error::DeviceQuery {
        device: device_path.to_string(),
        reason: "cannot derive controller index from device path".to_string(),
    })
}

//! Device lifecycle manager
//!
//! [`DeviceManager`] sequences administrative actions over a [`DeviceAdmin`]
//! and tracks each [`Device`]'s [`ProvisioningState`]. The individual actions
//! are thin; what the manager adds is ordering:
//!
//! - erase before recreate: an existing namespace is deallocated, then deleted
//! - placement before create: FDP is toggled device-wide before `create-ns`,
//!   because placement handles can only be assigned at creation time
//!
//! [`DeviceManager::provision`] encodes that order as a single transition so
//! individual tests cannot drift from it.

use crate::admin::DeviceAdmin;
use crate::device::{parse_device_id, Device, Namespace, NamespaceSpec, ProvisioningState};
use nvmefs_core::config::DeviceSection;
use nvmefs_core::limits::{
    placement_handles, BLOCK_SIZE, DEFAULT_ATTACH_CONTROLLERS, PLACEMENT_HANDLE_COUNT,
};
use nvmefs_core::{Error, Result};

/// Fixed parameters applied to every device the manager opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Logical block size in bytes
    pub block_size: u32,
    /// Placement handles requested when FDP is enabled
    pub placement_handle_count: u16,
    /// Controller list for `attach-ns`
    pub attach_controllers: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            placement_handle_count: PLACEMENT_HANDLE_COUNT,
            attach_controllers: DEFAULT_ATTACH_CONTROLLERS.to_string(),
        }
    }
}

impl From<&DeviceSection> for DeviceProfile {
    fn from(section: &DeviceSection) -> Self {
        Self {
            block_size: section.block_size,
            placement_handle_count: section.placement_handles,
            attach_controllers: section.attach_controllers.clone(),
        }
    }
}

/// Drives devices through provisioning, placement configuration and teardown
#[derive(Debug)]
pub struct DeviceManager<A> {
    admin: A,
    profile: DeviceProfile,
}

impl<A: DeviceAdmin> DeviceManager<A> {
    /// Manager with the default profile (4 KiB blocks, 7 placement handles)
    pub fn new(admin: A) -> Self {
        Self::with_profile(admin, DeviceProfile::default())
    }

    /// Manager with an explicit profile
    pub fn with_profile(admin: A, profile: DeviceProfile) -> Self {
        Self { admin, profile }
    }

    /// The administration backend
    pub fn admin(&self) -> &A {
        &self.admin
    }

    /// The profile applied to opened devices
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Open a device and read its capacity.
    ///
    /// Capacity is queried once and cached on the returned [`Device`].
    ///
    /// # Errors
    ///
    /// [`Error::DeviceQuery`] if the identity query fails, the capacity field
    /// is unparseable or zero, the profile's block size is zero, or no
    /// controller index can be derived from the path.
    pub fn open(&self, device_path: &str) -> Result<Device> {
        let device_id = parse_device_id(device_path)?;
        let capacity_bytes = self.admin.identify(device_path)?;
        let capacity_blocks = capacity_bytes
            .checked_div(u64::from(self.profile.block_size))
            .ok_or_else(|| Error::DeviceQuery {
                device: device_path.to_string(),
                reason: "profile block size is zero".to_string(),
            })?;
        if capacity_blocks == 0 {
            return Err(Error::DeviceQuery {
                device: device_path.to_string(),
                reason: format!(
                    "reported capacity of {} bytes is smaller than one {}-byte block",
                    capacity_bytes, self.profile.block_size
                ),
            });
        }

        tracing::info!(
            target: "nvmefs::device",
            device = device_path,
            device_id,
            capacity_blocks,
            block_size = self.profile.block_size,
            "opened device"
        );

        Ok(Device::new(
            device_path.to_string(),
            self.profile.block_size,
            device_id,
            capacity_blocks,
        ))
    }

    /// Deallocate every block of `namespace_id`.
    ///
    /// A missing namespace node is a no-op success, so teardown paths can
    /// call this unconditionally, any number of times, in any state.
    pub fn deallocate(&self, device: &Device, namespace_id: u32) -> Result<()> {
        if !self.admin.namespace_exists(device, namespace_id) {
            tracing::debug!(
                target: "nvmefs::device",
                device = device.path(),
                namespace_id,
                "namespace absent, nothing to deallocate"
            );
            return Ok(());
        }

        self.admin
            .deallocate(device, namespace_id, 0, device.capacity_blocks())?;

        tracing::debug!(
            target: "nvmefs::device",
            device = device.path(),
            namespace_id,
            blocks = device.capacity_blocks(),
            "deallocated namespace"
        );
        Ok(())
    }

    /// Enable flexible data placement device-wide.
    pub fn enable_placement(&self, device: &mut Device) -> Result<()> {
        self.set_placement(device, true)
    }

    /// Disable flexible data placement device-wide.
    pub fn disable_placement(&self, device: &mut Device) -> Result<()> {
        self.set_placement(device, false)
    }

    fn set_placement(&self, device: &mut Device, enabled: bool) -> Result<()> {
        device.ensure_configurable("set placement")?;
        self.admin.set_placement(device, enabled)?;
        device.placement_enabled = Some(enabled);
        Ok(())
    }

    /// Delete a namespace.
    ///
    /// Callers check existence first with [`DeviceAdmin::namespace_exists`];
    /// deleting an absent namespace is reported by the device as a failure.
    pub fn delete_namespace(&self, device: &mut Device, namespace_id: u32) -> Result<()> {
        device.ensure_configurable("delete namespace")?;
        self.admin.delete_namespace(device, namespace_id)?;
        if device
            .namespace
            .as_ref()
            .is_some_and(|ns| ns.namespace_id == namespace_id)
        {
            device.namespace = None;
        }
        Ok(())
    }

    /// Create a full-capacity namespace and attach it.
    ///
    /// With `enable_placement`, the profile's placement handle set is
    /// requested as part of creation.
    ///
    /// # Errors
    ///
    /// [`Error::Namespace`] if either step fails. When attach fails after a
    /// successful create, the namespace is left in place un-attached; it is
    /// not rolled back and the caller has to clean it up.
    pub fn create_namespace(
        &self,
        device: &mut Device,
        namespace_id: u32,
        enable_placement: bool,
    ) -> Result<Namespace> {
        device.ensure_configurable("create namespace")?;

        let handles = if enable_placement {
            placement_handles(self.profile.placement_handle_count)
        } else {
            Vec::new()
        };
        let spec = NamespaceSpec {
            namespace_id,
            block_size: self.profile.block_size,
            size_blocks: device.capacity_blocks(),
            capacity_blocks: device.capacity_blocks(),
            placement_handles: handles,
        };

        self.admin.create_namespace(device, &spec)?;

        if let Err(e) =
            self.admin
                .attach_namespace(device, namespace_id, &self.profile.attach_controllers)
        {
            tracing::warn!(
                target: "nvmefs::device",
                device = device.path(),
                namespace_id,
                error = %e,
                "attach failed after create; namespace left un-attached"
            );
            return Err(e);
        }

        let namespace = Namespace {
            namespace_id,
            capacity_blocks: spec.capacity_blocks,
            placement_enabled: enable_placement,
            placement_handle_count: spec.placement_handles.len() as u16,
        };
        device.namespace = Some(namespace.clone());

        tracing::info!(
            target: "nvmefs::device",
            device = device.path(),
            namespace_id,
            capacity_blocks = namespace.capacity_blocks,
            placement_handles = namespace.placement_handle_count,
            "created namespace"
        );
        Ok(namespace)
    }

    /// Bring `namespace_id` to a fresh state with the requested placement mode.
    ///
    /// Probe → (deallocate + delete if present) → set placement → create.
    /// Moves the device to [`ProvisioningState::Provisioned`].
    ///
    /// The probe looks for the namespace's device node, which only exists
    /// once the namespace is attached. A namespace left behind by a failed
    /// attach is invisible to it; remove it with
    /// [`delete_namespace`](Self::delete_namespace) before provisioning again.
    pub fn provision(
        &self,
        device: &mut Device,
        namespace_id: u32,
        enable_placement: bool,
    ) -> Result<Namespace> {
        device.ensure_configurable("provision")?;

        if self.admin.namespace_exists(device, namespace_id) {
            self.deallocate(device, namespace_id)?;
            self.delete_namespace(device, namespace_id)?;
        }

        if enable_placement {
            self.enable_placement(device)?;
        } else {
            self.disable_placement(device)?;
        }

        let namespace = self.create_namespace(device, namespace_id, enable_placement)?;
        device.transition(ProvisioningState::Provisioned, "provision")?;
        Ok(namespace)
    }

    /// Record that an engine connection now uses the device.
    pub fn mark_in_use(&self, device: &mut Device) -> Result<()> {
        device.transition(ProvisioningState::InUse, "mark in use")
    }

    /// Deallocate `namespace_id` and retire the device for this scope.
    ///
    /// Calling this on an already torn-down device only repeats the erase.
    pub fn teardown(&self, device: &mut Device, namespace_id: u32) -> Result<()> {
        self.deallocate(device, namespace_id)?;
        if !device.state().is_terminal() {
            device.transition(ProvisioningState::TornDown, "teardown")?;
        }
        tracing::info!(
            target: "nvmefs::device",
            device = device.path(),
            namespace_id,
            "device torn down"
        );
        Ok(())
    }
}

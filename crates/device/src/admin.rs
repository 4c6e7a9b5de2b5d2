//! Device administration capability
//!
//! [`DeviceAdmin`] is the seam between the lifecycle manager and the
//! privileged interface that actually changes the device. The real
//! implementation shells out to `nvme` ([`NvmeCli`]); tests use
//! [`FakeNvme`](crate::testing::FakeNvme).
//!
//! Every method is a thin, fallible wrapper around one administrative action.
//! Sequencing (erase before recreate, placement before create) is the
//! manager's job, not the implementor's.
//!
//! [`NvmeCli`]: crate::NvmeCli

use crate::device::{Device, NamespaceSpec};
use nvmefs_core::Result;

/// Administrative actions the harness needs from a device
pub trait DeviceAdmin: Send + Sync {
    /// Total NVM capacity of the controller at `device_path`, in bytes.
    ///
    /// # Errors
    ///
    /// [`DeviceQuery`](nvmefs_core::Error::DeviceQuery) if the identity query
    /// fails or its capacity field is missing or unparseable.
    fn identify(&self, device_path: &str) -> Result<u64>;

    /// Deallocate `block_count` blocks starting at `start_block`.
    fn deallocate(
        &self,
        device: &Device,
        namespace_id: u32,
        start_block: u64,
        block_count: u64,
    ) -> Result<()>;

    /// Turn the device-wide placement (FDP) feature on or off.
    fn set_placement(&self, device: &Device, enabled: bool) -> Result<()>;

    /// Create a namespace. Does not attach it.
    fn create_namespace(&self, device: &Device, spec: &NamespaceSpec) -> Result<()>;

    /// Attach a created namespace to `controllers`.
    fn attach_namespace(&self, device: &Device, namespace_id: u32, controllers: &str)
        -> Result<()>;

    /// Delete a namespace.
    fn delete_namespace(&self, device: &Device, namespace_id: u32) -> Result<()>;

    /// Existence probe for the namespace's device node.
    ///
    /// Absence is not an error; it means there is nothing to erase or delete.
    fn namespace_exists(&self, device: &Device, namespace_id: u32) -> bool;
}

impl<A: DeviceAdmin + ?Sized> DeviceAdmin for std::sync::Arc<A> {
    fn identify(&self, device_path: &str) -> Result<u64> {
        (**self).identify(device_path)
    }

    fn deallocate(
        &self,
        device: &Device,
        namespace_id: u32,
        start_block: u64,
        block_count: u64,
    ) -> Result<()> {
        (**self).deallocate(device, namespace_id, start_block, block_count)
    }

    fn set_placement(&self, device: &Device, enabled: bool) -> Result<()> {
        (**self).set_placement(device, enabled)
    }

    fn create_namespace(&self, device: &Device, spec: &NamespaceSpec) -> Result<()> {
        (**self).create_namespace(device, spec)
    }

    fn attach_namespace(
        &self,
        device: &Device,
        namespace_id: u32,
        controllers: &str,
    ) -> Result<()> {
        (**self).attach_namespace(device, namespace_id, controllers)
    }

    fn delete_namespace(&self, device: &Device, namespace_id: u32) -> Result<()> {
        (**self).delete_namespace(device, namespace_id)
    }

    fn namespace_exists(&self, device: &Device, namespace_id: u32) -> bool {
        (**self).namespace_exists(device, namespace_id)
    }
}

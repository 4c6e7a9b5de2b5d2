//! In-memory NVMe device
//!
//! [`FakeNvme`] implements [`DeviceAdmin`] with the rules a real controller
//! enforces on the harness's call sequences:
//!
//! - a namespace id can only be created once until deleted
//! - placement handles can only be requested while FDP is enabled
//! - attach requires a created, not-yet-attached namespace
//! - the namespace node only exists once the namespace is attached
//!
//! It also stores namespace blocks so an engine double can persist through
//! it, and deallocation erases them.

use crate::admin::DeviceAdmin;
use crate::device::{Device, NamespaceSpec};
use nvmefs_core::limits::BLOCK_SIZE;
use nvmefs_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;

/// Maximum placement handles the fake controller supports
pub const MAX_PLACEMENT_HANDLES: usize = 8;

/// Administrative operations, for call accounting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminOp {
    /// `id-ctrl`
    Identify,
    /// `dsm --ad`
    Deallocate,
    /// `set-feature 0x1D`
    SetPlacement,
    /// `create-ns`
    CreateNamespace,
    /// `attach-ns`
    AttachNamespace,
    /// `delete-ns`
    DeleteNamespace,
}

#[derive(Debug, Default)]
struct FakeNamespace {
    capacity_blocks: u64,
    placement_handles: Vec<u16>,
    attached: bool,
    blocks: BTreeMap<u64, Vec<u8>>,
}

#[derive(Debug, Default)]
struct FakeState {
    placement_enabled: bool,
    namespaces: BTreeMap<u32, FakeNamespace>,
    fail_next: HashSet<AdminOp>,
    calls: HashMap<AdminOp, usize>,
    history: Vec<AdminOp>,
}

/// Block-level access to a device's namespaces
///
/// Unwritten and deallocated blocks read back as zeroes.
pub trait BlockDevice: Send + Sync {
    /// Device path the blocks belong to
    fn device_path(&self) -> &str;

    /// Logical block size in bytes
    fn block_size(&self) -> u32;

    /// Read one block
    fn read_block(&self, namespace_id: u32, lba: u64) -> Result<Vec<u8>>;

    /// Write one block; shorter data is zero-padded
    fn write_block(&self, namespace_id: u32, lba: u64, data: &[u8]) -> Result<()>;
}

/// In-memory NVMe controller with one set of namespaces
#[derive(Debug)]
pub struct FakeNvme {
    path: String,
    capacity_bytes: u64,
    block_size: u32,
    state: Mutex<FakeState>,
}

impl FakeNvme {
    /// Controller at `path` reporting `capacity_bytes` of NVM
    pub fn new(path: impl Into<String>, capacity_bytes: u64) -> Self {
        Self {
            path: path.into(),
            capacity_bytes,
            block_size: BLOCK_SIZE,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Device path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Make the next invocation of `op` fail
    pub fn fail_next(&self, op: AdminOp) {
        self.state.lock().fail_next.insert(op);
    }

    /// Number of times `op` was invoked
    pub fn calls(&self, op: AdminOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every invocation in order
    pub fn history(&self) -> Vec<AdminOp> {
        self.state.lock().history.clone()
    }

    /// Current device-wide placement flag
    pub fn placement_enabled(&self) -> bool {
        self.state.lock().placement_enabled
    }

    /// Handles assigned to `namespace_id`, `None` if it does not exist
    pub fn placement_handles(&self, namespace_id: u32) -> Option<Vec<u16>> {
        self.state
            .lock()
            .namespaces
            .get(&namespace_id)
            .map(|ns| ns.placement_handles.clone())
    }

    /// Whether `namespace_id` has been created (attached or not)
    pub fn namespace_created(&self, namespace_id: u32) -> bool {
        self.state.lock().namespaces.contains_key(&namespace_id)
    }

    /// Whether `namespace_id` is attached
    pub fn namespace_attached(&self, namespace_id: u32) -> bool {
        self.state
            .lock()
            .namespaces
            .get(&namespace_id)
            .is_some_and(|ns| ns.attached)
    }

    /// Number of blocks currently holding data in `namespace_id`
    pub fn written_blocks(&self, namespace_id: u32) -> usize {
        self.state
            .lock()
            .namespaces
            .get(&namespace_id)
            .map_or(0, |ns| ns.blocks.len())
    }

    /// Read one block of an attached namespace
    pub fn read_block(&self, namespace_id: u32, lba: u64) -> Result<Vec<u8>> {
        let state = self.state.lock();
        let ns = attached_namespace(&state, &self.path, namespace_id)?;
        check_lba(ns, lba)?;
        Ok(ns
            .blocks
            .get(&lba)
            .cloned()
            .unwrap_or_else(|| vec![0; self.block_size as usize]))
    }

    /// Write one block of an attached namespace
    pub fn write_block(&self, namespace_id: u32, lba: u64, data: &[u8]) -> Result<()> {
        if data.len() > self.block_size as usize {
            return Err(io_error(
                io::ErrorKind::InvalidInput,
                format!("write of {} bytes exceeds block size", data.len()),
            ));
        }
        let mut state = self.state.lock();
        let path = self.path.clone();
        let ns = state
            .namespaces
            .get_mut(&namespace_id)
            .filter(|ns| ns.attached)
            .ok_or_else(|| no_namespace(&path, namespace_id))?;
        check_lba(ns, lba)?;
        let mut block = vec![0; self.block_size as usize];
        block[..data.len()].copy_from_slice(data);
        ns.blocks.insert(lba, block);
        Ok(())
    }

    /// Record the call and consume an injected failure, if any
    fn enter(&self, op: AdminOp) -> bool {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        state.history.push(op);
        state.fail_next.remove(&op)
    }

    fn namespace_error(&self, namespace_id: u32, op: &'static str, reason: &str) -> Error {
        Error::Namespace {
            device: self.path.clone(),
            namespace_id,
            op,
            reason: reason.to_string(),
        }
    }
}

fn attached_namespace<'a>(
    state: &'a FakeState,
    path: &str,
    namespace_id: u32,
) -> Result<&'a FakeNamespace> {
    state
        .namespaces
        .get(&namespace_id)
        .filter(|ns| ns.attached)
        .ok_or_else(|| no_namespace(path, namespace_id))
}

fn check_lba(ns: &FakeNamespace, lba: u64) -> Result<()> {
    if lba >= ns.capacity_blocks {
        return Err(io_error(
            io::ErrorKind::InvalidInput,
            format!("lba {} beyond capacity {}", lba, ns.capacity_blocks),
        ));
    }
    Ok(())
}

fn no_namespace(path: &str, namespace_id: u32) -> Error {
    io_error(
        io::ErrorKind::NotFound,
        format!("{path}: namespace {namespace_id} is not attached"),
    )
}

fn io_error(kind: io::ErrorKind, msg: String) -> Error {
    Error::Io(io::Error::new(kind, msg))
}

impl DeviceAdmin for FakeNvme {
    fn identify(&self, device_path: &str) -> Result<u64> {
        let injected = self.enter(AdminOp::Identify);
        if injected || device_path != self.path {
            return Err(Error::DeviceQuery {
                device: device_path.to_string(),
                reason: "exit status 1: No such device".to_string(),
            });
        }
        Ok(self.capacity_bytes)
    }

    fn deallocate(
        &self,
        device: &Device,
        namespace_id: u32,
        start_block: u64,
        block_count: u64,
    ) -> Result<()> {
        let injected = self.enter(AdminOp::Deallocate);
        let dealloc_error = |reason: &str| Error::Deallocation {
            device: device.path().to_string(),
            namespace_id,
            reason: reason.to_string(),
        };
        if injected {
            return Err(dealloc_error("exit status 1: injected failure"));
        }
        let mut state = self.state.lock();
        let ns = state
            .namespaces
            .get_mut(&namespace_id)
            .filter(|ns| ns.attached)
            .ok_or_else(|| dealloc_error("exit status 1: INVALID_NS"))?;
        let end = start_block.saturating_add(block_count);
        ns.blocks.retain(|lba, _| *lba < start_block || *lba >= end);
        Ok(())
    }

    fn set_placement(&self, device: &Device, enabled: bool) -> Result<()> {
        if self.enter(AdminOp::SetPlacement) {
            return Err(Error::DeviceConfig {
                device: device.path().to_string(),
                feature: format!("fdp={}", if enabled { "on" } else { "off" }),
                status: "exit status 1: injected failure".to_string(),
            });
        }
        self.state.lock().placement_enabled = enabled;
        Ok(())
    }

    fn create_namespace(&self, _device: &Device, spec: &NamespaceSpec) -> Result<()> {
        let id = spec.namespace_id;
        if self.enter(AdminOp::CreateNamespace) {
            return Err(self.namespace_error(id, "create", "exit status 1: injected failure"));
        }
        let mut state = self.state.lock();
        if state.namespaces.contains_key(&id) {
            return Err(self.namespace_error(id, "create", "NS_ID_UNAVAILABLE"));
        }
        if !spec.placement_handles.is_empty() && !state.placement_enabled {
            return Err(self.namespace_error(id, "create", "placement handles require FDP"));
        }
        if spec.placement_handles.len() > MAX_PLACEMENT_HANDLES {
            return Err(self.namespace_error(id, "create", "too many placement handles"));
        }
        let device_blocks = self.capacity_bytes / u64::from(spec.block_size.max(1));
        if spec.capacity_blocks > spec.size_blocks || spec.size_blocks > device_blocks {
            return Err(self.namespace_error(id, "create", "NS_INSUFFICIENT_CAPACITY"));
        }
        state.namespaces.insert(
            id,
            FakeNamespace {
                capacity_blocks: spec.capacity_blocks,
                placement_handles: spec.placement_handles.clone(),
                attached: false,
                blocks: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn attach_namespace(
        &self,
        _device: &Device,
        namespace_id: u32,
        _controllers: &str,
    ) -> Result<()> {
        if self.enter(AdminOp::AttachNamespace) {
            return Err(self.namespace_error(
                namespace_id,
                "attach",
                "exit status 1: injected failure",
            ));
        }
        let mut state = self.state.lock();
        match state.namespaces.get_mut(&namespace_id) {
            None => Err(self.namespace_error(namespace_id, "attach", "INVALID_NS")),
            Some(ns) if ns.attached => {
                Err(self.namespace_error(namespace_id, "attach", "NS_ALREADY_ATTACHED"))
            }
            Some(ns) => {
                ns.attached = true;
                Ok(())
            }
        }
    }

    fn delete_namespace(&self, _device: &Device, namespace_id: u32) -> Result<()> {
        if self.enter(AdminOp::DeleteNamespace) {
            return Err(self.namespace_error(
                namespace_id,
                "delete",
                "exit status 1: injected failure",
            ));
        }
        let mut state = self.state.lock();
        if state.namespaces.remove(&namespace_id).is_none() {
            return Err(self.namespace_error(namespace_id, "delete", "INVALID_NS"));
        }
        Ok(())
    }

    fn namespace_exists(&self, _device: &Device, namespace_id: u32) -> bool {
        self.namespace_attached(namespace_id)
    }
}

impl BlockDevice for FakeNvme {
    fn device_path(&self) -> &str {
        &self.path
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn read_block(&self, namespace_id: u32, lba: u64) -> Result<Vec<u8>> {
        FakeNvme::read_block(self, namespace_id, lba)
    }

    fn write_block(&self, namespace_id: u32, lba: u64, data: &[u8]) -> Result<()> {
        FakeNvme::write_block(self, namespace_id, lba, data)
    }
}

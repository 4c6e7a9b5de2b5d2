//! Shared test utilities for the workspace integration suites.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nvmefs_harness::device::testing::{AdminOp, FakeNvme};
use nvmefs_harness::device::NamespaceSpec;
use nvmefs_harness::session::testing::MemoryConnector;
use nvmefs_harness::{
    BackendConfig, BackendSecret, Device, DeviceAdmin, DeviceManager, EngineConfig,
    EngineConnection, EngineConnector, Result, SessionController, Transport,
};

pub const DEVICE_PATH: &str = "/dev/ng1n1";
pub const NAMESPACE_ID: u32 = 1;
pub const DATABASE_URI: &str = "nvmefs:///test.db";

/// Fake device capacity: 512 blocks of 4 KiB
pub const CAPACITY_BYTES: u64 = 512 * 4096;

/// `DeviceAdmin` that counts deallocations before delegating to a fake
pub struct SpyAdmin {
    pub inner: Arc<FakeNvme>,
    pub deallocations: AtomicUsize,
}

impl SpyAdmin {
    pub fn new(inner: Arc<FakeNvme>) -> Self {
        Self {
            inner,
            deallocations: AtomicUsize::new(0),
        }
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }
}

impl DeviceAdmin for SpyAdmin {
    fn identify(&self, device_path: &str) -> Result<u64> {
        self.inner.identify(device_path)
    }

    fn deallocate(&self, device: &Device, namespace_id: u32, start: u64, count: u64) -> Result<()> {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.inner.deallocate(device, namespace_id, start, count)
    }

    fn set_placement(&self, device: &Device, enabled: bool) -> Result<()> {
        self.inner.set_placement(device, enabled)
    }

    fn create_namespace(&self, device: &Device, spec: &NamespaceSpec) -> Result<()> {
        self.inner.create_namespace(device, spec)
    }

    fn attach_namespace(
        &self,
        device: &Device,
        namespace_id: u32,
        controllers: &str,
    ) -> Result<()> {
        self.inner.attach_namespace(device, namespace_id, controllers)
    }

    fn delete_namespace(&self, device: &Device, namespace_id: u32) -> Result<()> {
        self.inner.delete_namespace(device, namespace_id)
    }

    fn namespace_exists(&self, device: &Device, namespace_id: u32) -> bool {
        self.inner.namespace_exists(device, namespace_id)
    }
}

/// A fake device, an engine double persisting into it, and a controller over both
pub struct Rig {
    pub fake: Arc<FakeNvme>,
    pub spy: Arc<SpyAdmin>,
    pub connector: Arc<MemoryConnector>,
    pub controller: SessionController<Arc<SpyAdmin>, Arc<MemoryConnector>>,
}

impl Rig {
    pub fn new() -> Self {
        let fake = Arc::new(FakeNvme::new(DEVICE_PATH, CAPACITY_BYTES));
        let spy = Arc::new(SpyAdmin::new(fake.clone()));
        let connector = Arc::new(MemoryConnector::new().with_device(fake.clone(), NAMESPACE_ID));
        let controller = SessionController::new(DeviceManager::new(spy.clone()), connector.clone());
        Self {
            fake,
            spy,
            connector,
            controller,
        }
    }

    pub fn manager(&self) -> &DeviceManager<Arc<SpyAdmin>> {
        self.controller.manager()
    }

    /// Provision the namespace outside any session
    pub fn provision(&self, enable_placement: bool) {
        let mut device = self.manager().open(DEVICE_PATH).unwrap();
        self.manager()
            .provision(&mut device, NAMESPACE_ID, enable_placement)
            .unwrap();
    }

    /// Open a connection with the storage secret registered and the test
    /// database attached, bypassing the controller
    pub fn connect(&self) -> Box<dyn EngineConnection> {
        let mut conn = self.connector.connect(&EngineConfig::new()).unwrap();
        conn.load_extension("nvmefs").unwrap();
        conn.register_secret(&BackendSecret::new(DEVICE_PATH, Transport::IoUringCmd))
            .unwrap();
        conn.attach(DATABASE_URI, "test").unwrap();
        conn
    }

    /// Reopen the test database from the persistent secret alone
    pub fn reopen(&self) -> Box<dyn EngineConnection> {
        self.connector
            .connect(&EngineConfig::new().database(DATABASE_URI))
            .unwrap()
    }

    pub fn deallocate_calls(&self) -> usize {
        self.fake.calls(AdminOp::Deallocate)
    }
}

pub fn backend() -> BackendConfig {
    BackendConfig::default().attach(DATABASE_URI, "test")
}

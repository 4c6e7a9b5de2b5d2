//! Fixture session controller
//!
//! Binds device setup and teardown to a test scope. [`SessionController::acquire`]
//! returns a [`SessionGuard`]; releasing it (explicitly or by dropping it,
//! including while unwinding from a panicking test body) closes the engine
//! connection and then deallocates the device, exactly once.
//!
//! Order matters on release: deallocating before the connection is closed
//! races with the engine's in-flight writes.

use crate::engine::{EngineConfig, EngineConnection, EngineConnector};
use crate::env::EnvToggle;
use crate::scope::FixtureScope;
use crate::secret::{BackendSecret, Transport};
use nvmefs_core::limits::{DEFAULT_NAMESPACE_ID, PLACEMENT_HANDLE_COUNT};
use nvmefs_core::{HarnessConfig, Result};
use nvmefs_device::{Device, DeviceAdmin, DeviceManager};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

/// File extension of packaged engine extensions
pub const EXTENSION_SUFFIX: &str = "duckdb_extension";

/// Database attached after the secret is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Database URI, e.g. `nvmefs:///tpch.db`
    pub uri: String,
    /// Alias it is attached and selected under
    pub alias: String,
}

/// How one acquisition configures the device and the engine
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// I/O transport named in the secret
    pub transport: Transport,
    /// Namespace provisioned and erased
    pub namespace_id: u32,
    /// Enable FDP when provisioning
    pub enable_placement: bool,
    /// Placement handles advertised in the secret
    pub placement_handles: Option<u16>,
    /// Override the scope's default provisioning decision
    pub provision: Option<bool>,
    /// Engine connection settings
    pub engine: EngineConfig,
    /// Extensions loaded before the secret is registered
    pub extensions: Vec<String>,
    /// Directory searched for packaged extension artifacts
    pub extension_dir: Option<PathBuf>,
    /// Database attached after registration
    pub attach: Option<Attachment>,
    /// Variable switched on for driver-bypass transports
    pub hugepages_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            namespace_id: DEFAULT_NAMESPACE_ID,
            enable_placement: false,
            placement_handles: None,
            provision: None,
            engine: EngineConfig::new(),
            extensions: vec!["nvmefs".to_string()],
            extension_dir: None,
            attach: None,
            hugepages_env: "NVMEFS_HUGEPAGES".to_string(),
        }
    }
}

impl BackendConfig {
    /// Backend configuration described by a harness config file
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::try_from(&config.transport)?,
            namespace_id: config.device.namespace_id,
            engine: EngineConfig::from(&config.engine),
            extension_dir: Some(config.engine.extension_dir.clone()),
            hugepages_env: config.transport.hugepages_env.clone(),
            ..Self::default()
        })
    }

    /// Provision with FDP and advertise the default handle set
    pub fn with_placement(mut self) -> Self {
        self.enable_placement = true;
        self.placement_handles = Some(PLACEMENT_HANDLE_COUNT);
        self
    }

    /// Attach `uri` as `alias` once the secret is registered
    pub fn attach(mut self, uri: impl Into<String>, alias: impl Into<String>) -> Self {
        self.attach = Some(Attachment {
            uri: uri.into(),
            alias: alias.into(),
        });
        self
    }

    /// Whether an acquisition in `scope` provisions the device
    pub fn should_provision(&self, scope: FixtureScope) -> bool {
        self.provision
            .unwrap_or_else(|| scope.provisions_by_default())
    }

    /// Name or artifact path passed to the engine for `extension`.
    ///
    /// An artifact `<extension_dir>/<name>.duckdb_extension` is preferred;
    /// without one the bare name is used and the engine resolves it.
    pub fn resolve_extension(&self, extension: &str) -> String {
        if let Some(dir) = &self.extension_dir {
            let artifact = dir.join(format!("{extension}.{EXTENSION_SUFFIX}"));
            if artifact.is_file() {
                return artifact.to_string_lossy().into_owned();
            }
        }
        extension.to_string()
    }

    /// Secret registered for `device_path`
    pub fn secret(&self, device_path: &str) -> BackendSecret {
        let secret = BackendSecret::new(device_path, self.transport.clone());
        match self.placement_handles {
            Some(count) => secret.with_placement_handles(count),
            None => secret,
        }
    }
}

/// Acquires devices and engine connections for test scopes
#[derive(Debug)]
pub struct SessionController<A, C> {
    manager: DeviceManager<A>,
    connector: C,
}

impl<A: DeviceAdmin, C: EngineConnector> SessionController<A, C> {
    /// Controller over `manager`, opening connections with `connector`
    pub fn new(manager: DeviceManager<A>, connector: C) -> Self {
        Self { manager, connector }
    }

    /// The device manager
    pub fn manager(&self) -> &DeviceManager<A> {
        &self.manager
    }

    /// The engine connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Set up `device_path` and an engine connection backed by it.
    ///
    /// If setup fails after the device was opened, deallocation is still
    /// attempted; its failure is logged and the setup error is returned.
    pub fn acquire(
        &self,
        scope: FixtureScope,
        device_path: &str,
        backend: &BackendConfig,
    ) -> Result<SessionGuard<'_, A>> {
        let mut device = self.manager.open(device_path)?;

        match self.setup(&mut device, scope, backend) {
            Ok((connection, hugepages)) => {
                tracing::info!(
                    target: "nvmefs::session",
                    scope = %scope,
                    device = device_path,
                    transport = %backend.transport,
                    "session acquired"
                );
                Ok(SessionGuard {
                    manager: &self.manager,
                    device,
                    namespace_id: backend.namespace_id,
                    scope,
                    connection,
                    hugepages,
                    released: false,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.manager.deallocate(&device, backend.namespace_id) {
                    tracing::warn!(
                        target: "nvmefs::session",
                        device = device_path,
                        error = %cleanup,
                        "deallocation after failed setup also failed"
                    );
                }
                Err(e)
            }
        }
    }

    fn setup(
        &self,
        device: &mut Device,
        scope: FixtureScope,
        backend: &BackendConfig,
    ) -> Result<(Box<dyn EngineConnection>, Option<EnvToggle>)> {
        if backend.should_provision(scope) {
            self.manager
                .provision(device, backend.namespace_id, backend.enable_placement)?;
        }

        let hugepages = backend
            .transport
            .requires_hugepages()
            .then(|| EnvToggle::enable(backend.hugepages_env.clone()));

        let mut connection = self.connector.connect(&backend.engine)?;
        let configured = self
            .configure(connection.as_mut(), device.path(), backend)
            .and_then(|()| self.manager.mark_in_use(device));

        if let Err(e) = configured {
            if let Err(close) = connection.close() {
                tracing::warn!(
                    target: "nvmefs::session",
                    device = device.path(),
                    error = %close,
                    "closing connection after failed setup also failed"
                );
            }
            return Err(e);
        }
        Ok((connection, hugepages))
    }

    fn configure(
        &self,
        connection: &mut dyn EngineConnection,
        device_path: &str,
        backend: &BackendConfig,
    ) -> Result<()> {
        for extension in &backend.extensions {
            connection.load_extension(&backend.resolve_extension(extension))?;
        }
        connection.register_secret(&backend.secret(device_path))?;
        if let Some(attachment) = &backend.attach {
            connection.attach(&attachment.uri, &attachment.alias)?;
        }
        Ok(())
    }

    /// Run `body` inside an acquisition and release afterwards.
    ///
    /// The body's error wins over a release error; the latter is logged.
    pub fn with_session<T>(
        &self,
        scope: FixtureScope,
        device_path: &str,
        backend: &BackendConfig,
        body: impl FnOnce(&mut dyn EngineConnection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.acquire(scope, device_path, backend)?;
        let result = body(guard.connection());
        let released = guard.release();
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release)) => Err(release),
            (Err(e), released) => {
                if let Err(release) = released {
                    tracing::warn!(
                        target: "nvmefs::session",
                        device = device_path,
                        error = %release,
                        "release failed after test body error"
                    );
                }
                Err(e)
            }
        }
    }
}

/// A device and engine connection held for one scope
///
/// Dereferences to the engine connection.
pub struct SessionGuard<'a, A: DeviceAdmin> {
    manager: &'a DeviceManager<A>,
    device: Device,
    namespace_id: u32,
    scope: FixtureScope,
    connection: Box<dyn EngineConnection>,
    hugepages: Option<EnvToggle>,
    released: bool,
}

impl<'a, A: DeviceAdmin> SessionGuard<'a, A> {
    /// The engine connection
    pub fn connection(&mut self) -> &mut dyn EngineConnection {
        self.connection.as_mut()
    }

    /// The device backing this session
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Scope of the acquisition
    pub fn scope(&self) -> FixtureScope {
        self.scope
    }

    /// Namespace erased on release
    pub fn namespace_id(&self) -> u32 {
        self.namespace_id
    }

    /// Close the connection, then deallocate the device.
    ///
    /// Deallocation runs even when closing fails; the first error is returned.
    pub fn release(mut self) -> Result<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let closed = self.connection.close();
        if let Err(e) = &closed {
            tracing::warn!(
                target: "nvmefs::session",
                device = self.device.path(),
                error = %e,
                "engine connection failed to close"
            );
        }
        let torn_down = self.manager.teardown(&mut self.device, self.namespace_id);
        self.hugepages.take();

        tracing::info!(
            target: "nvmefs::session",
            scope = %self.scope,
            device = self.device.path(),
            "session released"
        );
        closed.and(torn_down)
    }
}

impl<'a, A: DeviceAdmin> Deref for SessionGuard<'a, A> {
    type Target = dyn EngineConnection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl<'a, A: DeviceAdmin> DerefMut for SessionGuard<'a, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl<'a, A: DeviceAdmin> Drop for SessionGuard<'a, A> {
    fn drop(&mut self) {
        if let Err(e) = self.release_once() {
            tracing::warn!(
                target: "nvmefs::session",
                device = self.device.path(),
                error = %e,
                "release during drop failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConnector;
    use nvmefs_core::{Error, Value};
    use nvmefs_device::testing::{AdminOp, FakeNvme};
    use nvmefs_device::ProvisioningState;
    use std::sync::Arc;

    const PATH: &str = "/dev/nvme1";

    fn setup() -> (
        Arc<FakeNvme>,
        Arc<MemoryConnector>,
        SessionController<Arc<FakeNvme>, Arc<MemoryConnector>>,
    ) {
        let fake = Arc::new(FakeNvme::new(PATH, 256 * 4096));
        let connector = Arc::new(MemoryConnector::new().with_device(fake.clone(), 1));
        let controller =
            SessionController::new(DeviceManager::new(fake.clone()), connector.clone());
        (fake, connector, controller)
    }

    fn backend() -> BackendConfig {
        BackendConfig::default().attach("nvmefs:///test.db", "test")
    }

    #[test]
    fn module_scope_provisions_and_marks_in_use() {
        let (fake, _, controller) = setup();
        let guard = controller
            .acquire(FixtureScope::Module, PATH, &backend().with_placement())
            .unwrap();
        assert_eq!(guard.device().state(), ProvisioningState::InUse);
        assert_eq!(fake.placement_handles(1), Some(vec![0, 1, 2, 3, 4, 5, 6]));
        guard.release().unwrap();
    }

    #[test]
    fn test_scope_does_not_provision() {
        let (fake, _, controller) = setup();
        let guard = controller
            .acquire(FixtureScope::Test, PATH, &BackendConfig::default())
            .unwrap();
        assert_eq!(fake.calls(AdminOp::CreateNamespace), 0);
        drop(guard);
    }

    #[test]
    fn release_closes_then_deallocates_once() {
        let (fake, connector, controller) = setup();
        let mut guard = controller
            .acquire(FixtureScope::Module, PATH, &backend())
            .unwrap();
        guard.execute("CREATE TABLE t (a INTEGER);").unwrap();
        guard.release().unwrap();

        assert_eq!(connector.closed(), 1);
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
        assert_eq!(fake.written_blocks(1), 0);
    }

    #[test]
    fn drop_releases_after_panic() {
        let (fake, connector, controller) = setup();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = controller
                .acquire(FixtureScope::Module, PATH, &backend())
                .unwrap();
            guard.execute("CREATE TABLE t (a INTEGER);").unwrap();
            panic!("test body failed");
        }));

        assert!(outcome.is_err());
        assert_eq!(connector.closed(), 1);
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
    }

    #[test]
    fn with_session_releases_after_body_error() {
        let (fake, connector, controller) = setup();
        let result: Result<()> =
            controller.with_session(FixtureScope::Module, PATH, &backend(), |_| {
                Err(Error::engine("assertion failed"))
            });

        assert!(matches!(result, Err(Error::Engine(msg)) if msg == "assertion failed"));
        assert_eq!(connector.closed(), 1);
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
    }

    #[test]
    fn with_session_returns_body_value() {
        let (_, _, controller) = setup();
        let rows = controller
            .with_session(FixtureScope::Module, PATH, &backend(), |conn| {
                conn.execute("CREATE TABLE t (a INTEGER);")?;
                conn.execute("INSERT INTO t VALUES (5);")?;
                conn.query("SELECT * FROM t;")
            })
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Int(5)]]);
    }

    #[test]
    fn setup_failure_still_deallocates() {
        let (fake, connector, controller) = setup();
        let bad = BackendConfig {
            extensions: Vec::new(),
            ..backend()
        };

        let err = controller
            .acquire(FixtureScope::Module, PATH, &bad)
            .err()
            .unwrap();

        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(connector.closed(), 1);
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
    }

    #[test]
    fn provisioning_failure_is_returned() {
        let (fake, connector, controller) = setup();
        fake.fail_next(AdminOp::SetPlacement);
        let err = controller
            .acquire(FixtureScope::Module, PATH, &backend())
            .err()
            .unwrap();
        assert!(matches!(err, Error::DeviceConfig { .. }));
        assert_eq!(connector.opened(), 0);
    }

    #[test]
    fn deallocation_failure_does_not_mask_setup_error() {
        let (fake, _, controller) = setup();
        fake.fail_next(AdminOp::Deallocate);
        let bad = BackendConfig {
            extensions: Vec::new(),
            ..backend()
        };

        let err = controller
            .acquire(FixtureScope::Module, PATH, &bad)
            .err()
            .unwrap();

        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
    }

    #[test]
    fn close_failure_still_deallocates() {
        let (fake, connector, controller) = setup();
        let guard = controller
            .acquire(FixtureScope::Module, PATH, &backend())
            .unwrap();
        connector.fail_next_close();

        let err = guard.release().unwrap_err();

        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(fake.calls(AdminOp::Deallocate), 1);
    }

    #[test]
    fn spdk_transport_toggles_hugepages() {
        let (_, _, controller) = setup();
        let key = "NVMEFS_CONTROLLER_TEST_HUGEPAGES";
        let config = BackendConfig {
            transport: Transport::Spdk { asynchronous: true },
            hugepages_env: key.to_string(),
            ..backend()
        };
        let guard = controller
            .acquire(FixtureScope::Module, PATH, &config)
            .unwrap();
        assert_eq!(std::env::var(key).unwrap(), "1");
        guard.release().unwrap();
        assert!(std::env::var_os(key).is_none());
    }

    #[test]
    fn secret_names_device_and_handles() {
        let (_, connector, controller) = setup();
        let guard = controller
            .acquire(FixtureScope::Module, PATH, &backend().with_placement())
            .unwrap();
        let secret = connector.secret().unwrap();
        assert_eq!(secret.device_path, PATH);
        assert_eq!(secret.placement_handles, Some(7));
        assert_eq!(secret.transport, Transport::IoUringCmd);
        drop(guard);
    }

    #[test]
    fn extension_artifact_preferred_over_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nvmefs.duckdb_extension"), b"").unwrap();
        let config = BackendConfig {
            extension_dir: Some(dir.path().to_path_buf()),
            ..BackendConfig::default()
        };
        assert!(config.resolve_extension("nvmefs").ends_with("nvmefs.duckdb_extension"));
        assert_eq!(config.resolve_extension("tpch"), "tpch");
    }

    #[test]
    fn from_config_reads_sections() {
        let mut config = HarnessConfig::default();
        config.transport.backend = "spdk_sync".into();
        config.engine.threads = Some(1);
        let backend = BackendConfig::from_config(&config).unwrap();
        assert_eq!(
            backend.transport,
            Transport::Spdk {
                asynchronous: false
            }
        );
        assert_eq!(backend.engine.threads, Some(1));
        assert_eq!(backend.namespace_id, 1);
    }
}

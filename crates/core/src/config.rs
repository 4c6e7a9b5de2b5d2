//! Harness configuration via `nvmefs-harness.toml`
//!
//! Everything the test runner needs to know about the device, the engine and
//! the I/O transport lives in one file. On first use a commented default is
//! written; command-line flags override individual fields.

use crate::limits::{
    BLOCK_SIZE, DEFAULT_ATTACH_CONTROLLERS, DEFAULT_NAMESPACE_ID, PLACEMENT_HANDLE_COUNT,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "nvmefs-harness.toml";

/// Backend names accepted in `[transport] backend`.
pub const BACKENDS: &[&str] = &[
    "io_uring",
    "io_uring_cmd",
    "libaio",
    "posix",
    "spdk_async",
    "spdk_sync",
    "fabrics",
];

/// Backends that bypass the kernel driver and need a controller address.
const ADDRESSED_BACKENDS: &[&str] = &["fabrics"];

/// `[device]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Device node handed to the admin CLI and the engine
    #[serde(default = "default_device_path")]
    pub path: String,
    /// Logical block size in bytes
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    /// Namespace provisioned and erased by the harness
    #[serde(default = "default_namespace_id")]
    pub namespace_id: u32,
    /// Placement handles requested when FDP is enabled
    #[serde(default = "default_placement_handles")]
    pub placement_handles: u16,
    /// Controller list for `attach-ns`
    #[serde(default = "default_attach_controllers")]
    pub attach_controllers: String,
    /// Admin CLI binary
    #[serde(default = "default_nvme_binary")]
    pub nvme_binary: String,
    /// Directory holding namespace block device nodes
    #[serde(default = "default_dev_root")]
    pub dev_root: PathBuf,
}

fn default_device_path() -> String {
    "/dev/ng1n1".to_string()
}
fn default_block_size() -> u32 {
    BLOCK_SIZE
}
fn default_namespace_id() -> u32 {
    DEFAULT_NAMESPACE_ID
}
fn default_placement_handles() -> u16 {
    PLACEMENT_HANDLE_COUNT
}
fn default_attach_controllers() -> String {
    DEFAULT_ATTACH_CONTROLLERS.to_string()
}
fn default_nvme_binary() -> String {
    "nvme".to_string()
}
fn default_dev_root() -> PathBuf {
    PathBuf::from("/dev")
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            block_size: default_block_size(),
            namespace_id: default_namespace_id(),
            placement_handles: default_placement_handles(),
            attach_controllers: default_attach_controllers(),
            nvme_binary: default_nvme_binary(),
            dev_root: default_dev_root(),
        }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Engine memory limit, e.g. `"75MB"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
    /// Worker threads; part of the reproducibility contract for spill tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    /// Allow loading locally built (unsigned) extensions
    #[serde(default = "default_true")]
    pub allow_unsigned_extensions: bool,
    /// Directory holding the packaged extension artifacts
    #[serde(default = "default_extension_dir")]
    pub extension_dir: PathBuf,
}

fn default_true() -> bool {
    true
}
fn default_extension_dir() -> PathBuf {
    PathBuf::from("../../build/release/extension")
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            memory_limit: None,
            threads: None,
            allow_unsigned_extensions: true,
            extension_dir: default_extension_dir(),
        }
    }
}

/// `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportSection {
    /// One of [`BACKENDS`]
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Controller address for network-attached devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_address: Option<String>,
    /// Environment variable switched on while a driver-bypass transport is in use
    #[serde(default = "default_hugepages_env")]
    pub hugepages_env: String,
}

fn default_backend() -> String {
    "io_uring_cmd".to_string()
}
fn default_hugepages_env() -> String {
    "NVMEFS_HUGEPAGES".to_string()
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            controller_address: None,
            hugepages_env: default_hugepages_env(),
        }
    }
}

/// Harness configuration loaded from `nvmefs-harness.toml`.
///
/// # Example
///
/// ```toml
/// [device]
/// path = "/dev/ng1n1"
///
/// [engine]
/// memory_limit = "75MB"
/// threads = 1
///
/// [transport]
/// backend = "io_uring_cmd"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Device parameters
    #[serde(default)]
    pub device: DeviceSection,
    /// Engine parameters
    #[serde(default)]
    pub engine: EngineSection,
    /// I/O transport parameters
    #[serde(default)]
    pub transport: TransportSection,
}

impl HarnessConfig {
    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown backend, a fabrics backend without a
    /// controller address, a zero block size, or zero threads.
    pub fn validate(&self) -> Result<()> {
        let backend = self.transport.backend.as_str();
        if !BACKENDS.contains(&backend) {
            return Err(Error::config(format!(
                "unknown backend '{}', expected one of {}",
                backend,
                BACKENDS.join(", ")
            )));
        }
        if ADDRESSED_BACKENDS.contains(&backend) && self.transport.controller_address.is_none() {
            return Err(Error::config(format!(
                "backend '{}' requires transport.controller_address",
                backend
            )));
        }
        if self.device.block_size == 0 {
            return Err(Error::config("device.block_size must be non-zero"));
        }
        if self.engine.threads == Some(0) {
            return Err(Error::config("engine.threads must be at least 1"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# nvmefs harness configuration

[device]
# Device node used for administration and as the engine's storage backend
path = "/dev/ng1n1"
block_size = 4096
namespace_id = 1
# Placement handles requested when FDP is enabled
placement_handles = 7
attach_controllers = "0x7"
nvme_binary = "nvme"
dev_root = "/dev"

[engine]
# Spill tests pin these to force deterministic spilling
# memory_limit = "75MB"
# threads = 1
allow_unsigned_extensions = true
extension_dir = "../../build/release/extension"

[transport]
# io_uring, io_uring_cmd, libaio, posix, spdk_async, spdk_sync or fabrics
backend = "io_uring_cmd"
# controller_address = "192.168.0.10:4420"   # required for fabrics
hugepages_env = "NVMEFS_HUGEPAGES"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: HarnessConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = HarnessConfig::default();
        config.validate().unwrap();
        assert_eq!(config.device.path, "/dev/ng1n1");
        assert_eq!(config.device.block_size, 4096);
        assert_eq!(config.device.placement_handles, 7);
        assert_eq!(config.transport.backend, "io_uring_cmd");
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config: HarnessConfig = toml::from_str(HarnessConfig::default_toml()).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();
        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config: HarnessConfig = toml::from_str("[transport]\nbackend = \"dpdk\"").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn fabrics_requires_address() {
        let config: HarnessConfig = toml::from_str("[transport]\nbackend = \"fabrics\"").unwrap();
        assert!(config.validate().is_err());

        let config: HarnessConfig = toml::from_str(
            "[transport]\nbackend = \"fabrics\"\ncontroller_address = \"10.0.0.2:4420\"",
        )
        .unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn zero_threads_is_rejected() {
        let config: HarnessConfig = toml::from_str("[engine]\nthreads = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[device]\npath = \"/dev/nvme0\"\n").unwrap();

        HarnessConfig::write_default_if_missing(&path).unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.device.path, "/dev/nvme0");
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = HarnessConfig::default();
        config.engine.memory_limit = Some("75MB".to_string());
        config.engine.threads = Some(1);
        config.transport.backend = "spdk_async".to_string();

        config.write_to_file(&path).unwrap();
        let loaded = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

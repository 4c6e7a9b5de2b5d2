//! Storage backend secret and I/O transports
//!
//! The engine resolves the nvmefs storage backend through a named secret
//! holding the device, the I/O backend and the number of placement handles
//! it may use.

use nvmefs_core::config::TransportSection;
use nvmefs_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Secret name and type registered with the engine
pub const SECRET_NAME: &str = "nvmefs";

/// Scope URI prefix the secret applies to
pub const SECRET_SCOPE: &str = "nvmefs://";

/// I/O path between the storage backend and the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// Kernel io_uring on the block device
    IoUring,
    /// io_uring passthrough commands on the generic char device
    #[default]
    IoUringCmd,
    /// Linux native AIO
    Libaio,
    /// Synchronous POSIX I/O
    Posix,
    /// User-space driver, bypassing the kernel
    Spdk {
        /// Asynchronous submission
        asynchronous: bool,
    },
    /// Network-attached controller reached through the user-space driver
    Fabrics {
        /// Controller address, e.g. `10.0.0.2:4420`
        controller_address: String,
    },
}

impl Transport {
    /// Parse a backend name as written in config or on the command line.
    ///
    /// `fabrics` requires `controller_address`.
    pub fn parse(backend: &str, controller_address: Option<&str>) -> Result<Self> {
        let transport = match backend {
            "io_uring" => Transport::IoUring,
            "io_uring_cmd" => Transport::IoUringCmd,
            "libaio" => Transport::Libaio,
            "posix" => Transport::Posix,
            "spdk_async" => Transport::Spdk { asynchronous: true },
            "spdk_sync" => Transport::Spdk {
                asynchronous: false,
            },
            "fabrics" => {
                let address = controller_address.ok_or_else(|| {
                    Error::config("fabrics transport requires a controller address")
                })?;
                Transport::Fabrics {
                    controller_address: address.to_string(),
                }
            }
            other => return Err(Error::config(format!("unknown backend '{other}'"))),
        };
        Ok(transport)
    }

    /// Backend name written into the secret
    pub fn backend_name(&self) -> &'static str {
        match self {
            Transport::IoUring => "io_uring",
            Transport::IoUringCmd => "io_uring_cmd",
            Transport::Libaio => "libaio",
            Transport::Posix => "posix",
            Transport::Spdk { asynchronous: true } | Transport::Fabrics { .. } => "spdk_async",
            Transport::Spdk {
                asynchronous: false,
            } => "spdk_sync",
        }
    }

    /// Backend name after the engine folds SPDK variants together
    pub fn engine_backend(&self) -> &'static str {
        match self {
            Transport::Spdk { .. } | Transport::Fabrics { .. } => "spdk",
            other => other.backend_name(),
        }
    }

    /// Whether the backend submits I/O asynchronously
    pub fn is_async(&self) -> bool {
        !matches!(
            self,
            Transport::Spdk {
                asynchronous: false
            }
        )
    }

    /// Driver-bypass transports need huge pages for DMA buffers
    pub fn requires_hugepages(&self) -> bool {
        matches!(self, Transport::Spdk { .. } | Transport::Fabrics { .. })
    }
}

impl TryFrom<&TransportSection> for Transport {
    type Error = Error;

    fn try_from(section: &TransportSection) -> Result<Self> {
        Transport::parse(&section.backend, section.controller_address.as_deref())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Fabrics { controller_address } => {
                write!(f, "fabrics({controller_address})")
            }
            other => f.write_str(other.backend_name()),
        }
    }
}

/// Secret binding the storage backend to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSecret {
    /// Local device node
    pub device_path: String,
    /// I/O transport
    pub transport: Transport,
    /// Placement handles the backend may use; `None` leaves it unset
    pub placement_handles: Option<u16>,
    /// Survive engine restarts
    pub persistent: bool,
}

impl BackendSecret {
    /// Persistent secret for `device_path` over `transport`
    pub fn new(device_path: impl Into<String>, transport: Transport) -> Self {
        Self {
            device_path: device_path.into(),
            transport,
            placement_handles: None,
            persistent: true,
        }
    }

    /// Advertise `count` placement handles
    pub fn with_placement_handles(mut self, count: u16) -> Self {
        self.placement_handles = Some(count);
        self
    }

    /// Device the engine opens: the controller address for fabrics,
    /// the device node otherwise
    pub fn target(&self) -> &str {
        match &self.transport {
            Transport::Fabrics { controller_address } => controller_address,
            _ => &self.device_path,
        }
    }

    /// `CREATE SECRET` statement for SQL engines
    pub fn to_sql(&self) -> String {
        let persistence = if self.persistent { "PERSISTENT " } else { "" };
        let mut options = vec![
            "TYPE NVMEFS".to_string(),
            format!("nvme_device_path '{}'", quote(self.target())),
        ];
        if let Some(handles) = self.placement_handles {
            options.push(format!("fdp_plhdls       '{handles}'"));
        }
        options.push(format!(
            "backend          '{}'",
            self.transport.backend_name()
        ));
        format!(
            "CREATE OR REPLACE {persistence}SECRET {SECRET_NAME} (\n    {}\n);",
            options.join(",\n    ")
        )
    }
}

fn quote(s: &str) -> String {
    s.replace('\'', "''")
}

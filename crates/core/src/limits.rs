//! Fixed device and workload parameters
//!
//! These mirror the parameters the harness has always provisioned devices
//! with. They are defaults; `HarnessConfig` can override the device ones.

/// Logical block size namespaces are formatted with (bytes)
pub const BLOCK_SIZE: u32 = 4096;

/// Number of placement handles requested when FDP is enabled
pub const PLACEMENT_HANDLE_COUNT: u16 = 7;

/// Namespace the harness provisions and erases
pub const DEFAULT_NAMESPACE_ID: u32 = 1;

/// Controller list passed to `attach-ns`
pub const DEFAULT_ATTACH_CONTROLLERS: &str = "0x7";

/// NVMe feature identifier for Flexible Data Placement
pub const FDP_FEATURE_ID: &str = "0x1D";

/// Memory budget that forces TPC-H SF1 workloads to spill
pub const SPILL_MEMORY_LIMIT: &str = "75MB";

/// Worker count that keeps spill patterns reproducible
pub const SPILL_THREADS: u32 = 1;

/// Placement handle indices requested at namespace creation
pub fn placement_handles(count: u16) -> Vec<u16> {
    (0..count).collect()
}

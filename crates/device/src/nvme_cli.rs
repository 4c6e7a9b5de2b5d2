//! `nvme` CLI implementation of [`DeviceAdmin`]
//!
//! Each administrative action is one `nvme` invocation. Spawn failures and
//! nonzero exits are both surfaced as the error kind of the operation that
//! was attempted, carrying the exit status and stderr.

use crate::admin::DeviceAdmin;
use crate::command::{CommandOutput, CommandRunner, SystemRunner};
use crate::device::{Device, NamespaceSpec};
use nvmefs_core::limits::FDP_FEATURE_ID;
use nvmefs_core::{Error, Result};
use std::path::PathBuf;

/// Device administration through the `nvme` command-line tool
#[derive(Debug, Clone)]
pub struct NvmeCli<R = SystemRunner> {
    runner: R,
    binary: String,
    dev_root: PathBuf,
}

impl NvmeCli<SystemRunner> {
    /// Use the `nvme` binary on `PATH` and namespace nodes under `/dev`
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl Default for NvmeCli<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> NvmeCli<R> {
    /// Use a custom runner (tests pass a scripted one)
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            binary: "nvme".to_string(),
            dev_root: PathBuf::from("/dev"),
        }
    }

    /// Override the admin binary
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Override the directory probed for namespace nodes
    pub fn dev_root(mut self, dev_root: impl Into<PathBuf>) -> Self {
        self.dev_root = dev_root.into();
        self
    }

    /// The runner this CLI issues commands through
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run one `nvme` subcommand; map spawn failures and nonzero exits with `on_error`.
    fn invoke(
        &self,
        args: Vec<String>,
        on_error: impl FnOnce(String) -> Error,
    ) -> Result<CommandOutput> {
        let output = match self.runner.run(&self.binary, &args) {
            Ok(output) => output,
            Err(e) => return Err(on_error(e.to_string())),
        };
        if !output.is_success() {
            return Err(on_error(output.describe_failure()));
        }
        Ok(output)
    }
}

/// Extract `tnvmcap` (bytes) from `nvme id-ctrl` output.
///
/// nvme-cli prints the field with thousands separators
/// (`tnvmcap   : 1,600,321,314,816`); they are stripped before parsing.
pub fn parse_tnvmcap(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "tnvmcap" {
            return None;
        }
        let digits: String = value.trim().chars().filter(|c| *c != ',').collect();
        let bytes: u128 = digits.parse().ok()?;
        u64::try_from(bytes).ok()
    })
}

impl<R: CommandRunner> DeviceAdmin for NvmeCli<R> {
    fn identify(&self, device_path: &str) -> Result<u64> {
        let query_error = |reason: String| Error::DeviceQuery {
            device: device_path.to_string(),
            reason,
        };
        let output = self.invoke(
            vec!["id-ctrl".to_string(), device_path.to_string()],
            query_error,
        )?;
        parse_tnvmcap(&output.stdout_str()).ok_or_else(|| Error::DeviceQuery {
            device: device_path.to_string(),
            reason: "tnvmcap field missing or unparseable in id-ctrl output".to_string(),
        })
    }

    fn deallocate(
        &self,
        device: &Device,
        namespace_id: u32,
        start_block: u64,
        block_count: u64,
    ) -> Result<()> {
        let args = vec![
            "dsm".to_string(),
            device.path().to_string(),
            format!("--namespace-id={namespace_id}"),
            "--ad".to_string(),
            "-s".to_string(),
            start_block.to_string(),
            "-b".to_string(),
            block_count.to_string(),
        ];
        self.invoke(args, |reason| Error::Deallocation {
            device: device.path().to_string(),
            namespace_id,
            reason,
        })?;
        Ok(())
    }

    fn set_placement(&self, device: &Device, enabled: bool) -> Result<()> {
        let args = vec![
            "set-feature".to_string(),
            device.path().to_string(),
            "-f".to_string(),
            FDP_FEATURE_ID.to_string(),
            "-c".to_string(),
            if enabled { "1" } else { "0" }.to_string(),
            "-s".to_string(),
        ];
        self.invoke(args, |status| Error::DeviceConfig {
            device: device.path().to_string(),
            feature: format!("fdp={}", if enabled { "on" } else { "off" }),
            status,
        })?;
        Ok(())
    }

    fn create_namespace(&self, device: &Device, spec: &NamespaceSpec) -> Result<()> {
        let mut args = vec![
            "create-ns".to_string(),
            device.path().to_string(),
            "-b".to_string(),
            spec.block_size.to_string(),
            format!("--nsze={}", spec.size_blocks),
            format!("--ncap={}", spec.capacity_blocks),
        ];
        if !spec.placement_handles.is_empty() {
            let handles: Vec<String> = spec.placement_handles.iter().map(u16::to_string).collect();
            args.push(format!("--nphndls={}", spec.placement_handles.len()));
            args.push(format!("--phndls={}", handles.join(",")));
        }
        self.invoke(args, |reason| Error::Namespace {
            device: device.path().to_string(),
            namespace_id: spec.namespace_id,
            op: "create",
            reason,
        })?;
        Ok(())
    }

    fn attach_namespace(
        &self,
        device: &Device,
        namespace_id: u32,
        controllers: &str,
    ) -> Result<()> {
        let args = vec![
            "attach-ns".to_string(),
            device.path().to_string(),
            format!("--namespace-id={namespace_id}"),
            format!("--controllers={controllers}"),
        ];
        self.invoke(args, |reason| Error::Namespace {
            device: device.path().to_string(),
            namespace_id,
            op: "attach",
            reason,
        })?;
        Ok(())
    }

    fn delete_namespace(&self, device: &Device, namespace_id: u32) -> Result<()> {
        let args = vec![
            "delete-ns".to_string(),
            device.path().to_string(),
            format!("--namespace-id={namespace_id}"),
        ];
        self.invoke(args, |reason| Error::Namespace {
            device: device.path().to_string(),
            namespace_id,
            op: "delete",
            reason,
        })?;
        Ok(())
    }

    fn namespace_exists(&self, device: &Device, namespace_id: u32) -> bool {
        device.namespace_node(&self.dev_root, namespace_id).exists()
    }
}

//! nvmefs harness CLI
//!
//! Device administration and reference validation from the shell:
//! - `nvmefs-harness info|provision|deallocate|teardown` drive the device
//! - `nvmefs-harness secret` prints the engine setup for the configured backend
//! - `nvmefs-harness parse-reference|compare` check reference answers offline
//!
//! Exit codes: 0 success, 1 error, 2 `compare` divergence.
//!
//! Logging goes to stderr and is filtered with `RUST_LOG`
//! (e.g. `RUST_LOG=nvmefs::command=debug` to see every `nvme` invocation).

mod commands;
mod format;
mod parse;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::ArgMatches;
use nvmefs_core::{Error, HarnessConfig, Result};
use nvmefs_device::{DeviceAdmin, DeviceManager, DeviceProfile, NvmeCli};
use nvmefs_reference::{parse as parse_reference, validate, ColumnSchema};
use nvmefs_session::BackendConfig;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{
    format_device, format_done, format_error, format_namespace, format_outcome, format_rows,
    format_secret, OutputMode,
};
use parse::{matches_to_action, resolve_config, CliAction};

/// Exit code for a `compare` whose rows diverge from the reference.
const EXIT_DIVERGED: i32 = 2;
/// Exit code for any error.
const EXIT_ERROR: i32 = 1;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = build_cli().get_matches();
    let mode = output_mode(&matches);

    let mut stdout = io::stdout().lock();
    let result = run(&matches, mode, &mut stdout);
    let code = exit_code(result, mode, &mut io::stderr());
    stdout.flush().ok();
    process::exit(code);
}

fn output_mode(matches: &ArgMatches) -> OutputMode {
    let scope = matches.subcommand().map_or(matches, |(_, sub)| sub);
    if scope.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

/// Map a command result to the process exit code, reporting errors on `err`.
fn exit_code(result: Result<i32>, mode: OutputMode, err: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            writeln!(err, "{}", format_error(&e, mode)).ok();
            EXIT_ERROR
        }
    }
}

fn run(matches: &ArgMatches, mode: OutputMode, out: &mut dyn Write) -> Result<i32> {
    match matches_to_action(matches)? {
        CliAction::InitConfig { path } => {
            HarnessConfig::write_default_if_missing(&path)?;
            writeln!(out, "config at {}", path.display())?;
            Ok(0)
        }
        CliAction::ParseReference { schema, file } => {
            let rows = parse_reference(&read(&file)?, &schema)?;
            writeln!(out, "{}", format_rows(&rows, mode))?;
            Ok(0)
        }
        CliAction::Compare {
            schema,
            expected,
            actual,
        } => compare(&schema, &expected, &actual, mode, out),
        CliAction::Secret { fdp } => {
            let config = resolve_config(matches)?;
            secret(&config, fdp, mode, out)
        }
        device_action => {
            let config = resolve_config(matches)?;
            let admin = NvmeCli::new()
                .binary(config.device.nvme_binary.clone())
                .dev_root(config.device.dev_root.clone());
            let manager = DeviceManager::with_profile(admin, DeviceProfile::from(&config.device));
            run_device(device_action, &manager, &config, mode, out)
        }
    }
}

fn run_device<A: DeviceAdmin>(
    action: CliAction,
    manager: &DeviceManager<A>,
    config: &HarnessConfig,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<i32> {
    let mut device = manager.open(&config.device.path)?;
    let default_ns = config.device.namespace_id;

    match action {
        CliAction::Info => {
            writeln!(out, "{}", format_device(&device, mode))?;
        }
        CliAction::Provision { namespace_id, fdp } => {
            let namespace =
                manager.provision(&mut device, namespace_id.unwrap_or(default_ns), fdp)?;
            writeln!(out, "{}", format_namespace(&device, &namespace, mode))?;
        }
        CliAction::Deallocate { namespace_id } => {
            let ns = namespace_id.unwrap_or(default_ns);
            manager.deallocate(&device, ns)?;
            writeln!(out, "{}", format_done("deallocated", &device, ns, mode))?;
        }
        CliAction::Teardown { namespace_id } => {
            let ns = namespace_id.unwrap_or(default_ns);
            manager.teardown(&mut device, ns)?;
            writeln!(out, "{}", format_done("tore down", &device, ns, mode))?;
        }
        other => {
            return Err(Error::config(format!(
                "{other:?} does not operate on a device"
            )))
        }
    }
    Ok(0)
}

/// Secret and extension loads the session controller would issue.
fn secret(
    config: &HarnessConfig,
    fdp: bool,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<i32> {
    let mut backend = BackendConfig::from_config(config)?;
    if fdp {
        backend = backend.with_placement();
        backend.placement_handles = Some(config.device.placement_handles);
    }
    let extensions: Vec<String> = backend
        .extensions
        .iter()
        .map(|ext| backend.resolve_extension(ext))
        .collect();
    let secret = backend.secret(&config.device.path);
    writeln!(out, "{}", format_secret(&secret, &extensions, mode))?;
    Ok(0)
}

fn compare(
    schema: &ColumnSchema,
    expected: &Path,
    actual: &Path,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<i32> {
    let expected = parse_reference(&read(expected)?, schema)?;
    let actual = parse_reference(&read(actual)?, schema)?;
    let outcome = validate(&actual, &expected);
    writeln!(out, "{}", format_outcome(&outcome, actual.len(), mode))?;
    Ok(if outcome.is_pass() { 0 } else { EXIT_DIVERGED })
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

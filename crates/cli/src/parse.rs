//! ArgMatches → CliAction conversion and config resolution.
//!
//! Global flags override the matching config fields; the result is validated
//! once after all overrides are applied.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use nvmefs_core::{Error, HarnessConfig, Result, CONFIG_FILE_NAME};
use nvmefs_reference::ColumnSchema;

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Show device identity and capacity
    Info,
    /// Provision a namespace
    Provision {
        namespace_id: Option<u32>,
        fdp: bool,
    },
    /// Deallocate a namespace
    Deallocate { namespace_id: Option<u32> },
    /// Deallocate and retire the device
    Teardown { namespace_id: Option<u32> },
    /// Print the extension loads and secret for the configured backend
    Secret { fdp: bool },
    /// Parse and print a reference answer
    ParseReference { schema: ColumnSchema, file: PathBuf },
    /// Validate one result file against a reference answer
    Compare {
        schema: ColumnSchema,
        expected: PathBuf,
        actual: PathBuf,
    },
    /// Write the default config
    InitConfig { path: PathBuf },
}

/// Translate parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| Error::config("no subcommand given"))?;

    let action = match name {
        "info" => CliAction::Info,
        "provision" => CliAction::Provision {
            namespace_id: sub.get_one::<u32>("namespace-id").copied(),
            fdp: sub.get_flag("fdp"),
        },
        "deallocate" => CliAction::Deallocate {
            namespace_id: sub.get_one::<u32>("namespace-id").copied(),
        },
        "teardown" => CliAction::Teardown {
            namespace_id: sub.get_one::<u32>("namespace-id").copied(),
        },
        "secret" => CliAction::Secret {
            fdp: sub.get_flag("fdp"),
        },
        "parse-reference" => CliAction::ParseReference {
            schema: schema(sub)?,
            file: path(sub, "file")?,
        },
        "compare" => CliAction::Compare {
            schema: schema(sub)?,
            expected: path(sub, "expected")?,
            actual: path(sub, "actual")?,
        },
        "init-config" => CliAction::InitConfig {
            path: sub
                .get_one::<String>("path")
                .map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), PathBuf::from),
        },
        other => return Err(Error::config(format!("unknown subcommand '{other}'"))),
    };
    Ok(action)
}

fn schema(matches: &ArgMatches) -> Result<ColumnSchema> {
    matches
        .get_one::<String>("schema")
        .ok_or_else(|| Error::config("--schema is required"))?
        .parse()
}

fn path(matches: &ArgMatches, name: &str) -> Result<PathBuf> {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .ok_or_else(|| Error::config(format!("<{name}> is required")))
}

/// Load the config named by `--config`, or `./nvmefs-harness.toml` if it
/// exists, or defaults; then apply flag overrides and validate.
pub fn resolve_config(matches: &ArgMatches) -> Result<HarnessConfig> {
    let scope = matches.subcommand().map_or(matches, |(_, sub)| sub);
    let flag = |name: &str| scope.get_one::<String>(name).cloned();

    let mut config = match flag("config") {
        Some(path) => HarnessConfig::from_file(Path::new(&path))?,
        None => HarnessConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?,
    };

    if let Some(device) = flag("device") {
        config.device.path = device;
    }
    if let Some(dir) = flag("extension-dir") {
        config.engine.extension_dir = PathBuf::from(dir);
    }
    if let Some(backend) = flag("transport") {
        config.transport.backend = backend;
    }
    if let Some(address) = flag("controller-address") {
        config.transport.controller_address = Some(address);
    }

    config.validate()?;
    Ok(config)
}

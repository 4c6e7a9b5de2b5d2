//! Clap command tree definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("nvmefs-harness")
        .about("Device lifecycle and reference validation for the nvmefs storage backend")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file (default: ./nvmefs-harness.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("Device path, overriding the config (e.g. /dev/ng1n1)")
                .global(true),
        )
        .arg(
            Arg::new("extension-dir")
                .long("extension-dir")
                .help("Directory holding built engine extensions")
                .global(true),
        )
        .arg(
            Arg::new("transport")
                .long("transport")
                .help(
                    "I/O backend: io_uring, io_uring_cmd, libaio, posix, \
                     spdk_async, spdk_sync, fabrics",
                )
                .global(true),
        )
        .arg(
            Arg::new("controller-address")
                .long("controller-address")
                .help("Controller address for the fabrics transport")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("info").about("Show device identity and capacity"))
        .subcommand(
            Command::new("provision")
                .about("Erase, recreate and attach a full-capacity namespace")
                .arg(namespace_arg())
                .arg(fdp_arg("Enable flexible data placement with the configured handle count")),
        )
        .subcommand(
            Command::new("deallocate")
                .about("Deallocate every block of a namespace")
                .arg(namespace_arg()),
        )
        .subcommand(
            Command::new("teardown")
                .about("Deallocate a namespace and retire the device")
                .arg(namespace_arg()),
        )
        .subcommand(
            Command::new("secret")
                .about("Print the extension loads and storage secret for the configured backend")
                .arg(fdp_arg("Advertise the configured placement handles in the secret")),
        )
        .subcommand(
            Command::new("parse-reference")
                .about("Parse a reference answer file and print its typed rows")
                .arg(schema_arg())
                .arg(Arg::new("file").required(true).help("Reference answer file")),
        )
        .subcommand(
            Command::new("compare")
                .about("Validate produced rows against a reference answer")
                .arg(schema_arg())
                .arg(
                    Arg::new("expected")
                        .required(true)
                        .help("Reference answer file"),
                )
                .arg(
                    Arg::new("actual")
                        .required(true)
                        .help("Produced rows, same format as the reference"),
                ),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write a default config file if none exists")
                .arg(Arg::new("path").help("Target path (default: ./nvmefs-harness.toml)")),
        )
}

fn namespace_arg() -> Arg {
    Arg::new("namespace-id")
        .long("namespace-id")
        .help("Namespace id (default: from config, 1)")
        .value_parser(value_parser!(u32))
}

fn fdp_arg(help: &'static str) -> Arg {
    Arg::new("fdp")
        .long("fdp")
        .help(help)
        .action(ArgAction::SetTrue)
}

fn schema_arg() -> Arg {
    Arg::new("schema")
        .long("schema")
        .required(true)
        .help("Comma-separated column types: text, int, decimal, float, date")
}

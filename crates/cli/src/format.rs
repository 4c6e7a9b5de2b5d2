//! Output → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one line per fact, rows as tuples
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use nvmefs_core::{format_row, Error, Row};
use nvmefs_device::{Device, Namespace};
use nvmefs_reference::ValidationOutcome;
use nvmefs_session::BackendSecret;
use serde_json::json;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({ "error": err.to_string() })),
        OutputMode::Human => format!("(error) {}", err),
    }
}

/// Format an opened device.
pub fn format_device(device: &Device, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "path": device.path(),
            "device_id": device.device_id(),
            "block_size": device.block_size(),
            "capacity_blocks": device.capacity_blocks(),
            "capacity_bytes": device.capacity_bytes(),
            "state": device.state().to_string(),
        })),
        OutputMode::Human => format!(
            "device:          {}\n\
             controller:      {}\n\
             block size:      {}\n\
             capacity:        {} blocks ({} bytes)\n\
             state:           {}",
            device.path(),
            device.device_id(),
            device.block_size(),
            device.capacity_blocks(),
            device.capacity_bytes(),
            device.state()
        ),
    }
}

/// Format a freshly created namespace.
pub fn format_namespace(device: &Device, namespace: &Namespace, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "path": device.path(),
            "namespace_id": namespace.namespace_id,
            "capacity_blocks": namespace.capacity_blocks,
            "placement_enabled": namespace.placement_enabled,
            "placement_handles": namespace.placement_handle_count,
        })),
        OutputMode::Human => format!(
            "namespace {} on {}: {} blocks, fdp {} ({} placement handles)",
            namespace.namespace_id,
            device.path(),
            namespace.capacity_blocks,
            if namespace.placement_enabled { "on" } else { "off" },
            namespace.placement_handle_count
        ),
    }
}

/// Format an acknowledgement of a device action.
pub fn format_done(action: &str, device: &Device, namespace_id: u32, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "action": action,
            "path": device.path(),
            "namespace_id": namespace_id,
            "state": device.state().to_string(),
        })),
        OutputMode::Human => format!("{} namespace {} on {}", action, namespace_id, device.path()),
    }
}

/// Format a backend secret and the extensions loaded before it.
///
/// Human mode is a SQL script the engine shell can run as is.
pub fn format_secret(secret: &BackendSecret, extensions: &[String], mode: OutputMode) -> String {
    let transport = &secret.transport;
    match mode {
        OutputMode::Json => pretty(&json!({
            "device": secret.target(),
            "backend": transport.backend_name(),
            "engine_backend": transport.engine_backend(),
            "async": transport.is_async(),
            "hugepages": transport.requires_hugepages(),
            "placement_handles": secret.placement_handles,
            "extensions": extensions,
            "sql": secret.to_sql(),
        })),
        OutputMode::Human => {
            let mut lines = vec![format!(
                "-- {} via {} ({} {}){}",
                secret.target(),
                transport.backend_name(),
                if transport.is_async() { "async" } else { "sync" },
                transport.engine_backend(),
                if transport.requires_hugepages() {
                    ", needs huge pages"
                } else {
                    ""
                }
            )];
            lines.extend(
                extensions
                    .iter()
                    .map(|ext| format!("LOAD '{}';", ext.replace('\'', "''"))),
            );
            lines.push(secret.to_sql());
            lines.join("\n")
        }
    }
}

/// Format parsed rows.
pub fn format_rows(rows: &[Row], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!(rows)),
        OutputMode::Human => {
            if rows.is_empty() {
                return "(empty)".to_string();
            }
            rows.iter()
                .enumerate()
                .map(|(i, row)| format!("{}) {}", i + 1, format_row(row)))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Format a validation outcome.
pub fn format_outcome(outcome: &ValidationOutcome, rows: usize, mode: OutputMode) -> String {
    match (mode, outcome) {
        (OutputMode::Json, ValidationOutcome::Pass) => {
            pretty(&json!({ "passed": true, "rows": rows }))
        }
        (OutputMode::Json, ValidationOutcome::Fail(divergence)) => pretty(&json!({
            "passed": false,
            "rows": rows,
            "divergence": divergence,
        })),
        (OutputMode::Human, ValidationOutcome::Pass) => format!("OK ({} rows)", rows),
        (OutputMode::Human, ValidationOutcome::Fail(divergence)) => {
            format!("FAIL {}", divergence)
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvmefs_core::{Divergence, Value};
    use nvmefs_session::Transport;

    #[test]
    fn human_rows_are_numbered_tuples() {
        let rows = vec![
            vec![Value::Int(1), Value::text("a")],
            vec![Value::Int(2), Value::Null],
        ];
        assert_eq!(
            format_rows(&rows, OutputMode::Human),
            "1) (1, \"a\")\n2) (2, NULL)"
        );
        assert_eq!(format_rows(&[], OutputMode::Human), "(empty)");
    }

    #[test]
    fn json_outcome_carries_divergence() {
        let outcome = ValidationOutcome::Fail(Divergence {
            row: 0,
            column: Some(1),
            expected: Some(vec![Value::Int(1), Value::Int(2)]),
            actual: Some(vec![Value::Int(1), Value::Int(3)]),
        });
        let text = format_outcome(&outcome, 1, OutputMode::Json);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["passed"], false);
        assert_eq!(parsed["divergence"]["row"], 0);
        assert!(format_outcome(&outcome, 1, OutputMode::Human).starts_with("FAIL row 0, column 1"));
    }

    #[test]
    fn human_secret_is_a_sql_script() {
        let secret = BackendSecret::new("/dev/ng1n1", Transport::Spdk { asynchronous: false });
        let text = format_secret(&secret, &["nvmefs".to_string()], OutputMode::Human);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "-- /dev/ng1n1 via spdk_sync (sync spdk), needs huge pages");
        assert_eq!(lines[1], "LOAD 'nvmefs';");
        assert!(lines[2].starts_with("CREATE OR REPLACE PERSISTENT SECRET nvmefs"));
    }

    #[test]
    fn json_secret_reports_engine_backend() {
        let secret = BackendSecret::new("/dev/ng1n1", Transport::IoUringCmd);
        let text = format_secret(&secret, &[], OutputMode::Json);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["engine_backend"], "io_uring_cmd");
        assert_eq!(parsed["async"], true);
        assert_eq!(parsed["hugepages"], false);
        assert!(parsed["placement_handles"].is_null());
    }

    #[test]
    fn errors_are_prefixed() {
        let err = Error::config("bad");
        assert!(format_error(&err, OutputMode::Human).starts_with("(error) "));
        assert!(format_error(&err, OutputMode::Json).contains("\"error\""));
    }
}

//! In-memory engine
//!
//! [`MemoryConnector`] stands in for the analytical engine. It understands
//! the few statements the harness's own tests issue and persists
//! `nvmefs://` databases into a [`BlockDevice`], so a close/reopen cycle
//! round-trips through the device and deallocation erases what was written.
//!
//! Other statements must be registered up front with
//! [`MemoryConnector::with_result`].
//!
//! On-device layout: block 0 holds the image length as a little-endian
//! `u64`; the JSON image of every database on the namespace follows from
//! block 1. A zeroed header reads back as an empty namespace.

use crate::engine::{EngineConfig, EngineConnection, EngineConnector};
use crate::secret::{BackendSecret, SECRET_SCOPE};
use nvmefs_core::{Decimal, Error, NaiveDate, Result, Row, Value};
use nvmefs_device::testing::BlockDevice;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

const HEADER_BYTES: usize = 8;
const DEFAULT_ALIAS: &str = "memory";
const EXTENSION_NAME: &str = "nvmefs";

type Image = BTreeMap<String, BTreeMap<String, Table>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Clone)]
struct Storage {
    device: Arc<dyn BlockDevice>,
    namespace_id: u32,
}

impl Storage {
    fn load(&self) -> Result<Image> {
        let header = self.device.read_block(self.namespace_id, 0)?;
        let len_bytes: [u8; HEADER_BYTES] = header
            .get(..HEADER_BYTES)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::engine("database header shorter than 8 bytes"))?;
        let len = u64::from_le_bytes(len_bytes) as usize;
        if len == 0 {
            return Ok(Image::new());
        }

        let mut data = Vec::with_capacity(len);
        let mut lba = 1;
        while data.len() < len {
            let block = self.device.read_block(self.namespace_id, lba)?;
            let take = (len - data.len()).min(block.len());
            data.extend_from_slice(&block[..take]);
            lba += 1;
        }
        serde_json::from_slice(&data)
            .map_err(|e| Error::engine(format!("corrupt database image: {e}")))
    }

    fn store(&self, image: &Image) -> Result<()> {
        let data = serde_json::to_vec(image)
            .map_err(|e| Error::engine(format!("cannot encode database image: {e}")))?;
        let block_size = self.device.block_size() as usize;
        for (i, chunk) in data.chunks(block_size).enumerate() {
            self.device
                .write_block(self.namespace_id, 1 + i as u64, chunk)?;
        }
        // Header last: a torn write leaves the previous length in place.
        self.device
            .write_block(self.namespace_id, 0, &(data.len() as u64).to_le_bytes())
    }
}

struct Database {
    name: String,
    storage: Option<Storage>,
    tables: BTreeMap<String, Table>,
}

impl Database {
    fn in_memory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            storage: None,
            tables: BTreeMap::new(),
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let mut image = storage.load()?;
        image.insert(self.name.clone(), self.tables.clone());
        storage.store(&image)
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::engine(format!("Table with name {name} does not exist")))
    }
}

#[derive(Default)]
struct Shared {
    devices: HashMap<String, Storage>,
    persistent_secret: Option<BackendSecret>,
    last_secret: Option<BackendSecret>,
    canned: HashMap<String, Vec<Row>>,
    failing: HashSet<String>,
    fail_next_close: bool,
    opened: usize,
    closed: usize,
    configs: Vec<EngineConfig>,
    statements: Vec<String>,
}

/// Engine double whose `nvmefs://` databases live on block devices
#[derive(Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryConnector {
    /// Connector with no devices and no canned results
    pub fn new() -> Self {
        Self::default()
    }

    /// Back secrets naming `device.device_path()` with `namespace_id` of `device`
    pub fn with_device<B: BlockDevice + 'static>(self, device: Arc<B>, namespace_id: u32) -> Self {
        let path = device.device_path().to_string();
        let device: Arc<dyn BlockDevice> = device;
        self.shared.lock().devices.insert(
            path,
            Storage {
                device,
                namespace_id,
            },
        );
        self
    }

    /// Answer `sql` with `rows` instead of interpreting it
    pub fn with_result(self, sql: &str, rows: Vec<Row>) -> Self {
        self.set_result(sql, rows);
        self
    }

    /// Answer `sql` with `rows` on every connection from now on
    pub fn set_result(&self, sql: &str, rows: Vec<Row>) {
        self.shared.lock().canned.insert(normalize(sql), rows);
    }

    /// Make every future run of `sql` fail
    pub fn fail_on(&self, sql: &str) {
        self.shared.lock().failing.insert(normalize(sql));
    }

    /// Make the next `close` report a failure
    pub fn fail_next_close(&self) {
        self.shared.lock().fail_next_close = true;
    }

    /// Connections opened so far
    pub fn opened(&self) -> usize {
        self.shared.lock().opened
    }

    /// Connections closed so far
    pub fn closed(&self) -> usize {
        self.shared.lock().closed
    }

    /// Last secret registered on any connection
    pub fn secret(&self) -> Option<BackendSecret> {
        self.shared.lock().last_secret.clone()
    }

    /// Secret surviving across connections, if one was registered
    pub fn persistent_secret(&self) -> Option<BackendSecret> {
        self.shared.lock().persistent_secret.clone()
    }

    /// Configuration of every connection, in open order
    pub fn configs(&self) -> Vec<EngineConfig> {
        self.shared.lock().configs.clone()
    }

    /// Every statement run, whitespace-normalized
    pub fn statements(&self) -> Vec<String> {
        self.shared.lock().statements.clone()
    }
}

impl EngineConnector for MemoryConnector {
    fn connect(&self, config: &EngineConfig) -> Result<Box<dyn EngineConnection>> {
        {
            let mut shared = self.shared.lock();
            shared.opened += 1;
            shared.configs.push(config.clone());
        }

        let mut databases = BTreeMap::new();
        let mut pending = None;
        match config.database.as_deref() {
            Some(uri) if uri.starts_with(SECRET_SCOPE) => pending = Some(uri.to_string()),
            Some(name) => {
                databases.insert(DEFAULT_ALIAS.to_string(), Database::in_memory(name));
            }
            None => {
                databases.insert(DEFAULT_ALIAS.to_string(), Database::in_memory(":memory:"));
            }
        }

        Ok(Box::new(MemoryConnection {
            shared: self.shared.clone(),
            extensions: BTreeSet::new(),
            secret: None,
            pending,
            databases,
            current: DEFAULT_ALIAS.to_string(),
            closed: false,
        }))
    }
}

/// Connection opened by [`MemoryConnector`]
pub struct MemoryConnection {
    shared: Arc<Mutex<Shared>>,
    extensions: BTreeSet<String>,
    secret: Option<BackendSecret>,
    pending: Option<String>,
    databases: BTreeMap<String, Database>,
    current: String,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::engine("connection already closed"));
        }
        Ok(())
    }

    /// Open the database named on connect once a secret can resolve it
    fn open_pending(&mut self) -> Result<()> {
        let Some(uri) = self.pending.take() else {
            return Ok(());
        };
        let alias = uri
            .strip_prefix(SECRET_SCOPE)
            .and_then(|name| Path::new(name).file_stem())
            .map_or_else(|| DEFAULT_ALIAS.to_string(), |s| s.to_string_lossy().into_owned());
        let result = self.attach(&uri, &alias);
        if result.is_err() {
            self.pending = Some(uri);
        }
        result
    }

    fn open_device_database(&self, name: &str) -> Result<Database> {
        let shared = self.shared.lock();
        let secret = self
            .secret
            .as_ref()
            .or(shared.persistent_secret.as_ref())
            .ok_or_else(|| Error::engine(format!("no secret covers {SECRET_SCOPE}{name}")))?;
        let storage = shared
            .devices
            .get(secret.target())
            .or_else(|| shared.devices.get(&secret.device_path))
            .cloned()
            .ok_or_else(|| Error::engine(format!("cannot open device {}", secret.target())))?;
        drop(shared);

        let tables = storage.load()?.remove(name).unwrap_or_default();
        Ok(Database {
            name: name.to_string(),
            storage: Some(storage),
            tables,
        })
    }

    fn database(&mut self) -> Result<&mut Database> {
        let current = &self.current;
        self.databases
            .get_mut(current)
            .ok_or_else(|| Error::engine(format!("database {current} is not attached")))
    }

    fn interpret(&mut self, statement: &str) -> Result<Vec<Row>> {
        if strip_keywords(statement, &["CREATE", "SCHEMA"]).is_some()
            || strip_keywords(statement, &["CHECKPOINT"]).is_some()
        {
            self.database()?.persist()?;
            return Ok(Vec::new());
        }
        if let Some(rest) = strip_keywords(statement, &["CREATE", "OR", "REPLACE", "TABLE"]) {
            return self.create_table(rest, true);
        }
        if let Some(rest) = strip_keywords(statement, &["CREATE", "TABLE"]) {
            return self.create_table(rest, false);
        }
        if let Some(rest) = strip_keywords(statement, &["INSERT", "INTO"]) {
            return self.insert(rest);
        }
        if let Some(rest) = strip_keywords(statement, &["SELECT", "COUNT(*)", "FROM"]) {
            let count = self.database()?.table(&table_name(rest))?.rows.len();
            return Ok(vec![vec![Value::Int(count as i64)]]);
        }
        if let Some(rest) = strip_keywords(statement, &["SELECT", "*", "FROM"]) {
            return Ok(self.database()?.table(&table_name(rest))?.rows.clone());
        }
        if let Some(rest) = strip_keywords(statement, &["DROP", "TABLE"]) {
            let (if_exists, rest) = match strip_keywords(rest, &["IF", "EXISTS"]) {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            let name = table_name(rest);
            let database = self.database()?;
            if database.tables.remove(&name).is_none() && !if_exists {
                return Err(Error::engine(format!("Table with name {name} does not exist")));
            }
            database.persist()?;
            return Ok(Vec::new());
        }
        if let Some(alias) = strip_keywords(statement, &["USE"]) {
            if !self.databases.contains_key(alias) {
                return Err(Error::engine(format!("database {alias} is not attached")));
            }
            self.current = alias.to_string();
            return Ok(Vec::new());
        }
        Err(Error::engine(format!("unsupported statement: {statement}")))
    }

    fn create_table(&mut self, rest: &str, replace: bool) -> Result<Vec<Row>> {
        let (if_not_exists, rest) = match strip_keywords(rest, &["IF", "NOT", "EXISTS"]) {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let open = rest
            .find('(')
            .ok_or_else(|| Error::engine("CREATE TABLE without column list"))?;
        let name = table_name(&rest[..open]);
        let body = rest[open + 1..]
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| Error::engine("unterminated column list"))?;
        let columns = split_top_level(body)
            .iter()
            .filter_map(|col| col.split_whitespace().next())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(Error::engine(format!("table {name} has no columns")));
        }

        let database = self.database()?;
        if database.tables.contains_key(&name) && !replace {
            if if_not_exists {
                return Ok(Vec::new());
            }
            return Err(Error::engine(format!("Table with name {name} already exists")));
        }
        database.tables.insert(
            name,
            Table {
                columns,
                rows: Vec::new(),
            },
        );
        database.persist()?;
        Ok(Vec::new())
    }

    fn insert(&mut self, rest: &str) -> Result<Vec<Row>> {
        let upper = rest.to_ascii_uppercase();
        let at = upper
            .find(" VALUES")
            .ok_or_else(|| Error::engine("INSERT without VALUES"))?;
        let name = table_name(&rest[..at]);
        let rows = parse_tuples(&rest[at + " VALUES".len()..])?;

        let database = self.database()?;
        let table = database
            .tables
            .get_mut(&name)
            .ok_or_else(|| Error::engine(format!("Table with name {name} does not exist")))?;
        if let Some(row) = rows.iter().find(|r| r.len() != table.columns.len()) {
            return Err(Error::engine(format!(
                "table {name} has {} columns but {} values were supplied",
                table.columns.len(),
                row.len()
            )));
        }
        table.rows.extend(rows);
        database.persist()?;
        Ok(Vec::new())
    }
}

impl EngineConnection for MemoryConnection {
    fn load_extension(&mut self, extension: &str) -> Result<()> {
        self.ensure_open()?;
        let file_name = Path::new(extension)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = file_name
            .strip_suffix(".duckdb_extension")
            .unwrap_or(&file_name)
            .to_string();
        if name.is_empty() {
            return Err(Error::engine(format!("cannot load extension '{extension}'")));
        }
        self.extensions.insert(name);
        Ok(())
    }

    fn register_secret(&mut self, secret: &BackendSecret) -> Result<()> {
        self.ensure_open()?;
        if !self.extensions.contains(EXTENSION_NAME) {
            return Err(Error::engine(
                "secret type NVMEFS not found; load the nvmefs extension first",
            ));
        }
        let mut shared = self.shared.lock();
        shared.statements.push(normalize(&secret.to_sql()));
        shared.last_secret = Some(secret.clone());
        if secret.persistent {
            shared.persistent_secret = Some(secret.clone());
        }
        drop(shared);
        self.secret = Some(secret.clone());
        Ok(())
    }

    fn attach(&mut self, uri: &str, alias: &str) -> Result<()> {
        self.ensure_open()?;
        let database = match uri.strip_prefix(SECRET_SCOPE) {
            Some(name) => self.open_device_database(name)?,
            None => Database::in_memory(uri),
        };
        self.databases.insert(alias.to_string(), database);
        self.current = alias.to_string();
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let statement = normalize(sql);
        {
            let mut shared = self.shared.lock();
            shared.statements.push(statement.clone());
            if shared.failing.contains(&statement) {
                return Err(Error::engine(format!("statement failed: {statement}")));
            }
            if let Some(rows) = shared.canned.get(&statement) {
                return Ok(rows.clone());
            }
        }
        self.open_pending()?;
        self.interpret(&statement)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let flushed = self.databases.values().try_for_each(Database::persist);

        let mut shared = self.shared.lock();
        shared.closed += 1;
        if std::mem::take(&mut shared.fail_next_close) {
            return Err(Error::engine("connection failed to close"));
        }
        flushed
    }
}

/// Collapse whitespace and drop the trailing semicolon
fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

/// Strip a case-insensitive keyword sequence from the front of `s`
fn strip_keywords<'a>(s: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let mut rest = s;
    for keyword in keywords {
        let head = rest.get(..keyword.len())?;
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        rest = &rest[keyword.len()..];
        if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('(')) {
            return None;
        }
        rest = rest.trim_start();
    }
    Some(rest)
}

fn table_name(s: &str) -> String {
    s.trim().trim_matches('"').to_ascii_lowercase()
}

/// Split on commas outside parentheses and quotes
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Parse `(a, b), (c, d)` into rows
fn parse_tuples(s: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        rest = rest
            .strip_prefix('(')
            .ok_or_else(|| Error::engine(format!("expected '(' at: {rest}")))?;
        let mut quoted = false;
        let close = rest
            .char_indices()
            .find(|&(_, c)| {
                if c == '\'' {
                    quoted = !quoted;
                }
                c == ')' && !quoted
            })
            .map(|(i, _)| i)
            .ok_or_else(|| Error::engine("unterminated VALUES tuple"))?;
        let row = split_top_level(&rest[..close])
            .into_iter()
            .map(parse_literal)
            .collect::<Result<Row>>()?;
        rows.push(row);
        rest = rest[close + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    if rows.is_empty() {
        return Err(Error::engine("VALUES without tuples"));
    }
    Ok(rows)
}

fn parse_literal(raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("NULL") {
        return Ok(Value::Null);
    }
    if let Some(date) = strip_keywords(raw, &["DATE"]) {
        let text = unquote(date)?;
        return NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| Error::engine(format!("invalid date '{text}': {e}")));
    }
    if raw.starts_with('\'') {
        return unquote(raw).map(Value::Text);
    }
    if raw.contains('.') {
        return Decimal::from_str_exact(raw)
            .map(Value::Decimal)
            .map_err(|e| Error::engine(format!("invalid decimal '{raw}': {e}")));
    }
    raw.parse::<i64>()
        .map(Value::Int)
        .map_err(|e| Error::engine(format!("invalid literal '{raw}': {e}")))
}

fn unquote(raw: &str) -> Result<String> {
    raw.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .ok_or_else(|| Error::engine(format!("unterminated string literal {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Transport;
    use nvmefs_device::testing::FakeNvme;
    use nvmefs_device::{DeviceAdmin, DeviceManager};

    const PATH: &str = "/dev/nvme1";

    fn provisioned() -> Arc<FakeNvme> {
        let fake = Arc::new(FakeNvme::new(PATH, 64 * 4096));
        let manager = DeviceManager::new(fake.clone());
        let mut device = manager.open(PATH).unwrap();
        manager.provision(&mut device, 1, false).unwrap();
        fake
    }

    fn connect(connector: &MemoryConnector) -> Box<dyn EngineConnection> {
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        conn.load_extension("nvmefs").unwrap();
        conn.register_secret(&BackendSecret::new(PATH, Transport::IoUringCmd))
            .unwrap();
        conn.attach("nvmefs:///test.db", "test").unwrap();
        conn
    }

    #[test]
    fn tables_survive_reconnect() {
        let fake = provisioned();
        let connector = MemoryConnector::new().with_device(fake.clone(), 1);

        let mut conn = connect(&connector);
        conn.execute("CREATE TABLE t (a INTEGER, b VARCHAR);").unwrap();
        conn.execute("INSERT INTO t VALUES (1, 'x'), (2, 'it''s');")
            .unwrap();
        conn.close().unwrap();

        let mut conn = connect(&connector);
        let rows = conn.query("SELECT * FROM t;").unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(1), Value::text("x")],
                vec![Value::Int(2), Value::text("it's")],
            ]
        );
        assert!(fake.written_blocks(1) >= 2);
    }

    #[test]
    fn deallocated_device_reads_empty() {
        let fake = provisioned();
        let connector = MemoryConnector::new().with_device(fake.clone(), 1);
        let mut conn = connect(&connector);
        conn.execute("CREATE TABLE t (a INTEGER);").unwrap();
        conn.close().unwrap();

        let device = DeviceManager::new(fake.clone()).open(PATH).unwrap();
        fake.deallocate(&device, 1, 0, device.capacity_blocks())
            .unwrap();

        let mut conn = connect(&connector);
        assert!(conn.query("SELECT * FROM t;").is_err());
    }

    #[test]
    fn secret_requires_extension() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        let err = conn
            .register_secret(&BackendSecret::new(PATH, Transport::Posix))
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn extension_artifact_path_loads_by_stem() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        conn.load_extension("/build/release/extension/nvmefs/nvmefs.duckdb_extension")
            .unwrap();
        conn.register_secret(&BackendSecret::new(PATH, Transport::Posix))
            .unwrap();
    }

    #[test]
    fn database_on_connect_uses_persistent_secret() {
        let fake = provisioned();
        let connector = MemoryConnector::new().with_device(fake, 1);
        let mut conn = connect(&connector);
        conn.execute("CREATE TABLE t (a INTEGER);").unwrap();
        conn.execute("INSERT INTO t VALUES (7);").unwrap();
        conn.close().unwrap();

        let mut conn = connector
            .connect(&EngineConfig::new().database("nvmefs:///test.db"))
            .unwrap();
        assert_eq!(conn.query("SELECT count(*) FROM t;").unwrap(), vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn canned_results_take_precedence() {
        let connector = MemoryConnector::new().with_result(
            "PRAGMA tpch(1);",
            vec![vec![Value::text("A"), Value::Int(3)]],
        );
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        let rows = conn.query("PRAGMA   tpch(1)").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(conn.query("PRAGMA tpch(2);").is_err());
        assert_eq!(connector.statements(), vec!["PRAGMA tpch(1)", "PRAGMA tpch(2)"]);
    }

    #[test]
    fn literals_parse_by_shape() {
        let fake = provisioned();
        let connector = MemoryConnector::new().with_device(fake, 1);
        let mut conn = connect(&connector);
        conn.execute("CREATE TABLE t (a DECIMAL(15,2), b DATE, c INTEGER);")
            .unwrap();
        conn.execute("INSERT INTO t VALUES (3.50, DATE '2024-01-01', NULL);")
            .unwrap();
        let rows = conn.query("SELECT * FROM t").unwrap();
        assert_eq!(
            rows[0],
            vec![
                Value::Decimal(Decimal::new(350, 2)),
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Value::Null,
            ]
        );
        assert!(conn.execute("INSERT INTO t VALUES (1);").is_err());
    }

    #[test]
    fn close_is_counted_once() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert_eq!(connector.closed(), 1);
        assert!(conn.query("SELECT * FROM t").is_err());
    }

    #[test]
    fn injected_statement_failure() {
        let connector = MemoryConnector::new();
        connector.fail_on("CALL dbgen(sf=1);");
        let mut conn = connector.connect(&EngineConfig::new()).unwrap();
        assert!(conn.execute("CALL dbgen(sf=1)").is_err());
    }
}

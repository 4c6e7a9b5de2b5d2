//! TPC-H reference workloads
//!
//! The engine's `tpch` extension ships the reference answer of every query
//! at the standard scale factors. A [`ReferenceWorkload`] fetches that
//! answer, runs the query, times it and validates the produced rows.
//!
//! Run under [`EngineConfig::spill_profile`](nvmefs_session::EngineConfig::spill_profile)
//! at SF1 the larger queries exceed the memory limit and spill to the device.

use crate::parser::parse;
use crate::schema::{ColumnSchema, ColumnType};
use crate::validator::{validate, ValidationOutcome};
use nvmefs_core::{Error, Result, Row, Value};
use nvmefs_session::EngineConnection;
use std::time::{Duration, Instant};

/// Number of TPC-H queries
pub const QUERY_COUNT: u32 = 22;

/// Column types of TPC-H query `query` as rendered by the reference answers
pub fn schema(query: u32) -> Result<ColumnSchema> {
    use ColumnType::{Date as D, Decimal as N, Float as F, Integer as I, Text as T};

    let columns: &[ColumnType] = match query {
        1 => &[T, T, N, N, N, N, F, F, F, I],
        2 => &[N, T, T, I, T, T, T, T],
        3 => &[I, N, D, I],
        4 => &[T, I],
        5 => &[T, N],
        6 => &[N],
        7 => &[T, T, I, N],
        8 => &[I, F],
        9 => &[T, I, N],
        10 => &[I, T, N, N, T, T, T, T],
        11 => &[I, N],
        12 => &[T, I, I],
        13 => &[I, I],
        14 => &[F],
        15 => &[I, T, T, T, N],
        16 => &[T, T, I, I],
        17 => &[F],
        18 => &[T, I, I, D, N, N],
        19 => &[N],
        20 => &[T, T],
        21 => &[T, I],
        22 => &[T, I, N],
        other => {
            return Err(Error::config(format!(
                "TPC-H has queries 1 to {QUERY_COUNT}, not {other}"
            )))
        }
    };
    Ok(ColumnSchema::new(columns))
}

/// Statement fetching the reference answer of `query` at `scale_factor`
pub fn reference_answer_sql(query: u32, scale_factor: u32) -> String {
    format!(
        "SELECT answer FROM tpch_answers() WHERE query_nr = {query} AND scale_factor = {scale_factor};"
    )
}

/// Statement running `query`
pub fn query_sql(query: u32) -> String {
    format!("PRAGMA tpch({query});")
}

/// Generate the TPC-H tables at `scale_factor` in the current database
pub fn generate(connection: &mut dyn EngineConnection, scale_factor: u32) -> Result<()> {
    let start = Instant::now();
    connection.execute(&format!("CALL dbgen(sf={scale_factor});"))?;
    tracing::info!(
        target: "nvmefs::workload",
        scale_factor,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "generated TPC-H data"
    );
    Ok(())
}

/// Result of running one reference workload
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadReport {
    /// Query number
    pub query: u32,
    /// Rows the query produced
    pub rows: usize,
    /// Wall-clock time of the query alone
    pub elapsed: Duration,
    /// Validation against the reference answer
    pub outcome: ValidationOutcome,
}

impl WorkloadReport {
    /// `Ok(())` if the produced rows matched the reference answer
    pub fn into_result(self) -> Result<()> {
        self.outcome.into_result()
    }
}

/// One TPC-H query validated against its reference answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWorkload {
    query: u32,
    scale_factor: u32,
    schema: ColumnSchema,
}

impl ReferenceWorkload {
    /// Workload for TPC-H `query` at `scale_factor`
    pub fn tpch(query: u32, scale_factor: u32) -> Result<Self> {
        Ok(Self {
            query,
            scale_factor,
            schema: schema(query)?,
        })
    }

    /// Every TPC-H query at `scale_factor`, in query order
    pub fn all(scale_factor: u32) -> impl Iterator<Item = Self> {
        (1..=QUERY_COUNT).filter_map(move |query| Self::tpch(query, scale_factor).ok())
    }

    /// Query number
    pub fn query(&self) -> u32 {
        self.query
    }

    /// Scale factor
    pub fn scale_factor(&self) -> u32 {
        self.scale_factor
    }

    /// Column schema of the answer
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Fetch and parse the reference answer
    pub fn expected(&self, connection: &mut dyn EngineConnection) -> Result<Vec<Row>> {
        let rows = connection.query(&reference_answer_sql(self.query, self.scale_factor))?;
        let cell = rows.first().and_then(|row| row.first()).ok_or_else(|| {
            Error::engine(format!(
                "no reference answer for query {} at scale factor {}",
                self.query, self.scale_factor
            ))
        })?;
        let answer = cell.as_text().ok_or_else(|| {
            Error::engine(format!(
                "reference answer for query {} is a {}, not text",
                self.query,
                cell.type_name()
            ))
        })?;
        parse(answer, &self.schema)
    }

    /// Run the query and validate it against the reference answer.
    ///
    /// Only the query itself is timed; fetching the answer is not.
    pub fn run(&self, connection: &mut dyn EngineConnection) -> Result<WorkloadReport> {
        let expected = self.expected(connection)?;

        let start = Instant::now();
        let actual = connection.query(&query_sql(self.query))?;
        let elapsed = start.elapsed();

        let outcome = validate(&actual, &expected);
        tracing::info!(
            target: "nvmefs::workload",
            query = self.query,
            scale_factor = self.scale_factor,
            rows = actual.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            passed = outcome.is_pass(),
            "query {} finished",
            self.query
        );

        Ok(WorkloadReport {
            query: self.query,
            rows: actual.len(),
            elapsed,
            outcome,
        })
    }
}

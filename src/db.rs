// SPDX-License-Identifier: MIT

//! Connection management and the scoped `CompilationView` over the metrics store.
//!
//! A plot's SQL runs against a temporary view joining the compilation records with their machine
//! and file rows, plus computed convenience columns. SQLite does not allow bind parameters inside
//! `CREATE VIEW`, so when a plot restricts the time period or the OS family, the filter values go
//! into a temporary one-row table and the view's WHERE clause reads them back through scalar
//! subqueries. Both objects are connection-scoped temporaries and live for exactly one query
//! execution.
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::analyzer::Plot;
use crate::error::{Error, Result};
use crate::iso8601;

/// Environment variable consulted when no database path is given explicitly.
pub const DB_ENV_KEY: &str = "COMPILATION_METRICS_DB";

const VIEW_NAME: &str = "CompilationView";
const PARAMS_TABLE: &str = "CompilationViewParams";

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(())
}

/// Open the metrics store at `path`, falling back to the `COMPILATION_METRICS_DB` environment
/// variable, and create the metric tables if they don't exist yet.
///
/// Absence of both the parameter and the variable is a configuration error, surfaced before any
/// lexing or parsing happens.
pub fn connect(path: Option<&Path>) -> Result<Connection> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match std::env::var_os(DB_ENV_KEY) {
            Some(value) => PathBuf::from(value),
            None => {
                return Err(Box::new(Error::Config {
                    msg: format!(
                        "no database path given and the environment variable {} is not set",
                        DB_ENV_KEY
                    ),
                }))
            }
        },
    };
    let conn = Connection::open(path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory metrics store with the schema applied.
pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn view_sql(where_clause: &str) -> String {
    format!(
        "\
create temporary view {view} as
select
       /* All fields from the main table (Compilation) */
       Compilation.*

       /* Computed convenience columns */
     , UserCpuTime + SystemCpuTime                        as CpuTime
     , BlockingInputOperations + BlockingOutputOperations as BlockingOperations

       /* Some fields from the joined-in tables */
     , File.Name                                          as FileName
     , File.Path                                          as FilePath
     , File.LineCount                                     as FileLineCount
     , File.PreprocessedSizeBytes                         as FilePreprocessedSizeBytes
     , File.PreprocessedLineCount                         as FilePreprocessedLineCount
     , Machine.Name                                       as MachineName
     , Machine.System                                     as MachineSystem

       /* Aliases for other columns */
     , Machine.System                                     as System
     , Compilation.StartIso8601                           as Start
     , Compilation.DurationSeconds                        as Duration
     , Compilation.MaxResidentMemoryBytes                 as Memory
from Compilation
inner join Machine on Compilation.MachineKey = Machine.Key
inner join File    on Compilation.FileKey = File.Key
{where_clause};",
        view = VIEW_NAME,
        where_clause = where_clause,
    )
}

/// The transient database objects backing one query execution: the `CompilationView` temporary
/// view and, when the plot carries filters, the one-row parameter table it reads.
///
/// `release` tears both down and reports failures; `Drop` does the same best-effort, so the
/// objects never outlive the execution, whether it succeeds, errors, or is abandoned mid-stream.
#[must_use]
pub struct ScopedView<'c> {
    conn: &'c Connection,
    released: bool,
}

impl<'c> ScopedView<'c> {
    /// Create the view (and parameter table, when filters are requested) for one plot.
    pub fn create(conn: &'c Connection, plot: &Plot) -> Result<Self> {
        // Constructed before the objects: teardown says IF EXISTS, so a failure at any stage of
        // creation still unwinds whatever was created.
        let view = Self {
            conn,
            released: false,
        };

        let mut predicates = Vec::<String>::new();
        if plot.period.is_some() {
            predicates.push(format!(
                "Compilation.StartIso8601 between \
                 (select PeriodBegin from {t}) and (select PeriodEnd from {t})",
                t = PARAMS_TABLE,
            ));
        }
        if plot.system.is_some() {
            predicates.push(format!(
                "Machine.System = (select System from {t})",
                t = PARAMS_TABLE,
            ));
        }

        if !predicates.is_empty() {
            conn.execute(
                &format!(
                    "create temporary table {}(PeriodBegin, PeriodEnd, System);",
                    PARAMS_TABLE
                ),
                [],
            )?;
            let (begin, end) = match &plot.period {
                Some((begin, end)) => (Some(iso8601::sql_text(begin)), Some(iso8601::sql_text(end))),
                None => (None, None),
            };
            conn.execute(
                &format!(
                    "insert into {}(PeriodBegin, PeriodEnd, System) values(?1, ?2, ?3);",
                    PARAMS_TABLE
                ),
                rusqlite::params![begin, end, plot.system],
            )?;
        }

        let where_clause = if predicates.is_empty() {
            String::new()
        } else {
            format!("where {}", predicates.join(" and "))
        };
        conn.execute(&view_sql(&where_clause), [])?;

        Ok(view)
    }

    fn teardown(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(&format!(
            "drop view if exists {}; drop table if exists {};",
            VIEW_NAME, PARAMS_TABLE
        ))
    }

    /// Tear down the view and parameter table, reporting any failure to do so.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.teardown()
            .map_err(|source| Box::new(Error::Database { source }))
    }
}

impl Drop for ScopedView<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Teardown failures have nowhere to go from a destructor.
            let _ = self.teardown();
        }
    }
}

fn run_streaming<F>(conn: &Connection, query: &str, on_row: &mut F) -> Result<()>
where
    F: FnMut(&rusqlite::Row<'_>) -> Result<()>,
{
    let mut stmt = conn.prepare(query)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        on_row(row)?;
    }
    Ok(())
}

/// Execute a plot's query against its scoped view, invoking `on_row` for each result row as the
/// engine produces it (no materialization).
///
/// The view and parameter table are dropped before this returns, whether execution succeeds, the
/// engine rejects the SQL, or `on_row` aborts with an error; the first error wins.
pub fn stream_rows<F>(conn: &Connection, plot: &Plot, mut on_row: F) -> Result<()>
where
    F: FnMut(&rusqlite::Row<'_>) -> Result<()>,
{
    let view = ScopedView::create(conn, plot)?;
    let streamed = run_streaming(conn, &plot.query, &mut on_row);
    let released = view.release();
    streamed.and(released)
}

/// Convert one result row into JSON values, in column order.
pub fn row_values(row: &rusqlite::Row<'_>) -> Result<Vec<serde_json::Value>> {
    let count = row.as_ref().column_count();
    let mut values = Vec::with_capacity(count);
    for index in 0..count {
        values.push(match row.get_ref(index)? {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(n) => serde_json::Value::from(n),
            ValueRef::Real(x) => serde_json::Value::from(x),
            ValueRef::Text(text) => {
                serde_json::Value::from(String::from_utf8_lossy(text).into_owned())
            }
            ValueRef::Blob(bytes) => serde_json::Value::from(bytes.to_vec()),
        });
    }
    Ok(values)
}

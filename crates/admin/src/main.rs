// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use std::ffi::OsString;
use std::io::Write;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use stockroom_audit::{AuditLogEntry, HistoryStat};
use stockroom_persistence::{
    AuditLogger, DEFAULT_RETENTION_DAYS, Database, PersistenceError, format_timestamp,
    parse_timestamp,
};
use time::PrimitiveDateTime;
use tracing::info;

/// Stockroom Admin - operator tooling for the Stockroom audit history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If neither this nor a MySQL URL is
    /// given, a fresh in-memory database is used.
    #[arg(short, long)]
    database: Option<String>,

    /// MySQL/MariaDB connection URL. A URL taken from `DATABASE_URL` is
    /// ignored when `--database` is given.
    #[arg(long, env = "DATABASE_URL")]
    mysql_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

const SOURCE_CONFLICT: &str =
    "the argument '--database <DATABASE>' cannot be used with '--mysql-url <MYSQL_URL>'";

impl Args {
    fn parse_cli<I, T>(arguments: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut command: clap::Command = Self::command();
        let matches: clap::ArgMatches = command.try_get_matches_from_mut(arguments)?;
        Self::from_arg_matches(&matches)?
            .with_url_source(matches.value_source("mysql_url"))
            .map_err(|message| command.error(ErrorKind::ArgumentConflict, message))
    }

    /// Both sources given on the command line conflict; an environment URL
    /// yields to `--database`.
    fn with_url_source(mut self, source: Option<ValueSource>) -> Result<Self, &'static str> {
        if self.database.is_some() && self.mysql_url.is_some() {
            if source != Some(ValueSource::EnvVariable) {
                return Err(SOURCE_CONFLICT);
            }
            self.mysql_url = None;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Most recent audit records, newest first
    History {
        /// Maximum number of records (defaults to 1000)
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Records with the given action type
    ByType { action_type: String },
    /// Records where the principal is the actor or the affected principal
    ByUser { user_id: i64 },
    /// Records affecting the given product
    ByProduct { product_id: i64 },
    /// Records created within an inclusive window (`YYYY-MM-DD HH:MM:SS`, UTC)
    Range {
        #[arg(long, value_parser = parse_datetime)]
        from: PrimitiveDateTime,
        #[arg(long, value_parser = parse_datetime)]
        to: PrimitiveDateTime,
    },
    /// Per-day counts by action type over the last 30 days
    Stats,
    /// Delete records older than the retention window
    Prune {
        /// Days of history to keep
        #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        days: u32,
    },
}

#[derive(Debug, thiserror::Error)]
enum AdminError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("failed to write JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// The result of one subcommand, ready to render.
#[derive(Debug)]
enum Output {
    History(Vec<AuditLogEntry>),
    Stats(Vec<HistoryStat>),
    Pruned(PruneSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PruneSummary {
    removed: usize,
    days_kept: u32,
}

/// One audit record as printed: timestamps as text, display names inline.
#[derive(Debug, Serialize)]
struct HistoryLine {
    id: i64,
    action_type: String,
    performed_by: i64,
    performed_by_name: Option<String>,
    target_user: Option<i64>,
    target_user_name: Option<String>,
    target_product: Option<i64>,
    target_product_name: Option<String>,
    old_value: Option<Value>,
    new_value: Option<Value>,
    description: String,
    created_at: String,
}

const HISTORY_HEADER: [&str; 12] = [
    "id",
    "action_type",
    "performed_by",
    "performed_by_name",
    "target_user",
    "target_user_name",
    "target_product",
    "target_product_name",
    "old_value",
    "new_value",
    "description",
    "created_at",
];

impl HistoryLine {
    fn from_entry(entry: AuditLogEntry) -> Result<Self, AdminError> {
        Ok(Self {
            id: entry.id,
            action_type: entry.action_type,
            performed_by: entry.performed_by,
            performed_by_name: entry.performed_by_name,
            target_user: entry.target_user,
            target_user_name: entry.target_user_name,
            target_product: entry.target_product,
            target_product_name: entry.target_product_name,
            old_value: entry.old_value,
            new_value: entry.new_value,
            description: entry.description,
            created_at: format_timestamp(entry.created_at)?,
        })
    }

    /// CSV cells; snapshots are embedded as compact JSON text.
    fn csv_record(&self) -> [String; 12] {
        [
            self.id.to_string(),
            self.action_type.clone(),
            self.performed_by.to_string(),
            optional(self.performed_by_name.as_ref()),
            optional(self.target_user.as_ref()),
            optional(self.target_user_name.as_ref()),
            optional(self.target_product.as_ref()),
            optional(self.target_product_name.as_ref()),
            optional(self.old_value.as_ref()),
            optional(self.new_value.as_ref()),
            self.description.clone(),
            self.created_at.clone(),
        ]
    }
}

#[derive(Debug, Serialize)]
struct StatLine {
    action_type: String,
    day: String,
    count: i64,
}

fn optional<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn parse_datetime(text: &str) -> Result<PrimitiveDateTime, String> {
    parse_timestamp(text).map_err(|err| err.to_string())
}

fn open_database(args: &Args) -> Result<Database, AdminError> {
    if let Some(path) = &args.database {
        info!("Using file-based database at: {}", path);
        Ok(Database::new_with_file(path)?)
    } else if let Some(url) = &args.mysql_url {
        info!("Using MySQL database");
        Ok(Database::new_with_mysql(url)?)
    } else {
        info!("Using in-memory database");
        Ok(Database::new_in_memory()?)
    }
}

fn execute(command: &Command, database: &Database) -> Result<Output, AdminError> {
    let mut logger: AuditLogger = AuditLogger::new(database);
    let output: Output = match command {
        Command::History { limit: None } => Output::History(logger.get_history()?),
        Command::History { limit: Some(limit) } => {
            Output::History(logger.get_history_limited(*limit)?)
        }
        Command::ByType { action_type } => Output::History(logger.get_logs_by_type(action_type)?),
        Command::ByUser { user_id } => Output::History(logger.get_logs_by_user(*user_id)?),
        Command::ByProduct { product_id } => {
            Output::History(logger.get_logs_by_product(*product_id)?)
        }
        Command::Range { from, to } => Output::History(logger.get_logs_by_date_range(*from, *to)?),
        Command::Stats => Output::Stats(logger.get_history_stats()?),
        Command::Prune { days } => Output::Pruned(PruneSummary {
            removed: logger.clean_old_logs(*days)?,
            days_kept: *days,
        }),
    };
    logger.close();
    Ok(output)
}

fn render<W: Write + ?Sized>(
    output: Output,
    format: OutputFormat,
    writer: &mut W,
) -> Result<(), AdminError> {
    match (output, format) {
        (Output::History(entries), format) => {
            let lines: Vec<HistoryLine> = entries
                .into_iter()
                .map(HistoryLine::from_entry)
                .collect::<Result<_, _>>()?;
            match format {
                OutputFormat::Json => write_json(&lines, writer)?,
                OutputFormat::Csv => {
                    let mut csv_writer = csv::Writer::from_writer(&mut *writer);
                    csv_writer.write_record(HISTORY_HEADER)?;
                    for line in &lines {
                        csv_writer.write_record(line.csv_record())?;
                    }
                    csv_writer.flush()?;
                }
            }
        }
        (Output::Stats(stats), format) => {
            let lines: Vec<StatLine> = stats
                .into_iter()
                .map(|stat| StatLine {
                    action_type: stat.action_type,
                    day: stat.day.to_string(),
                    count: stat.count,
                })
                .collect();
            match format {
                OutputFormat::Json => write_json(&lines, writer)?,
                OutputFormat::Csv => write_csv(&lines, writer)?,
            }
        }
        (Output::Pruned(summary), OutputFormat::Json) => write_json(&summary, writer)?,
        (Output::Pruned(summary), OutputFormat::Csv) => {
            write_csv(std::slice::from_ref(&summary), writer)?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized, W: Write + ?Sized>(
    value: &T,
    writer: &mut W,
) -> Result<(), AdminError> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn write_csv<T: Serialize, W: Write + ?Sized>(rows: &[T], writer: &mut W) -> Result<(), AdminError> {
    let mut csv_writer = csv::Writer::from_writer(&mut *writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn main() -> Result<(), AdminError> {
    let args: Args = Args::parse_cli(std::env::args_os()).unwrap_or_else(|err| err.exit());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Stockroom admin");

    let database: Database = open_database(&args)?;
    let output: Output = execute(&args.command, &database)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    render(output, args.format, &mut handle)?;
    handle.flush()?;

    Ok(())
}

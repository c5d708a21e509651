//! Implementation of the `fridge` command.
//!
//! Every subcommand maps onto one ledger [`Request`]; the reply is printed
//! to stdout as JSON. Logs go to stderr.

use crate::cmd::completions::ShellType;
use crate::config::{parse_timezone, Config, DEFAULT_DB_PATH};
use crate::request::{execute, Reply, Request, UpdateExpiry};
use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use fridgeledger_core::{parse_date, BatchId, NewBatch};
use fridgeledger_store::SelectionMode;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Track fridge inventory, expiry dates and consumption.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// SQLite database file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// IANA timezone used for "today" and zoned dates
    #[arg(long, value_name = "TZ", default_value = "Asia/Shanghai", value_parser = parse_timezone)]
    pub timezone: Tz,

    /// Shelf life registered for items stocked without an expiry
    #[arg(
        long,
        value_name = "DAYS",
        default_value_t = fridgeledger_store::DEFAULT_SHELF_LIFE_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(fridgeledger_store::MAX_SHELF_LIFE_DAYS))
    )]
    pub default_shelf_life: u32,

    /// Evaluate `query` and `expiring` as of this date instead of today
    #[arg(long, value_name = "DATE")]
    pub today: Option<String>,

    /// Pretty-print the JSON reply
    #[arg(short, long)]
    pub pretty: bool,

    /// Show debug logs on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// `fridge` subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Stock a new batch
    Add {
        /// Item name
        name: String,
        /// Amount stocked
        quantity: f64,
        /// Unit of measure (L, pcs, g, ...)
        #[arg(long)]
        unit: Option<String>,
        /// Arrival date (defaults to today)
        #[arg(long, value_name = "DATE")]
        in_at: Option<String>,
        /// Expires this many days after arrival
        #[arg(long, value_name = "DAYS", allow_negative_numbers = true)]
        exp_days: Option<i64>,
        /// Expires on this date
        #[arg(long, value_name = "DATE", conflicts_with = "exp_days")]
        exp_at: Option<String>,
    },

    /// Eat some of an item, earliest expiry first
    Consume {
        /// Item name
        name: String,
        /// Amount eaten
        quantity: f64,
    },

    /// Throw some of an item away, earliest expiry first
    Discard {
        /// Item name
        name: String,
        /// Amount thrown away
        quantity: f64,
    },

    /// List every batch with its days remaining
    Query,

    /// List batches expiring within the next DAYS days
    Expiring {
        /// Window length in days
        days: i64,
    },

    /// Set an item's shelf life and recompute inferred expiries
    SetShelfLife {
        /// Item name
        name: String,
        /// Shelf life in days
        days: u32,
    },

    /// Correct the expiry of a batch, or of some batches of an item
    UpdateExpiry {
        /// Batch id
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<BatchId>,
        /// Item name
        #[arg(long)]
        name: Option<String>,
        /// Which of the item's batches to correct
        #[arg(long, value_enum, default_value_t = ModeArg::All)]
        mode: ModeArg,
        /// Expires this many days after each batch's arrival
        #[arg(
            long,
            value_name = "DAYS",
            allow_negative_numbers = true,
            required_unless_present = "exp_at"
        )]
        exp_days: Option<i64>,
        /// Expires on this date
        #[arg(long, value_name = "DATE", conflicts_with = "exp_days")]
        exp_at: Option<String>,
    },

    /// Show the discard log
    Waste {
        /// Only this item
        #[arg(long)]
        name: Option<String>,
    },

    /// List registered shelf lives
    ShelfLives,

    /// Run a raw JSON request (from the argument, or stdin when absent or `-`)
    Request {
        /// Request payload, e.g. {"action":"query"}
        json: Option<String>,
    },

    /// Print shell completions
    Completions {
        /// Target shell
        shell: ShellType,
    },
}

/// Batch selection for `update-expiry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Every batch of the item
    All,
    /// The earliest-expiring batch
    Earliest,
    /// The latest-expiring batch
    Latest,
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => Self::All,
            ModeArg::Earliest => Self::Earliest,
            ModeArg::Latest => Self::Latest,
        }
    }
}

impl Command {
    /// The ledger request this subcommand stands for.
    ///
    /// `None` for `request`, whose payload is decoded separately, and for
    /// `completions`, which never opens the ledger.
    pub fn to_request(&self) -> Option<Request> {
        let request = match self {
            Self::Add {
                name,
                quantity,
                unit,
                in_at,
                exp_days,
                exp_at,
            } => Request::Add(NewBatch {
                name: name.clone(),
                quantity: *quantity,
                unit: unit.clone(),
                in_at: in_at.clone(),
                exp_days: *exp_days,
                exp_at: exp_at.clone(),
            }),
            Self::Consume { name, quantity } => Request::Consume {
                name: name.clone(),
                quantity: *quantity,
            },
            Self::Discard { name, quantity } => Request::Discard {
                name: name.clone(),
                quantity: *quantity,
            },
            Self::Query => Request::Query,
            Self::Expiring { days } => Request::Expiring { n_days: *days },
            Self::SetShelfLife { name, days } => Request::SetShelfLife {
                name: name.clone(),
                exp_days: *days,
            },
            Self::UpdateExpiry {
                id,
                name,
                mode,
                exp_days,
                exp_at,
            } => Request::UpdateExpiry(UpdateExpiry {
                id: *id,
                name: name.clone(),
                mode: (*mode).into(),
                exp_days: *exp_days,
                exp_at: exp_at.clone(),
            }),
            Self::Waste { name } => Request::Waste { name: name.clone() },
            Self::ShelfLives => Request::ShelfLives,
            Self::Request { .. } | Self::Completions { .. } => return None,
        };
        Some(request)
    }
}

impl Args {
    /// Ledger configuration from the global flags.
    pub fn config(&self) -> Result<Config> {
        Ok(Config::builder()
            .db_path(&self.db)
            .timezone(self.timezone)
            .default_shelf_life_days(self.default_shelf_life)?
            .build())
    }
}

fn read_payload(json: Option<&str>) -> Result<String> {
    match json {
        Some(text) if text != "-" => Ok(text.to_string()),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read request from stdin")?;
            Ok(text)
        }
    }
}

/// Execute the parsed command, writing the JSON reply to `out`.
///
/// Ledger errors are part of the reply (exit code 1); failures to open the
/// ledger or write output are returned as errors.
pub fn run(args: &Args, out: &mut dyn Write) -> Result<ExitCode> {
    let request = match &args.command {
        Command::Request { json } => Request::from_json(&read_payload(json.as_deref())?),
        command => match command.to_request() {
            Some(request) => Ok(request),
            None => return Ok(ExitCode::SUCCESS),
        },
    };

    let config = args.config()?;
    let mut store = config
        .open_store()
        .with_context(|| format!("failed to open ledger at {}", config.db_path.display()))?;

    let today = match &args.today {
        Some(text) => parse_date(text, config.timezone).context("invalid --today")?,
        None => store.today(),
    };

    let reply = Reply::from(request.and_then(|request| execute(&mut store, request, today)));

    if args.pretty {
        serde_json::to_writer_pretty(&mut *out, &reply)?;
    } else {
        serde_json::to_writer(&mut *out, &reply)?;
    }
    writeln!(out)?;

    Ok(if reply.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();
}

/// Main entry point for the fridge command.
pub fn main() -> ExitCode {
    main_with_name("fridge")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    // Handle shell completion generation
    if let Command::Completions { shell } = args.command {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    init_tracing(args.verbose);

    match run(&args, &mut io::stdout().lock()) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::Value;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fridge").chain(argv.iter().copied())).unwrap()
    }

    fn run_json(args: &Args) -> (ExitCode, Value) {
        let mut out = Vec::new();
        let code = run(args, &mut out).unwrap();
        (code, serde_json::from_slice(&out).unwrap())
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_defaults() {
        let args = parse(&["query"]);
        assert_eq!(args.db, PathBuf::from("./data/inventory.db"));
        assert_eq!(args.timezone, Tz::Asia__Shanghai);
        assert_eq!(args.default_shelf_life, 7);
        assert_eq!(args.command, Command::Query);
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        assert!(Args::try_parse_from(["fridge", "--timezone", "Nowhere/Town", "query"]).is_err());
    }

    #[test]
    fn test_zero_default_shelf_life_rejected() {
        assert!(Args::try_parse_from(["fridge", "--default-shelf-life", "0", "query"]).is_err());
        assert!(Args::try_parse_from(["fridge", "--default-shelf-life", "36501", "query"]).is_err());
    }

    #[test]
    fn test_add_maps_to_request() {
        let args = parse(&["add", "milk", "2", "--unit", "L", "--exp-days", "3"]);
        assert_eq!(
            args.command.to_request(),
            Some(Request::Add(NewBatch::new("milk", 2.0).unit("L").exp_days(3)))
        );
    }

    #[test]
    fn test_add_expiry_flags_conflict() {
        assert!(Args::try_parse_from([
            "fridge", "add", "milk", "1", "--exp-days", "3", "--exp-at", "2024-01-01"
        ])
        .is_err());
    }

    #[test]
    fn test_update_expiry_needs_target_and_expiry() {
        assert!(Args::try_parse_from(["fridge", "update-expiry", "--exp-days", "3"]).is_err());
        assert!(Args::try_parse_from(["fridge", "update-expiry", "--id", "3"]).is_err());

        let args = parse(&["update-expiry", "--name", "milk", "--mode", "latest", "--exp-at", "2024-02-01"]);
        assert_eq!(
            args.command.to_request(),
            Some(Request::UpdateExpiry(UpdateExpiry {
                id: None,
                name: Some("milk".to_string()),
                mode: SelectionMode::Latest,
                exp_days: None,
                exp_at: Some("2024-02-01".to_string()),
            }))
        );
    }

    #[test]
    fn test_run_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("fridge.db");
        let db = db.to_str().unwrap();

        let (code, reply) = run_json(&parse(&[
            "--db", db, "add", "milk", "2", "--in-at", "2024-01-01", "--exp-days", "3",
        ]));
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(reply["exp_at"], "2024-01-04");

        let (_, reply) = run_json(&parse(&["--db", db, "--today", "2024-01-02", "expiring", "3"]));
        assert_eq!(reply["items"][0]["name"], "milk");

        let (_, reply) = run_json(&parse(&["--db", db, "--today", "2024-01-10", "expiring", "3"]));
        assert_eq!(reply["items"], Value::Array(vec![]));
    }

    #[test]
    fn test_run_reports_ledger_errors_in_reply() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("fridge.db");
        let args = parse(&["--db", db.to_str().unwrap(), "request", r#"{"action":"nap"}"#]);

        let (code, reply) = run_json(&args);
        assert_eq!(code, ExitCode::from(1));
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["kind"], "invalid_argument");
    }
}

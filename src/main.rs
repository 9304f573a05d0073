// ==========================================
// Jury Engine - command line entry point
// ==========================================
//   jury-engine init
//   jury-engine call '{"action": "get_assignment_stats"}'
//   jury-engine serve            (one JSON request per stdin line)
// ==========================================

use std::io::{BufRead, Write};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use jury_engine::app::{get_default_db_path, handle_json, AppState, DB_PATH_ENV};
use jury_engine::logging::{self, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "jury-engine", version, about = "Awards jury assignment and evaluation engine")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and schema
    Init,
    /// Run one JSON request and print the response
    Call {
        /// Request object, e.g. '{"action":"get_rankings","limit":5}'
        request: String,
    },
    /// Read JSON requests from stdin, one per line
    Serve,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format.into());

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!("{} v{}", jury_engine::APP_NAME, jury_engine::VERSION);
    tracing::info!(db_path = %db_path, "using database");

    let state = AppState::new(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path))?;

    match cli.command {
        Command::Init => {
            tracing::info!("schema ready");
        }
        Command::Call { request } => {
            let response = handle_json(&state, &request);
            println!("{}", response.to_json());
            if !response.success {
                std::process::exit(1);
            }
        }
        Command::Serve => serve(&state)?,
    }

    Ok(())
}

fn serve(state: &AppState) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut handled = 0u64;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_json(state, &line);
        writeln!(out, "{}", response.to_json()).context("failed to write response")?;
        out.flush().context("failed to flush stdout")?;
        handled += 1;
    }

    tracing::info!(handled, "input closed, exiting");
    Ok(())
}

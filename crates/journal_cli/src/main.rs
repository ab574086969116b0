mod command;
mod repl;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use autosave::JournalPage;
use clap::{Parser, Subcommand};
use config::{AppConfig, ConfigStore, RemoteConfig};
use entry_store::EntryStore;
use form_codec::MemoryForm;
use journal_types::{EntryDate, RemoteMirror, SessionGate, date_from_query};
use parking_lot::Mutex;
use remote_supabase::{SessionFile, SupabaseClient};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::repl::{Repl, print_library};

#[derive(Debug, Parser)]
#[command(name = "mmoc", version, about = "Daily journal with autosave")]
struct Cli {
    /// Where entries, the session and logs are kept.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Directory holding config.json.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Day to open instead of today.
    #[arg(long, value_parser = parse_date)]
    date: Option<EntryDate>,
    /// URL query string carrying the day, e.g. `?date=2024-03-01`.
    #[arg(long, conflicts_with = "date")]
    query: Option<String>,
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Interactive editing (default).
    Edit,
    /// Print saved entries, newest first.
    List,
    /// Delete the entry for one day.
    Delete {
        #[arg(value_parser = parse_date)]
        date: EntryDate,
    },
}

fn parse_date(raw: &str) -> Result<EntryDate, String> {
    EntryDate::parse(raw).ok_or_else(|| format!("`{raw}` is not a YYYY-MM-DD date"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(config::default_data_dir);
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, data_dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "exiting with error");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, data_dir: PathBuf) -> Result<()> {
    let config_store = match &cli.config_dir {
        Some(dir) => ConfigStore::from_dir(dir),
        None => ConfigStore::from_default_location()?,
    };
    let config = match config_store.load_or_init() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(path = %config_store.path().display(), "failed to load config: {err:#}");
            AppConfig::default()
        }
    };

    let store = Arc::new(EntryStore::open_dir(&data_dir, config.storage.key.clone()));
    info!(data_dir = %data_dir.display(), key = store.key(), "entry store ready");

    match cli.command.unwrap_or(Mode::Edit) {
        Mode::List => print_library(&store.list()),
        Mode::Delete { date } => {
            if store.remove(&date)? {
                println!("Deleted {}.", date.human());
            } else {
                println!("No entry for {}.", date.human());
            }
        }
        Mode::Edit => {
            let date_override = cli.date.or_else(|| {
                let query = cli.query.as_deref()?;
                let date = date_from_query(query);
                if date.is_none() {
                    warn!(query, "query carries no usable date, opening today");
                }
                date
            });
            let remote = connect_remote(&config.remote, &data_dir)?;
            let mirror = remote.clone().map(|client| client as Arc<dyn RemoteMirror>);
            let gate = remote.map(|client| client as Arc<dyn SessionGate>);

            let form = Arc::new(Mutex::new(MemoryForm::journal()));
            let page = JournalPage::new(store, form, mirror, config.autosave.debounce());
            Repl::new(page, gate).run(date_override).await?;
        }
    }
    Ok(())
}

fn connect_remote(remote: &RemoteConfig, data_dir: &Path) -> Result<Option<Arc<SupabaseClient>>> {
    if !remote.is_usable() {
        info!("remote sync disabled");
        return Ok(None);
    }
    let client = SupabaseClient::new(remote)
        .context("failed to set up remote sync")?
        .with_session_file(SessionFile::from_dir(data_dir));
    info!(base_url = %remote.base_url, table = %remote.table, "remote sync enabled");
    Ok(Some(Arc::new(client)))
}

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "mmoc.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,journal_cli=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_date_and_subcommands() {
        let cli = Cli::try_parse_from(["mmoc", "--date", "2024-03-01"]).expect("parse");
        assert_eq!(cli.date, EntryDate::parse("2024-03-01"));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["mmoc", "delete", "2024-03-01"]).expect("parse");
        assert!(matches!(cli.command, Some(Mode::Delete { .. })));

        assert!(Cli::try_parse_from(["mmoc", "--date", "March 1"]).is_err());
        assert!(
            Cli::try_parse_from(["mmoc", "--date", "2024-03-01", "--query", "date=2024-03-02"])
                .is_err()
        );
    }
}

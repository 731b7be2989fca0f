//! hypr-sessions CLI
//!
//! Saves the windows of a running Hyprland session to a JSON file and
//! relaunches them later, putting each window back on its workspace with its
//! saved geometry.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyprsession_core::SystemClock;
use hyprsession_engine::{
    capture, default_session_path, load_session, missing_mappings, restore, save_session,
    session_file, Config, Environment, Error, Interrupt, RecordState, RestoreOptions,
    RestoreReport, EXIT_ENVIRONMENT, EXIT_OK, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};
use hyprsession_platform::{HyprlandClient, ProcFs, ShellLauncher};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hypr-sessions")]
#[command(author, version, about = "Save and restore Hyprland window layouts")]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the current windows into a session file
    Save {
        /// Session file to write (default: $XDG_STATE_HOME/hypr/session.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// App mapping file (default: $XDG_CONFIG_HOME/hypr/session-apps.toml)
        #[arg(short = 'a', long = "apps-toml")]
        apps_toml: Option<PathBuf>,

        /// Print the session instead of writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Relaunch a saved session and place its windows
    Restore {
        /// Session file to read (default: $XDG_STATE_HOME/hypr/session.json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// App mapping file (default: $XDG_CONFIG_HOME/hypr/session-apps.toml)
        #[arg(short = 'a', long = "apps-toml")]
        apps_toml: Option<PathBuf>,

        /// Show what would be launched and placed without doing it
        #[arg(long)]
        dry_run: bool,

        /// Seconds each app gets to open its window (overrides the config)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn session_path(explicit: Option<PathBuf>, flag: &str) -> Result<PathBuf> {
    explicit
        .or_else(default_session_path)
        .with_context(|| format!("cannot determine the session file location; pass {}", flag))
}

fn save(output: Option<PathBuf>, apps_toml: Option<&Path>, dry_run: bool) -> Result<i32> {
    let config = Config::load(apps_toml)?;
    let windows = HyprlandClient::from_env().map_err(Error::from)?;
    debug!("Hyprland socket: {}", windows.socket_path().display());

    let session = capture(&windows, &ProcFs::new(), &config)?;

    let missing = missing_mappings(&session, &config.mapping, &config.restore.browser_command);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(String::as_str).collect();
        eprintln!(
            "warning: no launch command mapped for: {} (add them to the app mapping file)",
            names.join(", ")
        );
    }

    if dry_run {
        println!("{}", session_file::to_json(&session)?);
        return Ok(EXIT_OK);
    }

    let path = session_path(output, "--output")?;
    save_session(&session, &path)?;
    println!("Saved {} windows to {}", session.len(), path.display());
    Ok(EXIT_OK)
}

/// `--timeout` within the same bounds the config file allows.
fn timeout_override(secs: u64) -> Duration {
    let clamped = secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
    if clamped != secs {
        warn!("--timeout {} out of range, using {}", secs, clamped);
    }
    Duration::from_secs(clamped)
}

async fn restore_session(
    input: Option<PathBuf>,
    apps_toml: Option<&Path>,
    dry_run: bool,
    timeout: Option<u64>,
) -> Result<i32> {
    let config = Config::load(apps_toml)?;
    let path = session_path(input, "--input")?;
    let session = load_session(&path)?;
    if session.is_empty() {
        return Err(Error::SessionFile {
            path,
            message: "session is empty".to_string(),
        }
        .into());
    }

    let mut options = RestoreOptions::from_config(&config.restore);
    options.dry_run = dry_run;
    if let Some(secs) = timeout {
        options.timeout = timeout_override(secs);
    }

    let interrupt = Arc::new(Interrupt::new());
    let signals = Arc::clone(&interrupt);
    tokio::spawn(async move {
        while let Ok(()) = tokio::signal::ctrl_c().await {
            if signals.raise() == 1 {
                warn!("Interrupted: no further apps will be launched (Ctrl-C again to stop waiting)");
            } else {
                warn!("Interrupted again: no longer waiting for windows");
                break;
            }
        }
    });

    let report = tokio::task::spawn_blocking(move || -> Result<RestoreReport, Error> {
        let windows = match HyprlandClient::from_env() {
            Ok(client) => client,
            // Dry-run never talks to the socket.
            Err(_) if options.dry_run => HyprlandClient::new(PathBuf::new()),
            Err(e) => return Err(e.into()),
        };
        let processes = ProcFs::new();
        let launcher = ShellLauncher::default();
        let env = Environment {
            windows: &windows,
            processes: &processes,
            launcher: &launcher,
            clock: &SystemClock,
        };
        restore(&session, &config, &options, &env, &interrupt)
    })
    .await
    .context("restore task panicked")??;

    print_report(&report);
    Ok(report.exit_code())
}

fn print_report(report: &RestoreReport) {
    for outcome in &report.outcomes {
        match &outcome.failure {
            Some(failure) => println!("{:>16}  {}: {}", outcome.state, outcome.label, failure),
            None if outcome.state == RecordState::Planned => {
                println!("{:>16}  {}", outcome.state, outcome.label);
                for action in &outcome.actions {
                    println!("{:>16}    {}", "", action);
                }
            }
            None => match outcome.window {
                Some(window) => {
                    println!("{:>16}  {} (window {:#x})", outcome.state, outcome.label, window)
                }
                None => println!("{:>16}  {}", outcome.state, outcome.label),
            },
        }
        for rejected in &outcome.rejected {
            println!("{:>16}    {} rejected: {}", "", rejected.step, rejected.reason);
        }
    }
    println!("{}", report.summary());
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Save {
            output,
            apps_toml,
            dry_run,
        } => save(output, apps_toml.as_deref(), dry_run),
        Commands::Restore {
            input,
            apps_toml,
            dry_run,
            timeout,
        } => restore_session(input, apps_toml.as_deref(), dry_run, timeout).await,
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("hypr-sessions: {:#}", err);
            let code = err
                .downcast_ref::<Error>()
                .map_or(EXIT_ENVIRONMENT, Error::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_save() {
        let cli = Cli::try_parse_from(["hypr-sessions", "-v", "save", "-o", "/tmp/s.json", "--dry-run"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Save {
                output,
                apps_toml,
                dry_run,
            } => {
                assert_eq!(output, Some(PathBuf::from("/tmp/s.json")));
                assert_eq!(apps_toml, None);
                assert!(dry_run);
            }
            _ => panic!("expected save"),
        }
    }

    #[test]
    fn test_parse_restore() {
        let cli = Cli::try_parse_from([
            "hypr-sessions",
            "restore",
            "-i",
            "s.json",
            "-a",
            "apps.toml",
            "--timeout",
            "30",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Restore {
                input,
                apps_toml,
                dry_run,
                timeout,
            } => {
                assert_eq!(input, Some(PathBuf::from("s.json")));
                assert_eq!(apps_toml, Some(PathBuf::from("apps.toml")));
                assert!(!dry_run);
                assert_eq!(timeout, Some(30));
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_timeout_override_is_clamped() {
        assert_eq!(timeout_override(30), Duration::from_secs(30));
        assert_eq!(timeout_override(0), Duration::from_secs(MIN_TIMEOUT_SECS));
        assert_eq!(timeout_override(100_000), Duration::from_secs(MAX_TIMEOUT_SECS));
        assert_eq!(timeout_override(u64::MAX), Duration::from_secs(MAX_TIMEOUT_SECS));
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["hypr-sessions", "snapshot"]).is_err());
    }
}

#![forbid(unsafe_code)]

mod backend;
mod config;
mod constants;
mod error;
mod fingerprint;
mod hooks;
mod identity;
mod layout;
mod lock;
mod matcher;
mod store;
mod switch;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use backend::XrandrBackend;
use config::AppConfig;
use fingerprint::{FingerprintExtractor, MonitorSet};
use identity::{CommandIdentityReader, EdidHexReader, IdentityReader, SysfsSource};
use lock::StoreLock;
use matcher::ProfileMatcher;
use store::{ProfileName, ProfileStore};
use switch::{SwitchController, SwitchReport};

/// Save and restore multi-monitor layouts keyed by the connected monitors
#[derive(Debug, Parser)]
#[command(name = "moniprof", version)]
struct Cli {
    /// Profile root directory (overrides config and MONIPROF_PROFILE_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    profile_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save the current layout of the enabled monitors as NAME
    Save { name: String },
    /// Switch to profile NAME
    Load {
        name: String,
        /// Print the xrandr arguments instead of switching
        #[arg(long)]
        dry_run: bool,
    },
    /// Switch to the profile matching the connected monitors
    Auto {
        /// Print the xrandr arguments instead of switching
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a stored profile
    Show { name: String },
    /// List profiles with their status
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete profile NAME
    #[command(visible_alias = "rm")]
    Remove { name: String },
    /// Print the live fingerprint
    Fingerprint {
        /// Only monitors whose output is enabled
        #[arg(long)]
        enabled: bool,
    },
}

fn init_tracing() -> Result<()> {
    let log_level = match std::env::var(constants::env::LOG_LEVEL)
        .unwrap_or_else(|_| "warn".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

/// Hardware and storage collaborators built from the resolved config
struct Runtime {
    store: ProfileStore,
    extractor: FingerprintExtractor,
    backend: XrandrBackend,
}

impl Runtime {
    fn new(config: &AppConfig) -> Self {
        let reader: Box<dyn IdentityReader> = match &config.identity_command {
            Some(command) => Box::new(CommandIdentityReader::new(command.clone())),
            None => Box::new(EdidHexReader),
        };
        Self {
            store: ProfileStore::new(&config.profile_dir),
            extractor: FingerprintExtractor::new(
                Box::new(SysfsSource::new(&config.sysfs_root)),
                reader,
            ),
            backend: XrandrBackend::new(config.xrandr.clone()),
        }
    }

    fn controller(&self, dry_run: bool) -> SwitchController<'_> {
        SwitchController::new(&self.store, &self.extractor, &self.backend).dry_run(dry_run)
    }
}

fn print_report(report: &SwitchReport, program: &str) {
    if report.dry_run {
        println!("{program} {}", backend::xrandr::xrandr_args(&report.clauses).join(" "));
        return;
    }
    println!("Switched to profile '{}'", report.profile);
    for output in report.disabled_outputs() {
        println!("  disabled {output}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = AppConfig::load()?
        .with_env(|key| std::env::var(key).ok())
        .with_profile_dir(cli.profile_dir);
    info!(profile_dir = %config.profile_dir.display(), "Using profile directory");
    let ctx = Runtime::new(&config);

    match command {
        Command::Save { name } => {
            let name: ProfileName = name.parse()?;
            let _lock = StoreLock::acquire(ctx.store.root())?;

            let profile = ctx.store.save_current(&name, &ctx.extractor, &ctx.backend)?;
            println!(
                "Saved profile '{name}' ({} monitors, {} outputs)",
                profile.fingerprint.identities().len(),
                profile.layout.records().len()
            );
        }
        Command::Load { name, dry_run } => {
            let name: ProfileName = name.parse()?;
            let _lock = StoreLock::acquire(ctx.store.root())?;
            let report = ctx.controller(dry_run).switch_to(&name)?;
            print_report(&report, &config.xrandr);
        }
        Command::Auto { dry_run } => {
            let _lock = StoreLock::acquire(ctx.store.root())?;
            let report = ctx.controller(dry_run).auto()?;
            print_report(&report, &config.xrandr);
        }
        Command::Show { name } => {
            let name: ProfileName = name.parse()?;
            let profile = ctx.store.load(&name)?;
            let active = ProfileMatcher::new(&ctx.store).find(&ctx.extractor.enabled())?;

            let marker = if active.as_ref() == Some(&profile.name) { " (active)" } else { "" };
            println!("profile: {}{marker}", profile.name);
            println!("monitors: {}", profile.fingerprint.identities().len());
            print!("{}", profile.layout.to_file_contents());
            if let Some(hook) = &profile.hooks.preswitch {
                println!("preswitch: {}", hook.display());
            }
            if let Some(hook) = &profile.hooks.postswitch {
                println!("postswitch: {}", hook.display());
            }
        }
        Command::List { json } => {
            let statuses = ctx
                .store
                .list(&ctx.extractor.connected(), &ctx.extractor.enabled())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                for status in &statuses {
                    println!("{status}");
                }
            }
        }
        Command::Remove { name } => {
            let name: ProfileName = name.parse()?;
            let _lock = StoreLock::acquire(ctx.store.root())?;
            ctx.store.remove(&name)?;
            println!("Removed profile '{name}'");
        }
        Command::Fingerprint { enabled } => {
            let set = if enabled { MonitorSet::Enabled } else { MonitorSet::Connected };
            print!("{}", ctx.extractor.fingerprint(set));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("moniprof: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("moniprof: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! cellops CLI
//!
//! Entry point for the `cellops` command-line tool.

use clap::{ArgAction, Parser, Subcommand};
use cellops::deploy::SystemRunner;
use cellops::pipeline::{self, Context, PipelineError};
use cellops::signal::{self, CancelToken};
use cellops::smoke::ProcessDriver;
use cellops::stamp::StampOutcome;
use cellops::{ConfigError, ExitCode};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cellops")]
#[command(about = "Checks, deploys and smoke-tests the cellular-life simulation", version)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, short = 'C', global = true)]
    base_dir: Option<PathBuf>,

    /// Config file (default: <base-dir>/cellops.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run static artifact checks
    Check {
        /// Check set to run (repeatable; default: all, in file order)
        #[arg(long = "set", short = 's')]
        sets: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Evaluate artifacts on parallel threads
        #[arg(long)]
        parallel: bool,
    },

    /// Stage, commit and push the project
    Deploy {
        /// Commit message (default from [deploy] message)
        message: Option<String>,

        #[arg(long)]
        remote: Option<String>,

        #[arg(long)]
        branch: Option<String>,

        /// Update the build date before staging
        #[arg(long)]
        stamp: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write the current time into the version file
    Stamp {
        /// Version file (default from [stamp] file)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Run the browser smoke test
    Smoke {
        /// Page to load
        #[arg(long)]
        url: Option<String>,

        /// Driver argv element (repeat for each argument)
        #[arg(long, allow_hyphen_values = true)]
        driver: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(code.as_i32());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// CLI flags that map onto configuration keys.
fn overrides(command: &Commands) -> Value {
    let mut layer = Map::new();
    match command {
        Commands::Deploy { remote, branch, .. } => {
            let mut deploy = Map::new();
            if let Some(r) = remote {
                deploy.insert("remote".to_string(), json!(r));
            }
            if let Some(b) = branch {
                deploy.insert("branch".to_string(), json!(b));
            }
            if !deploy.is_empty() {
                layer.insert("deploy".to_string(), Value::Object(deploy));
            }
        }
        Commands::Smoke { url, driver, .. } => {
            let mut smoke = Map::new();
            if let Some(u) = url {
                smoke.insert("url".to_string(), json!(u));
            }
            if !driver.is_empty() {
                smoke.insert("driver".to_string(), json!(driver));
            }
            if !smoke.is_empty() {
                layer.insert("smoke".to_string(), Value::Object(smoke));
            }
        }
        _ => {}
    }
    Value::Object(layer)
}

fn cancel_token() -> CancelToken {
    let token = CancelToken::new();
    if let Err(e) = signal::install(&token) {
        log::warn!("cannot install interrupt handler: {}", e);
    }
    token
}

fn run(cli: Cli) -> Result<ExitCode, PipelineError> {
    let ctx = Context::load(
        cli.base_dir.as_deref(),
        cli.config.as_deref(),
        overrides(&cli.command),
    )?;

    match cli.command {
        Commands::Check {
            sets,
            json,
            parallel,
        } => {
            let summary = pipeline::run_checks(&ctx, &sets, parallel)?;
            if json {
                println!("{}", summary.to_json()?);
            } else {
                println!("{}", summary.to_human());
            }
            Ok(summary.exit_code())
        }

        Commands::Deploy {
            message,
            stamp,
            json,
            ..
        } => {
            let token = cancel_token();
            let report = pipeline::run_deploy(&ctx, &SystemRunner, message, stamp, &token);
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.to_human());
            }
            Ok(report.exit_code())
        }

        Commands::Stamp { file } => {
            let (path, outcome) = pipeline::run_stamp(&ctx, file.as_deref())?;
            match outcome {
                StampOutcome::Updated { previous, current } => {
                    println!("{}: BUILD_DATE {} -> {}", path.display(), previous, current);
                }
                StampOutcome::Unchanged { value } => {
                    println!("{}: BUILD_DATE already {}", path.display(), value);
                }
            }
            Ok(ExitCode::Success)
        }

        Commands::Smoke { json, .. } => {
            if ctx.project.smoke.driver.is_empty() {
                return Err(ConfigError::Invalid(
                    "no browser driver configured; set [smoke] driver or pass --driver".to_string(),
                )
                .into());
            }
            let token = cancel_token();
            let smoke = &ctx.project.smoke;
            let mut driver = ProcessDriver::spawn(
                &smoke.driver,
                Duration::from_millis(smoke.request_timeout_ms),
            )?;
            let report = pipeline::run_smoke(&ctx, &mut driver, &token)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.to_human());
            }
            Ok(report.exit_code())
        }

        Commands::Config => {
            println!("{}", ctx.effective.to_json()?);
            Ok(ExitCode::Success)
        }
    }
}

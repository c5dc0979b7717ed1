use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use lipkbh::config::BuildConfig;
use lipkbh::error::{exit_code, BuildError, EXIT_INIT, EXIT_USAGE};
use lipkbh::observability;
use lipkbh::orchestrator::{BuildRequest, Orchestrator};
use lipkbh::sandbox::TokioLauncher;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Limba build helper: run a project's build recipe, optionally in a chroot
#[derive(Parser, Debug)]
#[command(name = "lipkbh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use the selected chroot
    #[arg(short = 'c', long, global = true, value_name = "NAME", env = "LIPKBH_CHROOT")]
    chroot: Option<String>,

    /// Explicitly do not use a chroot
    #[arg(long, global = true)]
    no_chroot: bool,

    /// Generate a POSIX sh script without BUILDROOT and cleanup phase
    #[arg(long, global = true)]
    legacy: bool,

    /// Kill the build after this many seconds (0 = no limit)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Show extra debugging information
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the software following its build recipe
    #[command(visible_alias = "b")]
    Build {
        /// Source directory containing the recipe
        #[arg(value_name = "DIRECTORY", default_value = ".")]
        path: PathBuf,
    },

    /// Print the generated build script without running it
    Script {
        /// Source directory containing the recipe
        #[arg(value_name = "DIRECTORY", default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            std::process::exit(code);
        }
    };

    observability::init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            err.downcast_ref::<BuildError>()
                .map(exit_code)
                .unwrap_or(EXIT_INIT)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let Some(command) = cli.command else {
        eprintln!("You need to specify a command!");
        eprintln!("Run 'lipkbh --help' to see a full list of available command line options.");
        return Ok(EXIT_USAGE);
    };

    let config = BuildConfig::from_env().with_cli_overrides(cli.legacy, cli.timeout);
    let orchestrator = Orchestrator::new(config, TokioLauncher);
    let request = |path: PathBuf| BuildRequest {
        path,
        chroot: cli.chroot.clone(),
        use_chroot: !cli.no_chroot,
    };

    match command {
        Commands::Build { path } => build(&orchestrator, &request(path)).await,
        Commands::Script { path } => {
            // nothing is launched, so a missing chroot name is not an error here
            let mut request = request(path);
            request.use_chroot &= request.chroot.is_some();
            print_script(&orchestrator, &request)
        }
    }
}

async fn build(orchestrator: &Orchestrator<TokioLauncher>, request: &BuildRequest) -> anyhow::Result<i32> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let timeout = orchestrator.config().timeout;
    tokio::spawn(async move {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => tracing::warn!("Interrupted"),
            _ = expire(timeout) => tracing::warn!("Build timed out"),
        }
        let _ = cancel_tx.send(true);
    });

    let stdout = std::io::stdout();
    let outcome = orchestrator
        .run(
            request,
            |line| {
                let _ = writeln!(stdout.lock(), "{}", line);
            },
            cancel_rx,
        )
        .await;

    match outcome {
        Ok(outcome) => Ok(outcome.exit_code()),
        // the script's own output already explains the failure
        Err(BuildError::ExecutionError { code }) => {
            eprintln!("{}", format!("Build failed with exit status {}", code).red());
            Ok(code)
        }
        Err(e) => Err(e).context("Build failed"),
    }
}

fn print_script(orchestrator: &Orchestrator<TokioLauncher>, request: &BuildRequest) -> anyhow::Result<i32> {
    let plan = orchestrator.plan(request)?;
    match plan.script {
        Some(script) => print!("{}", script.render()),
        None => eprintln!("Recipe has no build commands, nothing to do."),
    }
    Ok(0)
}

async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

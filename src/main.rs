use clap::Parser;
use parport_manager::config::{get_default_config_path, Config, ConfigLoader};
use parport_manager::manager::PortManager;
use parport_manager::port::PpdevBackend;
use parport_manager::stdio::{self, OutputMode, StopReason};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use tracing::{debug, error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "parport",
    version,
    about = "Claim, write, read and release Linux parallel ports.",
    long_about = "Drives up to three ppdev parallel ports. With COMMANDs, runs them in order and exits \
                  (e.g. `parport open \"write 200\" read close`). Without, reads one command per line \
                  from stdin. Any port still open when the program ends is released."
)]
struct Args {
    /// Configuration file (defaults to the standard search path).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level or filter directive.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print responses as JSON objects.
    #[arg(long)]
    json: bool,

    /// Commands to run instead of the interactive loop.
    #[arg(value_name = "COMMAND")]
    commands: Vec<String>,
}

fn load_config(args: &Args) -> (Config, Option<PathBuf>) {
    let loaded = match &args.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let (mut config, path) = match loaded {
        Ok(loader) => {
            let path = loader.config_path.clone();
            (loader.into_config(), path)
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            (ConfigLoader::with_defaults().into_config(), None)
        }
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    (config, path)
}

// --- Main Application Entry Point ---
fn main() -> ExitCode {
    let args = Args::parse();
    let (config, config_path) = load_config(&args);
    parport_manager::logging::init(&config.logging);
    match config_path {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => debug!(default_path = ?get_default_config_path(), "no config file found, using defaults"),
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let addresses = config.ports.addresses;
    let commands = args.commands;
    let code = runtime.block_on(async move {
        // Dropping the manager at the end of this block releases every claim it holds.
        let mut manager = match PortManager::new(Box::new(PpdevBackend::new()), addresses) {
            Ok(manager) => manager,
            Err(e) => {
                error!(error = %e, "invalid port addresses");
                return ExitCode::FAILURE;
            }
        };

        let code = if commands.is_empty() {
            run_interactive(&mut manager, mode).await
        } else {
            run_batch(&mut manager, &commands, mode)
        };

        if manager.open_count() > 0 {
            info!(open = manager.open_count(), "releasing parallel ports before exit");
        }
        code
    });

    // A pending stdin read lives on a blocking thread that cannot be cancelled.
    runtime.shutdown_background();
    code
}

/// Run each command in order, stopping at the first failure.
fn run_batch(manager: &mut PortManager, commands: &[String], mode: OutputMode) -> ExitCode {
    for line in commands {
        let reply = stdio::handle_line(manager, line, mode);
        match (&reply.rendered, reply.failed) {
            (Some(text), true) => eprintln!("{text}"),
            (Some(text), false) => println!("{text}"),
            (None, _) => {}
        }
        if reply.failed {
            return ExitCode::FAILURE;
        }
        if reply.exit {
            break;
        }
    }
    ExitCode::SUCCESS
}

async fn run_interactive(manager: &mut PortManager, mode: OutputMode) -> ExitCode {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    match stdio::run_stdio_interface(manager, input, output, mode, shutdown_signal()).await {
        Ok(StopReason::Signal) => ExitCode::from(130),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "stdio interface failed");
            ExitCode::FAILURE
        }
    }
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

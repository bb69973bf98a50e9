use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cropmark::{
    AppState, Config, create_router,
    crop::LogoPosition,
    overlays::{AssetStore, NewOverlayConfig, OverlayConfig, OverlayConfigUpdate},
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Overrides `app.log_level` from the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage overlay configurations
    #[command(subcommand)]
    Overlay(OverlayCommands),
}

#[derive(Subcommand, Debug)]
enum OverlayCommands {
    /// List all overlay configurations
    List,
    /// Add a new overlay configuration
    Add {
        /// Fraction of the cropped image the logo covers (0 < x <= 0.25)
        #[arg(short, long)]
        scale_down: Option<f64>,
        /// top-left, top-right, bottom-left, bottom-right or center
        #[arg(short, long)]
        position: Option<String>,
        /// Logo image file
        #[arg(long)]
        logo: Option<PathBuf>,
    },
    /// Update an existing overlay configuration
    Update {
        id: u64,
        #[arg(short, long)]
        scale_down: Option<f64>,
        #[arg(short, long)]
        position: Option<String>,
        #[arg(long)]
        logo: Option<PathBuf>,
    },
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    // Set up logging first
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.app.log_level.clone())
        .to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !cli.config.exists() {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    // Handle commands
    match cli.command {
        Some(Commands::Overlay(overlay_cmd)) => handle_overlay_command(config, overlay_cmd).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, &cli.config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, &cli.config, None, None, None).await
        }
    }
}

fn print_config(config: &OverlayConfig) {
    println!(
        "  #{} scale_down={} position={} logo={}",
        config.id,
        config.scale_down,
        config.logo_position,
        config.logo_image.as_deref().unwrap_or("(none)")
    );
}

async fn store_logo_file(
    assets: &dyn AssetStore,
    path: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let format = image::guess_format(&bytes)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    Ok(assets.store(&bytes, extension).await?)
}

async fn handle_overlay_command(
    config: Config,
    cmd: OverlayCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(config).await?;

    match cmd {
        OverlayCommands::List => {
            let configs = state.config_store.list_all().await?;
            if configs.is_empty() {
                println!("No overlay configurations");
            } else {
                println!("Overlay configurations:");
                for config in &configs {
                    print_config(config);
                }
            }
        }
        OverlayCommands::Add {
            scale_down,
            position,
            logo,
        } => {
            let mut fields = NewOverlayConfig::default();
            if let Some(scale_down) = scale_down {
                fields.scale_down = scale_down;
            }
            if let Some(position) = position {
                fields.logo_position = LogoPosition::parse(&position);
            }
            cropmark::overlays::check_scale(fields.scale_down)?;
            if let Some(path) = logo {
                fields.logo_image = Some(store_logo_file(state.asset_store.as_ref(), &path).await?);
            }

            let config = state.config_store.create(fields).await?;
            println!("Added overlay configuration:");
            print_config(&config);
        }
        OverlayCommands::Update {
            id,
            scale_down,
            position,
            logo,
        } => {
            let existing = state.config_store.get(id).await?;
            cropmark::overlays::check_scale(scale_down.unwrap_or(existing.scale_down))?;

            let logo_image = match logo {
                Some(path) => Some(store_logo_file(state.asset_store.as_ref(), &path).await?),
                None => None,
            };
            let update = OverlayConfigUpdate {
                scale_down,
                logo_position: position.as_deref().map(LogoPosition::parse),
                logo_image,
            };

            let config = state.config_store.update(id, update).await?;
            println!("Updated overlay configuration:");
            print_config(&config);
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    config_path: &Path,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Logo directory: {:?}", config.storage.logo_directory);

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            let critical_error = errors.iter().any(|e| e.is_critical());

            if critical_error {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_router(AppState::from_config(config).await?);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}

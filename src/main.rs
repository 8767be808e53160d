use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vector_console::app::AppState;
use vector_console::auth::hash_password;
use vector_console::config::{load_settings_from_path, DEFAULT_CONFIG_PATH};
use vector_console::routes;

#[derive(Parser)]
#[command(name = "vector-console", version, about = "Admin console for a hosted vector store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web console (default).
    Serve {
        /// Path to the TOML config file.
        #[arg(long, env = "ADMIN_CONSOLE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Print a password hash for ADMIN_PASSWORD_HASH.
    HashPassword {
        /// Password to hash; read from stdin when omitted.
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::HashPassword { password }) => print_hash(password),
        Some(Command::Serve { config }) => serve(config).await,
        None => serve(PathBuf::from(DEFAULT_CONFIG_PATH)).await,
    }
}

fn print_hash(password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    println!("{}", hash_password(&password));
    Ok(())
}

async fn serve(config_path: PathBuf) -> anyhow::Result<()> {
    info!("Starting vector-console...");

    // Load configuration.
    let settings = load_settings_from_path(&config_path)?;
    info!(
        "Configuration loaded: environment={}, host={}, port={}, provider={}",
        settings.environment, settings.host, settings.port, settings.vector_store_provider
    );

    // Build application state.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let state = Arc::new(AppState::from_settings(settings)?);

    // Build router.
    let app = routes::build_router(state).layer(TraceLayer::new_for_http());

    // Start server.
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

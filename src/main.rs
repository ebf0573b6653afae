use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use truckhub_api::auth::hash_password;
use truckhub_api::config::config;
use truckhub_api::database::models::user::{NewUser, Role};
use truckhub_api::database::{users, DatabaseManager};

#[derive(Parser)]
#[command(name = "truckhub-api")]
#[command(about = "TruckHub marketplace API server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create an admin user")]
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG, DATABASE_URL and overrides are visible.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Migrate => migrate().await,
        Command::CreateAdmin { name, email, password } => create_admin(name, email, password).await,
    };

    DatabaseManager::close().await;
    result
}

async fn serve(port: Option<u16>) -> Result<()> {
    let config = config();
    info!("Starting TruckHub API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set in {:?} mode", config.environment);
    }
    if truckhub_api::is_production!() && config.query.debug_logging {
        warn!("QUERY_DEBUG_LOGGING is enabled in production; SQL parameters will be logged");
    }

    let bind_addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("TruckHub API listening on http://{}", bind_addr);
    axum::serve(listener, truckhub_api::app())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn migrate() -> Result<()> {
    DatabaseManager::migrate().await.context("migration failed")?;
    Ok(())
}

async fn create_admin(name: String, email: String, password: String) -> Result<()> {
    let new_user = NewUser {
        name: Some(name),
        email: Some(email),
        password: Some(password),
        role: Some(Role::Admin.as_str().to_string()),
        phone: None,
        location: None,
    };
    if let Err(errors) = new_user.validate() {
        bail!("invalid admin details: {:?}", errors.fields());
    }

    let email = new_user.email.as_deref().unwrap_or_default();
    let pool = DatabaseManager::pool().await?;
    if users::email_taken(&pool, email, None).await? {
        bail!("a user with email {} already exists", email);
    }

    let password_hash = hash_password(new_user.password.as_deref().unwrap_or_default())?;
    let user = users::insert(
        &pool,
        users::UserInsert {
            name: new_user.name.as_deref().unwrap_or_default(),
            email,
            role: Role::Admin,
            phone: None,
            location: None,
            password_hash: &password_hash,
        },
    )
    .await?;

    info!("Created admin {} <{}>", user.id, user.email);
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{actions::promote_user, config::Config, routes, state::State, store};

#[derive(Parser)]
#[command(name = "foodgram", about = "Recipe sharing backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Grant the admin role to a registered user
    Promote {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let pool = store::connect(&config.database_url)
        .await
        .context("Failed to open database")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, config).await,
        Command::Promote { email } => {
            promote_user(&email, &pool)
                .await
                .with_context(|| format!("Failed to promote {email}"))?;
            Ok(())
        }
    }
}

async fn serve(pool: sqlx::Pool<sqlx::Sqlite>, config: Config) -> anyhow::Result<()> {
    let address = config.bind_address;

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("Failed to create {}", config.media_root.display()))?;

    let state = State::new(pool, config).context("Failed to build server state")?;

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
            }
        })
        .with_context(|| format!("Failed to bind {address}"))?;

    log::info!("Listening on {bound}");
    server.await;
    log::info!("Server shut down");

    Ok(())
}

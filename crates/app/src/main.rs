use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use engine::Engine;
use migration::{Migrator, MigratorTrait};
use settings::{Settings, Storage, StorageMode};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "budget_tracker")]
#[command(about = "Budget tracking REST API")]
struct Cli {
    /// Settings file, extension optional (also read from `BUDGET_SETTINGS`).
    #[arg(long, env = "BUDGET_SETTINGS", default_value = "settings")]
    settings: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Insert the default categories if missing, then exit.
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli.settings)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budget_tracker={level},server={level},engine={level},migration={level},tower_http={level}",
            level = settings.app.level
        ))
        .init();

    let engine = build_engine(&settings.storage).await?;
    tracing::info!("storage mode: {}", engine.storage().as_str());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            let created = engine.seed_default_categories().await?;
            tracing::info!("seeded {created} default categories");
        }
        Command::Serve => {
            if settings.storage.seed_defaults {
                let created = engine.seed_default_categories().await?;
                if created > 0 {
                    tracing::info!("seeded {created} default categories");
                }
            }
            let addr: SocketAddr =
                format!("{}:{}", settings.server.bind, settings.server.port).parse()?;
            server::run(engine, settings.server.config(), addr).await;
        }
    }

    Ok(())
}

async fn build_engine(
    storage: &Storage,
) -> Result<Engine, Box<dyn std::error::Error + Send + Sync>> {
    let builder = Engine::builder();
    let builder = match storage.mode {
        StorageMode::Database => {
            let db = sea_orm::Database::connect(&storage.database_url).await?;
            Migrator::up(&db, None).await?;
            builder.database(db)
        }
        StorageMode::Json => builder.json_dir(&storage.json_dir),
    };
    Ok(builder.build().await?)
}

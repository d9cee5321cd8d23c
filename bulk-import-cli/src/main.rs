mod report;

use anyhow::Result;
use bulk_import::database::connection::{establish_connection, get_database_url};
use bulk_import::database::migrations::Migrator;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Show the trackers, batches and failures of one entity
    Report {
        #[clap(short, long)]
        entity: i32,
        #[clap(short, long, default_value = "bulk_import.db")]
        database: String,
        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Migrate {
        #[clap(short, long, default_value = "bulk_import.db")]
        database: String,
    },
    /// Roll back every migration, then apply them again
    Reset {
        #[clap(short, long, default_value = "bulk_import.db")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Migrate { database } => {
                let db = establish_connection(&get_database_url(Some(&database))).await?;
                info!("Running migrations up on {}", database);
                Migrator::up(&db, None).await?;
                info!("Database migration completed");
            }
            DbCommands::Reset { database } => {
                let db = establish_connection(&get_database_url(Some(&database))).await?;
                info!("Resetting database {}", database);
                Migrator::down(&db, None).await?;
                Migrator::up(&db, None).await?;
                info!("Database reset completed");
            }
        },
        Commands::Report {
            entity,
            database,
            json,
        } => {
            let db = establish_connection(&get_database_url(Some(&database))).await?;
            let report = report::EntityReport::load(db, entity).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}

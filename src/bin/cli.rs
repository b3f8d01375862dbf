use std::collections::HashSet;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::{Row, SqlitePool};

use task_tracker::db::{self, MIGRATOR};
use task_tracker::models::role::Role;
use task_tracker::services::users::{self, NewAccount};

#[derive(Parser, Debug)]
#[command(author, version, about = "task-tracker admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create an account directly, e.g. the first owner
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "owner")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The binary may run from a different CWD (e.g. in a container), so fall
    // back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            // `db::init` runs the embedded migrations on connect.
            db::init().await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            print_status(&pool).await?;
        }
        Commands::CreateUser {
            email,
            password,
            first_name,
            last_name,
            role,
        } => {
            let pool = db::init().await?;
            let user = users::create_account(
                &pool,
                NewAccount {
                    email: &email,
                    first_name: &first_name,
                    last_name: &last_name,
                    password: &password,
                    role,
                },
            )
            .await
            .context("failed to create user")?;
            println!("Created {} account {} ({})", user.role, user.email, user.id);
        }
    }

    Ok(())
}

/// Connects without migrating so pending migrations show up as such.
async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePool::connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let has_table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?
        .is_some();

    let applied_versions: HashSet<i64> = if has_table {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter()
            .filter_map(|row| row.try_get::<i64, _>("version").ok())
            .collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in MIGRATOR.iter() {
        let status = if applied_versions.contains(&migration.version) {
            "applied"
        } else {
            "pending"
        };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

//! hedgedoc-admin: account and token management from the command line.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hedgedoc_api::{logging, AppConfig, AppState, Repositories};
use hedgedoc_db::{Database, FilesystemBackend, PoolConfig};

#[derive(Parser)]
#[command(name = "hedgedoc-admin")]
#[command(author, version, about = "Administration tool for the hedgedoc backend")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user, optionally with a local password
    CreateUser {
        /// Login name
        username: String,

        /// Display name (defaults to the username)
        #[arg(short, long)]
        display_name: Option<String>,

        /// Password for a local identity
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Issue an API token and print it once
    CreateToken {
        /// Owner of the token
        username: String,

        /// Label shown in token listings
        label: String,

        /// Validity in days (capped at two years)
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Delete a user with all their notes, uploads and history
    DeleteUser {
        username: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _guard = logging::init_tracing("hedgedoc_api=warn", "hedgedoc-admin.log");
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let db = Database::connect_with_config(&config.database_url, PoolConfig::new().max_connections(2))
        .await?;
    db.migrate().await?;
    let backend = Arc::new(FilesystemBackend::new(
        config.media_upload_path.clone(),
        config.base_url.clone(),
    ));
    let state = AppState::new(config, Repositories::from_database(&db), backend);

    match cli.command {
        Commands::CreateUser {
            username,
            display_name,
            password,
        } => {
            let user = state
                .users
                .create_user(&username, display_name.as_deref().unwrap_or(""), None)
                .await?;
            if let Some(password) = password {
                state.users.add_local_identity(&user, &password).await?;
            }
            println!("Created user '{}' ({})", user.username, user.id);
        }
        Commands::CreateToken {
            username,
            label,
            days,
        } => {
            let user = state.users.get_by_username(&username).await?;
            let issued = state.auth.issue_token(&user, &label, days).await?;
            println!("{}", issued.secret);
            eprintln!(
                "Token '{}' valid until {}. It will not be shown again.",
                issued.token.label, issued.token.valid_until
            );
        }
        Commands::DeleteUser { username } => {
            let user = state.users.get_by_username(&username).await?;
            state.users.delete_user(&user).await?;
            println!("Deleted user '{}'", user.username);
        }
    }
    Ok(())
}

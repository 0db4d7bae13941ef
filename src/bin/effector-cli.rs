//! Effector CLI - run the sample programs from the command line
//!
//! Each subcommand builds a program, wires the sample interpreters, and prints
//! what the execution delivered.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use effector::engine::{Executor, ExecutorConfig};
use effector::sample::algebras::FilePath;
use effector::sample::programs::{self, ChangeEmailRequest, Token};
use effector::sample::{HttpStubs, MemoryDatabase, TracingStub};
use serde_json::json;

#[derive(Parser)]
#[command(name = "effector")]
#[command(about = "Run programs against swappable interpreters", long_about = None)]
struct Cli {
    /// Executor configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve one change-email request
    ChangeEmail {
        /// User whose address changes
        #[arg(long)]
        user_id: String,

        /// User the token was issued to (default: the same user)
        #[arg(long)]
        token_user_id: Option<String>,

        /// Present a token whose signature does not check out
        #[arg(long)]
        invalid: bool,

        /// New email address
        #[arg(long)]
        email: String,

        /// Make the database write fail with this message
        #[arg(long)]
        db_failure: Option<String>,
    },

    /// Save a file through the log-and-HTTP interpreters
    SaveFile {
        /// Directory to save into
        #[arg(long, default_value = "some/path")]
        dir: String,

        /// File name
        #[arg(long, default_value = "someFile")]
        name: String,

        /// File contents
        #[arg(long, default_value = "file contents")]
        contents: String,

        /// Make the POST fail
        #[arg(long)]
        fail: bool,
    },

    /// Write the default configuration
    Config {
        /// Destination file
        #[arg(long)]
        write: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ExecutorConfig::load(path)?,
        None => ExecutorConfig::default(),
    };

    match cli.command {
        Commands::ChangeEmail {
            user_id,
            token_user_id,
            invalid,
            email,
            db_failure,
        } => {
            let db = match db_failure {
                Some(message) => MemoryDatabase::failing(&message),
                None => MemoryDatabase::new(),
            };
            let responder = TracingStub::new("response.send");
            let registry = programs::app_registry(db.clone(), responder)?;
            let executor = Executor::with_config(registry, config);

            let request = ChangeEmailRequest {
                token: Token {
                    is_valid: !invalid,
                    user_id: token_user_id.unwrap_or_else(|| user_id.clone()),
                },
                user_id,
                email_address: email,
            };
            let response = programs::serve(&executor, &request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if let Some(row) = db.row("users", &request.user_id) {
                println!("users/{} = {}", request.user_id, row);
            }
        }

        Commands::SaveFile {
            dir,
            name,
            contents,
            fail,
        } => {
            let logger = TracingStub::new("logger.log");
            let mut http = HttpStubs::new();
            if fail {
                http.post = http.post.with_result(json!({"error": "POST failed"}));
            }
            let registry = programs::file_registry(logger, http)?;
            let executor = Executor::with_config(registry, config);

            let result = programs::run_save_file(&executor, FilePath::new(dir, name), &contents)
                .await?;
            if let Some(error) = result.get("error") {
                println!("saveFile returned an error: {}", error);
            }
            println!("test complete");
        }

        Commands::Config { write } => {
            config
                .save(&write)
                .with_context(|| format!("Failed to write config to {:?}", write))?;
            println!("Wrote configuration to {:?}", write);
        }
    }

    Ok(())
}

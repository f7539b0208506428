use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riskflow::api::{self, ResumeRequest, StartRequest};
use riskflow::checkpoint::CheckpointStore;
use riskflow::config::Config;
use riskflow::db::{Database, SqliteCheckpointStore};
use riskflow::engine::WorkflowEngine;
use riskflow::llm::{FallbackGenerator, OllamaGenerator, TextGenerator};

#[derive(Parser)]
#[command(name = "riskflow")]
#[command(about = "Contract risk-analysis workflow engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ollama server URL
    #[arg(long, env = "RISKFLOW_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model to use
    #[arg(long, env = "RISKFLOW_MODEL")]
    model: Option<String>,

    /// Database path
    #[arg(long, env = "RISKFLOW_DB")]
    db: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a risk analysis for a contract/project description
    Start {
        /// The contract or project description to analyze
        message: String,
        /// User email the conversation is recorded under
        #[arg(long, short, default_value = "local@riskflow")]
        user: String,
        /// Reuse an existing thread id instead of generating one
        #[arg(long)]
        thread: Option<String>,
    },
    /// Resume a suspended analysis with human feedback
    Resume {
        /// Thread id of the suspended analysis
        thread: String,
        /// Corrections or clarifications for the analyzer
        feedback: String,
    },
    /// Delete the stored checkpoint for a thread (administrative)
    Delete {
        /// Thread id whose checkpoint should be removed
        thread: String,
    },
    /// List conversations recorded for a user
    Conversations {
        /// User email
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to warnings only; RUST_LOG overrides
            tracing_subscriber::EnvFilter::new("riskflow=warn")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.ollama_url {
        config.llm.url = url;
    }
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    let db = match &config.db_path {
        Some(path) => Database::open_at(path.clone())?,
        None => Database::open()?,
    };
    let checkpoints = Arc::new(SqliteCheckpointStore::new(db.clone()));

    match cli.command {
        Commands::Start { message, user, thread } => {
            let engine = build_engine(&config, checkpoints, db.clone());
            let user_id = db.get_or_create_user(&user)?;
            let response = api::start_analysis(
                &engine,
                StartRequest {
                    thread_id: thread,
                    user_id,
                    message,
                },
            )
            .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Resume { thread, feedback } => {
            let engine = build_engine(&config, checkpoints, db);
            let response = api::resume_analysis(
                &engine,
                ResumeRequest {
                    thread_id: thread,
                    feedback,
                },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Delete { thread } => {
            checkpoints.delete(&thread)?;
            println!("Checkpoint deleted for thread {}", thread);
        }

        Commands::Conversations { user } => {
            let user_id = db.get_or_create_user(&user)?;
            let conversations = db.list_conversations_for_user(&user_id)?;
            println!("{}", serde_json::to_string_pretty(&conversations)?);
        }
    }

    Ok(())
}

fn build_engine(
    config: &Config,
    checkpoints: Arc<SqliteCheckpointStore>,
    db: Database,
) -> WorkflowEngine {
    let primary: Arc<dyn TextGenerator> =
        Arc::new(OllamaGenerator::new(&config.llm.url, &config.llm.model));

    let mut chain = FallbackGenerator::new(primary, config.llm.timeout());
    if let Some(fallback_model) = &config.llm.fallback_model {
        chain = chain.with_fallback(Arc::new(OllamaGenerator::new(
            &config.llm.url,
            fallback_model,
        )));
    }

    WorkflowEngine::new(Arc::new(chain), checkpoints).with_conversations(db)
}

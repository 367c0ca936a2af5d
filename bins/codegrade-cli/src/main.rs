mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codegrade-cli")]
#[command(about = "Codegrade CLI - Manage languages and coding questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config/languages.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// List configured languages and their judge ids
    ListLangs {
        /// Path to languages.json
        #[arg(short, long, default_value = "config/languages.json")]
        config: String,
    },

    /// Check a question document without publishing it
    ValidateQuestion {
        #[arg(short, long)]
        file: String,
    },

    /// Print the program the judge would receive for a snippet
    Assemble {
        /// Question document
        #[arg(short, long)]
        file: String,

        /// python, cpp or java
        #[arg(short, long)]
        language: String,

        /// File holding the candidate snippet
        #[arg(short, long)]
        code: String,
    },

    /// Validate a question and store it in Redis
    PublishQuestion {
        #[arg(short, long)]
        file: String,

        #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
        redis_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
        Commands::ListLangs { config } => {
            commands::list_languages(&config)?;
        }
        Commands::ValidateQuestion { file } => {
            commands::validate_question(&file)?;
        }
        Commands::Assemble {
            file,
            language,
            code,
        } => {
            commands::assemble_source(&file, &language, &code)?;
        }
        Commands::PublishQuestion { file, redis_url } => {
            commands::publish_question(&file, &redis_url).await?;
        }
    }

    Ok(())
}

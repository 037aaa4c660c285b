use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{error, info};

mod app;
mod config;
mod credentials;
mod error;
mod gemini;
mod handler;
mod logging;
mod model;
mod service;
mod tui;
mod ui;
mod views;

#[cfg(test)]
mod testing;

use app::App;
use config::Config;
use credentials::CredentialStore;
use gemini::{GeminiClient, DEFAULT_BASE_URL};
use service::GenerationClient;
use views::dashboard::{self, AnalysisOutcome};

#[derive(Parser)]
#[command(name = "ufohub")]
#[command(about = "UFO/UAP research hub: news, AI research chat and social post planning")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini model to use (overrides the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest UFO/UAP news
    News,
    /// Generate social media post ideas for a topic
    Ideas {
        /// Topic to write about
        topic: String,
    },
    /// Analyze a text document
    Analyze {
        /// Path to a .txt or .md file
        path: PathBuf,
    },
    /// Save the Gemini API key to the config file
    SetKey {
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let log_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    logging::init(&log_dir.join(logging::LOG_FILE))?;

    let config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to read config {}", config_path.display()))?;
    let model = cli
        .model
        .unwrap_or_else(|| config.model_or_default().to_string());

    let credentials = Arc::new(CredentialStore::load(config_path.clone())?);
    let transport = Arc::new(GeminiClient::new(DEFAULT_BASE_URL)?);
    let client = Arc::new(GenerationClient::new(transport, credentials.clone(), &model));

    info!(config = %config_path.display(), model = %model, "starting");

    match cli.command {
        None => run_tui(credentials, client).await,
        Some(Commands::News) => print_news(&client).await,
        Some(Commands::Ideas { topic }) => {
            println!("{}", client.generate_social_post_ideas(&topic).await);
            Ok(())
        }
        Some(Commands::Analyze { path }) => print_analysis(&client, &path).await,
        Some(Commands::SetKey { key }) => {
            credentials.save(&key)?;
            if credentials.is_set() {
                println!("{} API key saved to {}", "✓".green(), config_path.display());
            } else {
                println!("{} Saved, but that looks like the placeholder key.", "!".yellow());
            }
            Ok(())
        }
    }
}

async fn run_tui(credentials: Arc<CredentialStore>, client: Arc<GenerationClient>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new();
    let mut app = App::new(credentials, client, events.sender());

    let result = async {
        loop {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event)?;

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    if let Err(e) = &result {
        error!(error = %e, "ui loop failed");
    }
    result
}

async fn print_news(client: &GenerationClient) -> Result<()> {
    let articles = client.fetch_recent_news().await;
    if articles.is_empty() {
        println!("{}", dashboard::NEWS_UNAVAILABLE.yellow());
        return Ok(());
    }

    println!("\n{}", "🛸 Latest UFO/UAP News".bold().cyan());
    for (i, article) in articles.iter().enumerate() {
        println!("\n{}. {}", i + 1, article.title.bold());
        println!("   {}", article.summary);
        println!("   {}", article.uri.blue().underline());
    }
    Ok(())
}

async fn print_analysis(client: &GenerationClient, path: &std::path::Path) -> Result<()> {
    if !dashboard::has_text_extension(path) {
        anyhow::bail!("Choose a text file (.txt, .md or .text): {}", path.display());
    }

    match dashboard::run_analysis(client, path).await {
        AnalysisOutcome::ReadFailed(message) => anyhow::bail!("{}: {}", message, path.display()),
        AnalysisOutcome::Analyzed { name, description } => {
            println!("\n{}", format!("📄 {}", name).bold().cyan());
            println!("{}", description);
            Ok(())
        }
    }
}

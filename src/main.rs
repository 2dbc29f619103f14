// src/main.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use crate::ai::connector::InvoiceAnalyzer;
use crate::ai::gemini::{GeminiClient, GeminiConfig};
use crate::invoice::attachment::InvoiceImage;

mod ai;
mod gui;
mod invoice;

#[derive(Parser)]
#[command(name = "invoicelens")]
#[command(about = "Ask questions about invoice images with Google Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a one-shot question about an invoice image
    Ask {
        /// Path to the invoice image (JPEG or PNG)
        #[arg(long, short = 'i')]
        image: PathBuf,

        /// Question to ask about the invoice
        #[arg(long, short = 'p', default_value = "Tell me about the invoice")]
        prompt: String,

        /// Gemini model id (e.g. "gemini-1.5-flash")
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// Gemini API base URL (default: https://generativelanguage.googleapis.com/v1beta)
        #[arg(long)]
        api_url: Option<String>,
    },
    /// List models available to the configured API key
    ListModels {
        /// Gemini API base URL (default: https://generativelanguage.googleapis.com/v1beta)
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Check that the Gemini API is reachable with the configured key
    CheckApi {
        /// Gemini API base URL (default: https://generativelanguage.googleapis.com/v1beta)
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Run graphical user interface
    Gui,
}

fn main() -> Result<()> {
    // Honor a local .env before anything reads the environment
    dotenv::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            image,
            prompt,
            model,
            api_url,
        } => run_ask(image, prompt, model, api_url),
        Commands::ListModels { api_url } => list_models(api_url),
        Commands::CheckApi { api_url } => check_api(api_url),
        Commands::Gui => gui::run_gui(),
    }
}

fn build_config(model: Option<String>, api_url: Option<String>) -> Result<GeminiConfig> {
    let mut config = GeminiConfig::from_env()?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(api_url) = api_url {
        config = config.with_api_url(api_url);
    }
    Ok(config)
}

fn run_ask(
    image: PathBuf,
    prompt: String,
    model: Option<String>,
    api_url: Option<String>,
) -> Result<()> {
    info!("Starting headless ask mode");

    let invoice = InvoiceImage::from_path(&image)?;
    let config = build_config(model, api_url)?;
    let model_name = config.model.clone();
    let client = GeminiClient::new(config)?;

    info!("Asking {} about {}", model_name, image.display());

    match client.answer_question(Some(&invoice), &prompt) {
        Ok(answer) => {
            println!("\n=== Gemini ({}) ===", model_name);
            println!("{}", answer);
            println!("===========================\n");
            Ok(())
        }
        Err(e) => {
            error!("Request failed: {}", e);
            if let Some(hint) = e.hint() {
                println!("\n{}", hint);
            }
            Err(e.into())
        }
    }
}

fn list_models(api_url: Option<String>) -> Result<()> {
    let config = build_config(None, api_url)?;
    info!("Listing Gemini models at {}...", config.api_url);

    let client = GeminiClient::new(config)?;
    match client.list_models() {
        Ok(models) => {
            println!("\nAvailable models:");
            for model in &models {
                let name = model.name.strip_prefix("models/").unwrap_or(&model.name);
                match &model.display_name {
                    Some(display_name) => println!("  - {} ({})", name, display_name),
                    None => println!("  - {}", name),
                }
            }
            if models.is_empty() {
                println!("  No models found");
            }
            println!();

            println!("Suggested models for invoice images:");
            println!("  - gemini-1.5-flash (fast, the default)");
            println!("  - gemini-1.5-pro (slower, more thorough)");
            Ok(())
        }
        Err(e) => {
            error!("Failed to list models: {}", e);
            if let Some(hint) = e.hint() {
                println!("\n{}", hint);
            }
            Err(e.into())
        }
    }
}

fn check_api(api_url: Option<String>) -> Result<()> {
    let config = build_config(None, api_url)?;
    let api_url = config.api_url.clone();
    info!("Checking Gemini API at {}...", api_url);

    let client = GeminiClient::new(config)?;
    match client.list_models() {
        Ok(models) => {
            println!("✓ Gemini API is reachable at {}", api_url);
            println!("✓ {} model(s) available to this key", models.len());
            Ok(())
        }
        Err(e) => {
            println!("✗ Could not reach the Gemini API at {}", api_url);
            println!("  Error: {}", e);
            println!("\nTroubleshooting:");
            println!("  1. Create an API key at https://aistudio.google.com/apikey");
            println!("  2. Export it as GOOGLE_API_KEY (or put it in a .env file)");
            println!("  3. Pass --api-url if your traffic goes through a proxy");
            Err(e.into())
        }
    }
}

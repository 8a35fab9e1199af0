use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use extractor::batch::{expand_home, BatchError, BatchRunner};
use extractor::config::Config;
use extractor::documents::FileTextExtractor;
use extractor::extraction::{DocumentExtractor, SectionPrompter};
use extractor::llm_client::OllamaClient;
use extractor::template::Template;

#[derive(Parser)]
#[command(name = "extractor", about = "Extract structured résumé records with a local model")]
struct Cli {
    /// Résumé file or folder to process (prompted for when omitted)
    path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting résumé extractor v{}", env!("CARGO_PKG_VERSION"));

    let template = Template::load_or_bundled(config.template_path.as_deref())
        .context("Cannot load résumé template")?;

    let llm = OllamaClient::new(&config.ollama_url, &config.model)?;
    info!("LLM client initialized (model: {})", llm.model());

    let prompter = SectionPrompter::new(Arc::new(llm), config.max_prompt_chars)
        .with_deadline(config.llm_timeout_secs.map(Duration::from_secs));
    let extractor = DocumentExtractor::new(
        Arc::new(template),
        Arc::new(prompter),
        Arc::new(FileTextExtractor),
        config.section_concurrency,
    );
    let runner = BatchRunner::new(
        Arc::new(extractor),
        config.output_dir.clone(),
        config.document_concurrency,
    );

    let output_dir = runner.prepare_output_dir().await?;
    info!("Writing artifacts to {}", output_dir.display());

    let path = match cli.path {
        Some(path) => path,
        None => prompt_for_path()?,
    };
    let path = expand_home(&path);

    match runner.process_path(&path).await {
        Ok(report) => info!(
            written = report.written.len(),
            unreadable = report.unreadable,
            failed = report.failed,
            "Done"
        ),
        Err(BatchError::PathNotFound(_)) => println!("❌ Path not found"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn prompt_for_path() -> Result<PathBuf> {
    print!("File or folder: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

//! Tarjoman CLI - translate web pages and documents from the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tarjoman_core::document::GlossaryEntry;
use tarjoman_core::error::TarjomanError;
use tarjoman_pipeline::{run_file, run_url, OutFormat, RunOptions, RunOutcome, Settings};

#[derive(Parser)]
#[command(
    name = "tarjoman",
    about = "Translate web pages, DOCX, PDF and text documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a web page, extract the readable article and translate it
    Url {
        /// Page address (http or https)
        url: String,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Translate a local file (html, docx, pdf, txt, md)
    File {
        /// Input file path
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Output format: terminal, html, docx, pdf
    #[arg(short, long, default_value = "terminal")]
    out: String,

    /// Directory to create the job directory in (default: current dir)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Translation model override
    #[arg(short, long)]
    model: Option<String>,

    /// Path to a JSON glossary file ([{"source": ..., "target": ...}, ...])
    #[arg(short, long)]
    glossary: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let result = match cli.command {
        Commands::Url { ref url, ref common } => run(common, |settings, options| {
            run_url(url, settings, options)
        }),
        Commands::File { ref input, ref common } => run(common, |settings, options| {
            run_file(input, settings, options)
        }),
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = match e.downcast_ref::<TarjomanError>() {
                Some(TarjomanError::InvalidRequest(_)) => 2,
                _ => 1,
            };
            std::process::exit(code);
        }
    }
}

fn run<F>(common: &CommonArgs, go: F) -> Result<()>
where
    F: FnOnce(&Settings, &RunOptions) -> tarjoman_core::error::Result<RunOutcome>,
{
    let settings = Settings::from_env();
    let options = RunOptions {
        out: OutFormat::parse(&common.out),
        dest: common.dest.clone(),
        model: common.model.clone(),
        glossary: load_glossary(common.glossary.as_deref())?,
        ..RunOptions::default()
    };

    let outcome = go(&settings, &options)?;
    if let Some(text) = outcome.text {
        print!("{text}");
    }
    if let Some(manifest) = outcome.manifest {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    }
    Ok(())
}

fn load_glossary(path: Option<&std::path::Path>) -> Result<Vec<GlossaryEntry>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading glossary {}", path.display()))?;
    let entries: Vec<GlossaryEntry> = serde_json::from_str(&content)
        .with_context(|| format!("parsing glossary {}", path.display()))?;
    Ok(entries)
}

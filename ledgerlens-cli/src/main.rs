use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use ledgerlens_core::{ConversionError, ExtractionMethod, PipelineConfig};
use ledgerlens_ingest::{CancelSignal, Extractor, cancel_pair};
use ledgerlens_parse::{Converter, normalize};

mod config;
mod export;
mod logging;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERLENS_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "ledgerlens", version = VERSION, about = "Bank statement PDF to transactions")]
struct Cli {
    /// Config file (default: ~/.ledgerlens/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a statement PDF to CSV (stdout unless --csv is given)
    Convert {
        input: PathBuf,

        /// Write CSV here instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the full conversion report (or failure report) as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the normalized text the parser would see
    Normalize {
        input: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default configuration
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Never fall back to OCR
    #[arg(long)]
    no_ocr: bool,

    /// Concurrent page workers
    #[arg(long)]
    workers: Option<usize>,

    /// OCR rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,
}

impl Overrides {
    fn apply(&self, cfg: &mut PipelineConfig) {
        if self.no_ocr {
            cfg.extraction.ocr_enabled = false;
        }
        if let Some(workers) = self.workers {
            cfg.extraction.max_workers = workers;
        }
        if let Some(dpi) = self.dpi {
            cfg.extraction.dpi = dpi;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Command::Convert {
            input,
            csv,
            json,
            overrides,
        } => {
            let cfg = effective_config(cli.config.as_deref(), &overrides)?;
            convert(&input, csv.as_deref(), json.as_deref(), cfg).await?;
        }

        Command::Normalize { input, overrides } => {
            let cfg = effective_config(cli.config.as_deref(), &overrides)?;
            print_normalized(&input, cfg).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init { force } => {
                let p = config::init_config(cli.config.as_deref(), force)?;
                println!("Wrote {}", p.display());
            }
            ConfigCommand::Show => {
                let cfg = config::load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn effective_config(path: Option<&Path>, overrides: &Overrides) -> Result<PipelineConfig> {
    let mut cfg = config::load_config(path)?;
    overrides.apply(&mut cfg);
    cfg.validate().context("invalid command-line override")?;
    Ok(cfg)
}

/// Cancel the signal on Ctrl-C.
fn cancel_on_interrupt() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling conversion");
            handle.cancel();
        }
    });
    signal
}

async fn read_input(input: &Path) -> Result<Vec<u8>> {
    if !input.exists() {
        bail!("input not found: {}", input.display());
    }
    tokio::fs::read(input)
        .await
        .with_context(|| format!("read {}", input.display()))
}

async fn convert(input: &Path, csv: Option<&Path>, json: Option<&Path>, cfg: PipelineConfig) -> Result<()> {
    let bytes = read_input(input).await?;
    let cancel = cancel_on_interrupt();
    let converter = Converter::new(cfg);

    let conversion = match converter.convert(&bytes, &cancel).await {
        Ok(c) => c,
        Err(err) => {
            if let Some(p) = json {
                export::write_failure_json(p, &err)?;
                eprintln!("Failure report written to {}", p.display());
            }
            return Err(err).with_context(|| format!("converting {}", input.display()));
        }
    };

    let result = &conversion.result;
    match csv {
        Some(p) => export::write_csv_file(p, &result.transactions)?,
        None => {
            let stdout = std::io::stdout();
            export::write_csv(stdout.lock(), &result.transactions)?;
        }
    }
    if let Some(p) = json {
        export::write_conversion_json(p, &conversion)?;
    }

    let ocr_pages = conversion.pages.iter().filter(|p| p.method == ExtractionMethod::Ocr).count();
    let failed_pages = conversion.pages.iter().filter(|p| p.method == ExtractionMethod::Failed).count();
    eprintln!(
        "{}: {} transactions via {} strategy ({} pages, {} OCR, {} failed)",
        input.display(),
        result.transactions.len(),
        result.strategy_used,
        conversion.pages.len(),
        ocr_pages,
        failed_pages
    );
    if !result.reconciliation_warnings.is_empty() {
        eprintln!("{} balance reconciliation warnings", result.reconciliation_warnings.len());
    }
    if result.low_confidence {
        eprintln!("Low confidence: no strategy reconciled cleanly; review the output");
    }
    Ok(())
}

async fn print_normalized(input: &Path, cfg: PipelineConfig) -> Result<()> {
    let bytes = read_input(input).await?;
    let limit = cfg.extraction.max_document_bytes;
    if bytes.len() > limit {
        return Err(ConversionError::DocumentTooLarge {
            size: bytes.len(),
            limit,
        }
        .into());
    }

    let cancel = cancel_on_interrupt();
    let extractor = Extractor::for_pdf(&bytes, cfg.extraction)?;
    let extraction = extractor
        .extract(&cancel)
        .await
        .with_context(|| format!("extracting {}", input.display()))?;

    let text = normalize(&extraction.document);
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", text.as_str().trim_end())?;
    Ok(())
}

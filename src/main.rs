//! ledgerpdf CLI - render an invoice or purchase order model to PDF

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use ledgerpdf::{
    CompanyProfile, CurrencyFormat, DocumentModel, DocumentRenderer, LogoStatus, OutputMode,
    RenderError, RenderOptions, RenderOutput,
};

#[derive(Parser)]
#[command(name = "ledgerpdf")]
#[command(version)]
#[command(about = "Render invoice and purchase-order models to paginated PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document model (JSON) to PDF
    Render {
        /// Document model JSON file
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Output directory for the persisted PDF
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Currency code printed before amounts
        #[arg(long, default_value = "OMR")]
        currency: String,

        /// Decimal places for amounts (0-6)
        #[arg(long, default_value_t = 3)]
        decimals: u32,

        /// Logo source: file path, http(s) URL or data URI
        #[arg(long)]
        logo: Option<String>,

        /// Issuer profile JSON file (name, address_lines, contact, tax_id)
        #[arg(long, value_name = "FILE")]
        company: Option<PathBuf>,

        /// Notice box line (repeatable)
        #[arg(long = "notice", value_name = "TEXT")]
        notice: Vec<String>,

        /// Treat the document as not subject to VAT
        #[arg(long)]
        no_vat: bool,

        /// Keep the PDF in memory and print the preview handle instead of writing a file
        #[arg(long)]
        preview: bool,

        /// Logo fetch timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        asset_timeout_ms: u64,

        /// Write a JSON-lines layout trace to FILE
        #[arg(long, value_name = "FILE")]
        debug_log: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), RenderError> {
    let Commands::Render {
        model,
        out,
        currency,
        decimals,
        logo,
        company,
        notice,
        no_vat,
        preview,
        asset_timeout_ms,
        debug_log,
    } = command;

    let raw = std::fs::read_to_string(&model)?;
    let model = DocumentModel::from_json(&raw)?;
    let company = match company {
        Some(path) => serde_json::from_str::<CompanyProfile>(&std::fs::read_to_string(path)?)?,
        None => CompanyProfile::default(),
    };

    let mut builder = DocumentRenderer::builder()
        .company(company)
        .notice_lines(notice)
        .asset_timeout(Duration::from_millis(asset_timeout_ms));
    if let Some(path) = debug_log {
        builder = builder.debug_log(path);
    }
    let renderer = builder.build()?;

    let options = RenderOptions {
        currency: CurrencyFormat {
            code: currency,
            decimals,
        },
        vat_applicable: no_vat.then_some(false),
        logo,
        output: if preview {
            OutputMode::Preview
        } else {
            OutputMode::Persist { dir: out }
        },
    };
    let rendered = renderer.render(&model, &options)?;

    if let LogoStatus::Placeholder(reason) = &rendered.logo {
        if options.logo.is_some() {
            eprintln!("warning: logo unavailable ({reason}), placeholder drawn");
        }
    }
    match rendered.output {
        RenderOutput::Persisted { path, bytes } => {
            println!(
                "{} ({} pages, {} bytes)",
                path.display(),
                rendered.metrics.page_count(),
                bytes
            );
        }
        RenderOutput::Preview(handle) => {
            println!(
                "{} ({} pages, {} bytes)",
                handle.url,
                rendered.metrics.page_count(),
                handle.bytes
            );
        }
    }
    Ok(())
}

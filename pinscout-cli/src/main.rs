//! PinScout CLI - datasheet pinout detection and pin layout from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pinscout::core::CandidateSummary;
use pinscout::layout::{LayoutAssignment, PinLayoutEngine, Side};
use pinscout::{
    AIRouter, Collaborators, Document, PackageFamily, PinData, PinScoutCore, PipelineOptions,
    PipelineReport,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "pinscout")]
#[command(about = "Datasheet pinout detection and pin layout tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline options file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every page of a decoded datasheet
    Detect {
        /// Decoded document (JSON)
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Do not verify review pages with an AI provider
        #[arg(long)]
        no_ai: bool,
    },

    /// Print the stitched pinout content of a decoded datasheet
    Bundle {
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        #[arg(long)]
        no_ai: bool,
    },

    /// Run the full pipeline: detect, stitch, extract pins and lay them out
    Extract {
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Part number used to pick a package variant
        #[arg(long)]
        part_number: Option<String>,

        /// Force a layout override
        #[arg(long = "override", value_name = "KEY")]
        override_key: Option<String>,

        /// Extra directory of override JSON files (repeatable)
        #[arg(long, value_name = "DIR")]
        override_dir: Vec<PathBuf>,

        /// Offline mode: no verification and no extraction
        #[arg(long)]
        no_ai: bool,
    },

    /// Lay out an extracted pin list
    Layout {
        /// Pin data (JSON)
        #[arg(value_name = "PINS")]
        pins: PathBuf,

        #[arg(long = "override", value_name = "KEY")]
        override_key: Option<String>,

        /// Replace the package family of the pin data
        #[arg(long)]
        family: Option<PackageFamily>,

        #[arg(long, value_name = "DIR")]
        override_dir: Vec<PathBuf>,
    },

    /// List known layout overrides
    Overrides {
        /// Show aliases and descriptions
        #[arg(short = 'a', long = "all")]
        details: bool,

        #[arg(long, value_name = "DIR")]
        override_dir: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut options = match &cli.config {
        Some(path) => PipelineOptions::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineOptions::default(),
    };
    let format = cli.format;

    match cli.command {
        Commands::Detect { document, no_ai } => {
            options.offline_mode |= no_ai;
            handle_detect(&document, &options, format).await
        }
        Commands::Bundle { document, no_ai } => {
            options.offline_mode |= no_ai;
            handle_bundle(&document, &options, format).await
        }
        Commands::Extract {
            document,
            part_number,
            override_key,
            override_dir,
            no_ai,
        } => {
            options.offline_mode |= no_ai;
            if part_number.is_some() {
                options.part_number = part_number;
            }
            if override_key.is_some() {
                options.override_key = override_key;
            }
            options.override_dirs.extend(override_dir);
            handle_extract(&document, &options, format).await
        }
        Commands::Layout {
            pins,
            override_key,
            family,
            override_dir,
        } => {
            options.override_dirs.extend(override_dir);
            let key = override_key.or_else(|| options.override_key.clone());
            handle_layout(&pins, key.as_deref(), family, &options, format)
        }
        Commands::Overrides {
            details,
            override_dir,
        } => {
            options.override_dirs.extend(override_dir);
            handle_overrides(&options, details, format)
        }
    }
}

fn build_router(options: &PipelineOptions) -> Option<AIRouter> {
    if options.offline_mode {
        return None;
    }
    let api_key = std::env::var("ANTHROPIC_API_KEY").ok();
    Some(AIRouter::from_settings(&options.provider, api_key))
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    Document::load(path).with_context(|| format!("failed to load document {}", path.display()))
}

/// Detection plus review resolution, shared by `detect` and `bundle`.
async fn detect_pages(
    document: &Document,
    options: &PipelineOptions,
) -> Vec<pinscout::PageCandidate> {
    let router = build_router(options);
    let verifier = router
        .as_ref()
        .map(|r| r as &dyn pinscout::PageVerifier);

    let mut candidates = PinScoutCore::detect(document);
    for warning in PinScoutCore::resolve_reviews(&mut candidates, document, verifier, options).await
    {
        eprintln!("warning: {}", warning);
    }
    candidates
}

async fn handle_detect(
    path: &Path,
    options: &PipelineOptions,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let document = load_document(path)?;
    let candidates = detect_pages(&document, options).await;
    let pages: Vec<CandidateSummary> = candidates.iter().map(CandidateSummary::from).collect();

    match format {
        OutputFormat::Human => {
            print_header(&document, path);
            print_pages(&pages);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "source": document.source,
                "page_count": document.page_count(),
                "pages": pages,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(0)
}

async fn handle_bundle(
    path: &Path,
    options: &PipelineOptions,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let document = load_document(path)?;
    let candidates = detect_pages(&document, options).await;
    let bundle = PinScoutCore::stitch(&candidates, &document, options);

    match format {
        OutputFormat::Human => {
            if bundle.is_empty() {
                println!("No pinout pages found");
            } else {
                println!("{}", bundle.render());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bundle)?),
    }

    Ok(if bundle.is_empty() { 1 } else { 0 })
}

async fn handle_extract(
    path: &Path,
    options: &PipelineOptions,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let document = load_document(path)?;
    let router = build_router(options);
    let collaborators = match &router {
        Some(router) => Collaborators::from_provider(router),
        None => Collaborators::none(),
    };

    let report = PinScoutCore::run(&document, options, collaborators).await?;

    match format {
        OutputFormat::Human => output_report(&report, &document, path),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    let failed = report.extraction_error.is_some() || report.layout_error.is_some();
    Ok(if failed { 1 } else { 0 })
}

fn handle_layout(
    path: &Path,
    override_key: Option<&str>,
    family: Option<PackageFamily>,
    options: &PipelineOptions,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let mut data = PinData::load(path)
        .with_context(|| format!("failed to load pin data {}", path.display()))?;
    if let Some(family) = family {
        data.package.family = family;
    }

    let engine = PinLayoutEngine::with_overrides(PinScoutCore::build_override_table(options)?);
    let layout = match PinScoutCore::layout(&engine, &data, override_key) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(1);
        }
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} ({}, {} pins)",
                data.component_name, data.package.family, data.package.pin_count
            );
            println!("{}", "─".repeat(60));
            print_layout(&layout, &data);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "component_name": data.component_name,
                "package": data.package,
                "layout": layout,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(0)
}

fn handle_overrides(
    options: &PipelineOptions,
    details: bool,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let table = PinScoutCore::build_override_table(options)?;

    match format {
        OutputFormat::Human => {
            println!("Known layout overrides:\n");
            for ov in table.iter() {
                println!("  {}", ov.key);
                println!("    {} pins", ov.pin_count());
                if details {
                    if !ov.aliases.is_empty() {
                        println!("    Aliases: {}", ov.aliases.join(", "));
                    }
                    if !ov.description.is_empty() {
                        println!("    {}", ov.description);
                    }
                }
                println!();
            }
        }
        OutputFormat::Json => {
            let overrides: Vec<_> = table.iter().collect();
            println!("{}", serde_json::to_string_pretty(&overrides)?);
        }
    }
    Ok(0)
}

fn print_header(document: &Document, path: &Path) {
    let name = document
        .source
        .clone()
        .unwrap_or_else(|| path.display().to_string());
    println!("\nDocument: {} ({} pages)", name, document.page_count());
    println!("{}", "─".repeat(60));
}

fn print_pages(pages: &[CandidateSummary]) {
    println!("  {:>4}  {:>5}  {:<8}  {:<8}  Signals", "Page", "Score", "Class", "Decision");
    for page in pages {
        let signals = page
            .signals
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:>4}  {:>5}  {:<8}  {:<8}  {}",
            page.page_index + 1,
            page.score,
            format!("{:?}", page.classification).to_lowercase(),
            format!("{:?}", page.decision).to_lowercase(),
            signals
        );
        if let Some(error) = &page.error {
            println!("        {}", error);
        }
    }
}

fn print_layout(layout: &LayoutAssignment, data: &PinData) {
    println!("  Source: {:?}", layout.source());
    for side in Side::TRAVERSAL {
        let pins = layout.pins_on(side);
        if pins.is_empty() {
            continue;
        }
        let names = pins
            .iter()
            .map(|n| match data.pin(*n) {
                Some(pin) => format!("{}:{}", n, pin.name),
                None => n.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {:<6}  {}", side, names);
    }
    for warning in layout.warnings() {
        println!("  warning: {}", warning);
    }
}

fn output_report(report: &PipelineReport, document: &Document, path: &Path) {
    print_header(document, path);
    print_pages(&report.pages);

    println!("\n  Pinout pages: {:?}", report.bundle.page_indices().iter().map(|i| i + 1).collect::<Vec<_>>());

    if let Some(data) = &report.pin_data {
        println!(
            "\n  {} ({}, {} pins)",
            data.component_name, data.package.family, data.package.pin_count
        );
        if let Some(layout) = &report.layout {
            print_layout(layout, data);
        }
    }

    if let Some(error) = &report.extraction_error {
        println!("\n  Extraction failed: {}", error);
    }
    if let Some(error) = &report.layout_error {
        println!("\n  Layout failed: {}", error);
    }
    if !report.warnings.is_empty() {
        println!("\n  Warnings:");
        for warning in &report.warnings {
            println!("    - {}", warning);
        }
    }
}

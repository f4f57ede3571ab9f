//! Simple pipeline example: find the pinout pages of a decoded datasheet and
//! print the content bundle. Runs offline unless ANTHROPIC_API_KEY is set.

use pinscout::prelude::*;
use pinscout::AIRouter;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), PinScoutError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/documents/ne555.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_pipeline [path/to/document.json]");
        std::process::exit(1);
    }

    let document = Document::load(path)?;
    let api_key = std::env::var("ANTHROPIC_API_KEY").ok();
    let options = PipelineOptions {
        offline_mode: api_key.is_none(),
        ..PipelineOptions::default()
    };
    let router = AIRouter::from_settings(&options.provider, api_key);

    let report = PinScoutCore::run(&document, &options, Collaborators::from_provider(&router)).await?;

    println!("Pages scored for: {}", path.display());
    for page in &report.pages {
        println!(
            "  page {:>3}  score {:>2}  {:?} -> {:?}",
            page.page_index + 1,
            page.score,
            page.classification,
            page.decision
        );
    }
    println!();
    println!("{}", report.bundle.render());

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }

    if let Some(layout) = &report.layout {
        println!("\nLayout ({} pins):", layout.len());
        for side in Side::TRAVERSAL {
            println!("  {:<6} {:?}", side, layout.pins_on(side));
        }
    }

    if report.bundle.is_empty() {
        println!("\nNo pinout pages found.");
        std::process::exit(1);
    }
    Ok(())
}

//! Example: laying out pins with a user override table (without PinScoutCore).
//! Run with: cargo run --example custom_override [path/to/pins.json] [override-dir]

use pinscout::layout::{OverrideTable, PinLayoutEngine, Side};
use pinscout::load_pin_data;
use std::path::Path;

fn main() -> Result<(), pinscout::PinScoutError> {
    let pins_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/pins/esp32_wroom.json".to_string());
    let override_dir = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "tests/fixtures/overrides".to_string());

    let pins_path = Path::new(&pins_path);
    if !pins_path.exists() {
        eprintln!("File not found: {}", pins_path.display());
        eprintln!("Usage: cargo run --example custom_override [path/to/pins.json] [override-dir]");
        std::process::exit(1);
    }

    let mut table = OverrideTable::builtin();
    let loaded = table.load_from_directory(Path::new(&override_dir))?;
    println!("{} user override(s) loaded, {} total", loaded, table.len());

    let data = load_pin_data(pins_path)?;
    let mut package = data.package.clone();
    if table.contains(&data.component_name) {
        package.override_key = Some(data.component_name.clone());
    }

    let engine = PinLayoutEngine::with_overrides(table);
    let layout = engine.layout(&data.pins, &package)?;

    println!("{} laid out from {:?}", data.component_name, layout.source());
    for side in Side::TRAVERSAL {
        let names: Vec<String> = layout
            .pins_on(side)
            .into_iter()
            .map(|n| match data.pin(n) {
                Some(pin) => format!("{}:{}", n, pin.name),
                None => n.to_string(),
            })
            .collect();
        println!("  {:<6} {}", side, names.join(" "));
    }
    for warning in layout.warnings() {
        println!("warning: {}", warning);
    }
    Ok(())
}

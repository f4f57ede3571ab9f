use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

use crate::ai::AIError;
use crate::content::ContentBundle;
use crate::detection::review::PageSummary;
use crate::pins::{PackageFamily, PackageSpec, Pin, PinData};

pub fn build_verification_prompt(summary: &PageSummary) -> String {
    let headers = if summary.table_headers.is_empty() {
        "None".to_string()
    } else {
        summary
            .table_headers
            .iter()
            .map(|row| format!("- {}", row.join(" | ")))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are verifying if a page from an electronic component datasheet contains pinout/pin configuration information.

Page {} content:
{}

Table headers on this page:
{}

Does this page contain pinout information such as:
- Pin numbers and their names
- Pin descriptions or functions
- Package configuration diagrams
- Mechanical/pin drawing specifications

Answer with either "YES" or "NO" only, followed by a brief one-sentence explanation."#,
        summary.page_index + 1,
        summary.text,
        headers
    )
}

/// YES/NO answer to a verification prompt, taken from the first word of the
/// reply. Anything else is an invalid response rather than a guess.
pub fn parse_verification_response(response: &str) -> Result<bool, AIError> {
    let answer = response
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| !word.is_empty())
        .unwrap_or_default()
        .to_ascii_uppercase();

    if answer == "YES" {
        Ok(true)
    } else if answer == "NO" {
        Ok(false)
    } else {
        let preview: String = response.chars().take(80).collect();
        Err(AIError::InvalidResponse(format!(
            "expected YES or NO, got '{}'",
            preview
        )))
    }
}

pub fn build_extraction_prompt(bundle: &ContentBundle, part_number: Option<&str>) -> String {
    let mut tasks = String::from(
        "EXTRACTION TASKS:\n\
         1. Identify the component name (full part number or family).\n\
         2. Extract the package type and pin count.\n\
         3. Map every physical pin to its name and function.\n\
         4. Note the extraction method (Table, Diagram, or Mixed).\n",
    );

    if let Some(part) = part_number {
        tasks.push_str(&format!(
            "\nThis datasheet may cover several package variants. Match the part number '{}' \
             to its package variant and extract pins ONLY for that variant. Check ordering \
             codes and package option tables for the suffix mapping.\n",
            part
        ));
    }

    format!(
        r#"You are a technical data compiler extracting structured pin data from an electronic component datasheet.

RULES:
1. Prefer pinout or package diagrams for pin numbering; use tables to fill in names and functions.
2. Extract ALL physical pins with their correct numbers. Never assume pin 1 is the first signal mentioned.
3. Pin 1 is the top-left corner. DIP numbering runs down the left side and back up the right side; SOIC, TQFP, LQFP and QFN number counter-clockwise.
4. The pin count must match the package name (a PDIP-40 has exactly 40 pins).
5. If the pinout spans several pages, combine everything.
6. Classify each pin's function: power, ground, input, output, analog, or another short category.

{}
Respond ONLY with valid JSON in this exact format (no markdown, no code blocks, just pure JSON):
{{
  "component_name": "NE555",
  "package": {{"type": "PDIP-8", "pin_count": 8}},
  "pins": [
    {{"number": 1, "name": "GND", "function": "ground"}},
    {{"number": 2, "name": "TRIG", "function": "input"}}
  ],
  "extraction_method": "Table"
}}

--- DATASHEET CONTENT START ---
{}
--- DATASHEET CONTENT END ---"#,
        tasks,
        bundle.render()
    )
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    component_name: Option<String>,
    #[serde(default)]
    package: RawPackage,
    #[serde(default)]
    pins: Vec<RawPin>,
    #[serde(default)]
    extraction_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPackage {
    #[serde(default, rename = "type")]
    package_type: Option<String>,
    #[serde(default)]
    pin_count: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawPin {
    number: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    function: Option<String>,
}

fn digits_regex() -> Option<&'static Regex> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

/// Pin numbers arrive as integers or as strings like "12" or "Pin 12".
fn number_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => digits_regex()
            .and_then(|re| re.find(s))
            .and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

/// Parse the extractor's JSON answer into [`PinData`].
pub fn parse_extraction_response(response: &str) -> Result<PinData, AIError> {
    let json_text = extract_json_from_text(response);
    let raw: RawExtraction = serde_json::from_str(&json_text)
        .map_err(|e| AIError::ParseError(format!("Failed to parse AI response: {}", e)))?;

    let mut pins = Vec::with_capacity(raw.pins.len());
    for raw_pin in raw.pins {
        let number = number_from_value(&raw_pin.number).ok_or_else(|| {
            AIError::InvalidResponse(format!("unusable pin number {}", raw_pin.number))
        })?;
        pins.push(Pin {
            number,
            name: raw_pin.name.unwrap_or_default(),
            function: raw_pin.function.unwrap_or_default(),
        });
    }

    let package_type = raw.package.package_type.unwrap_or_default();
    let pin_count = raw
        .package
        .pin_count
        .as_ref()
        .and_then(number_from_value)
        .unwrap_or(pins.len() as u32);

    Ok(PinData {
        component_name: raw
            .component_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        package: PackageSpec::new(PackageFamily::detect(&package_type), pin_count),
        pins,
        extraction_method: raw.extraction_method,
    })
}

/// Pull the JSON object out of a model answer that may wrap it in a code
/// fence or prose.
pub fn extract_json_from_text(text: &str) -> String {
    let text = text.trim();

    // Check if wrapped in markdown code block
    if let Some(start) = text.find("```json") {
        if let Some(end) = text.rfind("```") {
            if end > start + 7 {
                return text[start + 7..end].trim().to_string();
            }
        }
    }

    // Check if wrapped in regular code block
    if let Some(start) = text.find("```") {
        if let Some(end) = text.rfind("```") {
            if end > start + 3 {
                let content = text[start + 3..end].trim();
                if content.starts_with('{') {
                    return content.to_string();
                }
            }
        }
    }

    // Try to find JSON object boundaries
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return text[start..=end].to_string();
            }
        }
    }

    text.to_string()
}

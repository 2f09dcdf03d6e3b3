use anyhow::{anyhow, Result};

use crate::model::report::{EquipmentUsage, MaterialUsageLine, WorkerAttendance};

#[derive(Debug, PartialEq)]
pub struct ParsedInput {
    pub name: String,
    // key:value arguments in the order given. Keys may repeat.
    pub metadata: Vec<(String, String)>,
}

pub fn parse_args(args: &[String]) -> ParsedInput {
    let mut name_parts = Vec::new();
    let mut metadata = Vec::new();

    for arg in args {
        if let Some((key, value)) = arg.split_once(':') {
            if !key.is_empty() {
                metadata.push((key.to_string(), value.to_string()));
                continue;
            }
        }
        name_parts.push(arg.as_str());
    }

    ParsedInput {
        name: name_parts.join(" "),
        metadata,
    }
}

pub fn expand_key(key: &str, candidates: &[&str]) -> Result<String> {
    if candidates.contains(&key) {
        return Ok(key.to_string());
    }

    let matches: Vec<&str> = candidates
        .iter()
        .filter(|&&c| c.starts_with(key))
        .cloned()
        .collect();

    match matches.len() {
        1 => Ok(matches[0].to_string()),
        0 => Err(anyhow!("Unknown key: '{}'", key)),
        _ => Err(anyhow!("Ambiguous key: '{}' matches {:?}", key, matches)),
    }
}

// NAME=QTY UNIT, the space is optional (砂利=2.5t). The report id is left
// empty for the store to fill in.
pub fn parse_material(input: &str) -> Result<MaterialUsageLine> {
    let (name, amount) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("Material must look like NAME=QTY UNIT: '{}'", input))?;
    if name.is_empty() {
        return Err(anyhow!("Material name is empty: '{}'", input));
    }

    let amount = amount.trim();
    let split = amount
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(amount.len());
    let (qty_str, unit) = amount.split_at(split);
    let quantity: f64 = qty_str
        .parse()
        .map_err(|_| anyhow!("Invalid material quantity: '{}'", qty_str))?;
    let unit = unit.trim();
    if unit.is_empty() {
        return Err(anyhow!("Material unit is missing: '{}'", input));
    }

    Ok(MaterialUsageLine::new("", name, quantity, unit))
}

// NAME or NAME=HOURS.
fn parse_named_hours(input: &str, what: &str) -> Result<(String, Option<f64>)> {
    let (name, hours) = match input.split_once('=') {
        Some((name, hours)) => (name.trim(), Some(hours.trim())),
        None => (input.trim(), None),
    };
    if name.is_empty() {
        return Err(anyhow!("{} name is empty: '{}'", what, input));
    }
    let hours = match hours {
        Some(h) => {
            let value: f64 = h
                .trim_end_matches('h')
                .parse()
                .map_err(|_| anyhow!("Invalid {} hours: '{}'", what.to_lowercase(), h))?;
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("Invalid {} hours: '{}'", what.to_lowercase(), h));
            }
            Some(value)
        }
        None => None,
    };
    Ok((name.to_string(), hours))
}

pub fn parse_equipment(input: &str) -> Result<EquipmentUsage> {
    let (name, hours) = parse_named_hours(input, "Equipment")?;
    Ok(EquipmentUsage::new("", name, hours))
}

pub fn parse_worker(input: &str) -> Result<WorkerAttendance> {
    let (name, hours) = parse_named_hours(input, "Worker")?;
    Ok(WorkerAttendance::new("", name, hours))
}

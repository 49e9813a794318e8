use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use toml_edit::{DocumentMut, Item, Table, Value};

use crate::cli::{ConfigCommand, ConfigSetArgs};
use crate::config;

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set(args) => set_value(&args),
    }
}

fn set_value(args: &ConfigSetArgs) -> Result<()> {
    let path = match &args.file {
        Some(path) => path.clone(),
        None => config::config_path()
            .ok_or_else(|| anyhow!("failed to resolve a config path (no config directory found)"))?,
    };

    ensure_parent(&path)?;

    let mut doc = if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if raw.trim().is_empty() {
            DocumentMut::new()
        } else {
            raw.parse::<DocumentMut>()
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
    } else {
        DocumentMut::new()
    };

    apply_key(&mut doc, &args.key, &args.value)?;

    fs::write(&path, doc.to_string())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Updated {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// `checkout.depth = 5` must stay an integer for the loader to accept it.
fn typed_value(raw: &str) -> Value {
    if let Ok(number) = raw.parse::<i64>() {
        return Value::from(number);
    }
    match raw {
        "true" => Value::from(true),
        "false" => Value::from(false),
        _ => Value::from(raw),
    }
}

fn apply_key(doc: &mut DocumentMut, key: &str, raw: &str) -> Result<()> {
    let segments = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let Some((last, parents)) = segments.split_last() else {
        bail!("config key cannot be empty");
    };

    let mut current = doc.as_table_mut();
    for segment in parents {
        current = current
            .entry(segment)
            .or_insert(Item::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow!("path `{segment}` is not a table in the config"))?;
    }

    current.insert(last, Item::Value(typed_value(raw)));
    Ok(())
}

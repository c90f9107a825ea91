use crate::error::WorkspaceError;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// How command results reach the terminal. Built once from the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub(crate) fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    pub(crate) fn is_json(self) -> bool {
        self == Self::Json
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CommandResult {
    pub(crate) success: bool,
    pub(crate) message: Option<String>,
    pub(crate) data: Map<String, Value>,
}

impl CommandResult {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Map::new(),
        }
    }

    /// A successful result that carries only data.
    pub(crate) fn data() -> Self {
        Self {
            success: true,
            message: None,
            data: Map::new(),
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Map::new(),
        }
    }

    /// Attaches `value` under `key`; values that fail to serialize become `null`.
    pub(crate) fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("success".to_string(), Value::Bool(self.success));
        if let Some(message) = &self.message {
            object.insert("message".to_string(), Value::String(message.clone()));
        }
        for (key, value) in &self.data {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

pub(crate) fn emit(mode: OutputMode, result: &CommandResult) -> Result<()> {
    match mode {
        OutputMode::Json => print_json(&result.to_json()),
        OutputMode::Human => {
            if let Some(message) = &result.message {
                if result.success {
                    success(message);
                } else {
                    failure(message);
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub(crate) fn failure(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// Status line for long-running steps; silent in JSON mode.
pub(crate) fn progress(mode: OutputMode, message: &str) {
    if mode == OutputMode::Human {
        eprintln!("==> {message}");
    }
}

/// Prints rows as aligned columns, or as header-keyed objects in JSON mode.
pub(crate) fn print_table(
    mode: OutputMode,
    headers: &[&str],
    rows: &[Vec<String>],
    title: Option<&str>,
) -> Result<()> {
    if mode.is_json() {
        let objects: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (header, cell) in headers.iter().zip(row) {
                    object.insert((*header).to_string(), Value::String(cell.clone()));
                }
                Value::Object(object)
            })
            .collect();
        return print_json(&objects);
    }

    if let Some(title) = title {
        println!("{}", title.bold());
    }
    print!("{}", format_table(headers, rows));
    Ok(())
}

pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate().take(widths.len()) {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let separators: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut out = render(headers.to_vec());
    out.push_str(&render(separators.iter().map(String::as_str).collect()));
    for row in rows {
        out.push_str(&render(row.iter().map(String::as_str).collect()));
    }
    out
}

/// Renders a top-level failure for the chosen mode.
pub(crate) fn render_error(mode: OutputMode, err: &anyhow::Error) {
    let domain = err.downcast_ref::<WorkspaceError>();
    let kind = domain.map(WorkspaceError::kind).unwrap_or("error");
    let message = match domain {
        Some(domain) => domain.to_string(),
        None => format!("{err:#}"),
    };

    match mode {
        OutputMode::Json => {
            let body = json!({
                "success": false,
                "error": kind,
                "message": message,
            });
            match serde_json::to_string_pretty(&body) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{body}"),
            }
        }
        OutputMode::Human => {
            failure(&message);
            if let Some(hint) = domain.and_then(WorkspaceError::hint) {
                eprintln!("  {}", hint.dimmed());
            }
        }
    }
}

//! Discovery and shape-validation of definition files
//!
//! Every call walks the directory tree and parses each file afresh, so a
//! second load reflects whatever is on disk now and never merges with an
//! earlier result.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::command::{CommandDefinition, CommandInfo, CommandOptions, HandlerTable};
use crate::config::accepts_extension;
use crate::validation::{Validation, ValidatorTable};
use crate::{CommandKitError, Result};

/// Why a definition file was skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("could not be parsed: {0}")]
    Unparseable(String),

    #[error("does not export \"data\"")]
    MissingData,

    #[error("does not export \"data.name\"")]
    MissingName,

    #[error("does not export \"run\"")]
    MissingRun,

    #[error("exports \"run\" as {0}, which is not a registered handler")]
    RunNotInvocable(String),

    #[error("exports \"autocomplete\" as {0}, which is not a registered handler")]
    AutocompleteNotInvocable(String),

    #[error("has an invalid \"options\" table: {0}")]
    InvalidOptions(String),

    #[error("does not export a registered validation function ({0})")]
    ValidationNotCallable(String),
}

/// A malformed definition file. Recovered locally: the file is skipped.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("Ignoring: {kind} file {} {reason}", .file_path.display())]
#[diagnostic(
    code(cmdkit::loader::malformed_definition),
    help("Fix the file and reload; the remaining files were loaded normally")
)]
pub struct Rejection {
    pub kind: &'static str,
    pub file_path: PathBuf,
    #[source]
    pub reason: RejectionReason,
}

/// Result of one load pass
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub loaded: Vec<T>,
    pub rejected: Vec<Rejection>,
}

impl<T> Default for LoadOutcome<T> {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// List files under `root` with an allowed extension, sorted by path
pub async fn discover_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let walk_root = root.to_path_buf();
    let extensions = extensions.to_vec();

    let files = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&walk_root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && accepts_extension(&extensions, entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| CommandKitError::io(root, std::io::Error::other(e)))?
    .map_err(|e| CommandKitError::io(root, e))?;

    debug!("Discovered {} definition files under {}", files.len(), root.display());
    Ok(files)
}

/// Category of a file: the directory directly below `root` holding it.
///
/// Files directly under the root, or nested more than one level, have none.
pub fn category_for(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    match parts.as_slice() {
        [category, _file] => Some(category.clone()),
        _ => None,
    }
}

/// Read and parse a definition file, choosing the parser by extension
async fn read_document(path: &Path) -> std::result::Result<Value, RejectionReason> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RejectionReason::Unparseable(e.to_string()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| RejectionReason::Unparseable(e.to_string()))
    } else {
        toml::from_str(&content).map_err(|e| RejectionReason::Unparseable(e.to_string()))
    }
}

/// The definition source: the `default` table if there is one, else the whole document
fn definition_source(document: Value) -> Value {
    match document {
        Value::Object(mut map) => match map.remove("default") {
            Some(Value::Object(default)) => Value::Object(default),
            Some(other) => {
                map.insert("default".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "a table".to_string(),
    }
}

/// Validate one parsed command document against the handler table
pub fn parse_command(
    document: Value,
    file_path: &Path,
    category: Option<String>,
    handlers: &HandlerTable,
) -> std::result::Result<CommandDefinition, RejectionReason> {
    let source = definition_source(document);

    let data = match source.get("data") {
        Some(data @ Value::Object(_)) => data.clone(),
        _ => return Err(RejectionReason::MissingData),
    };

    let name = match data.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => return Err(RejectionReason::MissingName),
    };

    let run = match source.get("run") {
        None | Some(Value::Null) => return Err(RejectionReason::MissingRun),
        Some(Value::String(key)) => handlers
            .get(key)
            .cloned()
            .ok_or_else(|| RejectionReason::RunNotInvocable(format!("\"{}\"", key)))?,
        Some(other) => return Err(RejectionReason::RunNotInvocable(describe(other))),
    };

    let autocomplete = match source.get("autocomplete") {
        None | Some(Value::Null) => None,
        Some(Value::String(key)) => Some(handlers.get(key).cloned().ok_or_else(|| {
            RejectionReason::AutocompleteNotInvocable(format!("\"{}\"", key))
        })?),
        Some(other) => return Err(RejectionReason::AutocompleteNotInvocable(describe(other))),
    };

    let options = match source.get("options") {
        None | Some(Value::Null) => CommandOptions::default(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| RejectionReason::InvalidOptions(e.to_string()))?,
    };

    Ok(CommandDefinition {
        info: Arc::new(CommandInfo {
            name,
            data,
            options,
            file_path: file_path.to_path_buf(),
            category,
        }),
        run,
        autocomplete,
    })
}

/// Load every command definition under `root`.
///
/// Malformed files are logged and skipped; only directory enumeration
/// failures are returned as errors.
pub async fn load_commands(
    root: &Path,
    extensions: &[String],
    handlers: &HandlerTable,
) -> Result<LoadOutcome<CommandDefinition>> {
    let mut outcome = LoadOutcome::default();

    for path in discover_files(root, extensions).await? {
        let category = category_for(root, &path);
        let parsed = match read_document(&path).await {
            Ok(document) => parse_command(document, &path, category, handlers),
            Err(reason) => Err(reason),
        };

        match parsed {
            Ok(definition) => {
                debug!(
                    "Loaded command '{}' from {}",
                    definition.name(),
                    path.display()
                );
                outcome.loaded.push(definition);
            }
            Err(reason) => {
                let rejection = Rejection {
                    kind: "Command",
                    file_path: path,
                    reason,
                };
                warn!("{}", rejection);
                outcome.rejected.push(rejection);
            }
        }
    }

    info!(
        "Loaded {} commands from {} ({} ignored)",
        outcome.loaded.len(),
        root.display(),
        outcome.rejected.len()
    );
    Ok(outcome)
}

/// Validate one parsed validation document against the validator table
pub fn parse_validation(
    document: Value,
    validators: &ValidatorTable,
) -> std::result::Result<Arc<dyn Validation>, RejectionReason> {
    match document.get("default") {
        Some(Value::String(key)) => validators
            .get(key)
            .cloned()
            .ok_or_else(|| RejectionReason::ValidationNotCallable(format!("\"{}\"", key))),
        Some(other) => Err(RejectionReason::ValidationNotCallable(describe(other))),
        None => Err(RejectionReason::ValidationNotCallable("nothing".to_string())),
    }
}

/// Load every validation definition under `root`, in path order
pub async fn load_validations(
    root: &Path,
    extensions: &[String],
    validators: &ValidatorTable,
) -> Result<LoadOutcome<Arc<dyn Validation>>> {
    let mut outcome = LoadOutcome::default();

    for path in discover_files(root, extensions).await? {
        let parsed = match read_document(&path).await {
            Ok(document) => parse_validation(document, validators),
            Err(reason) => Err(reason),
        };

        match parsed {
            Ok(validation) => outcome.loaded.push(validation),
            Err(reason) => {
                let rejection = Rejection {
                    kind: "Validation",
                    file_path: path,
                    reason,
                };
                warn!("{}", rejection);
                outcome.rejected.push(rejection);
            }
        }
    }

    info!(
        "Loaded {} validations from {} ({} ignored)",
        outcome.loaded.len(),
        root.display(),
        outcome.rejected.len()
    );
    Ok(outcome)
}

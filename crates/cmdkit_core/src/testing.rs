//! In-memory doubles for exercising the kit without a gateway connection

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::command::{CommandDefinition, CommandHandler, CommandInfo, CommandOptions, handler_fn};
use crate::interaction::{AutocompleteChoice, InteractionResponder};
use crate::service::{CommandService, RemoteCommandRecord};
use crate::BoxError;

/// A mutating call made against [`MemoryCommandService`], by command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Create(String),
    Edit(String),
    Delete(String),
}

/// Remote command registry held in memory
#[derive(Debug, Default)]
pub struct MemoryCommandService {
    records: Mutex<Vec<RemoteCommandRecord>>,
    calls: Mutex<Vec<ServiceCall>>,
    failing: Mutex<HashSet<String>>,
    fail_fetch: AtomicBool,
    next_id: AtomicU64,
}

impl MemoryCommandService {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn record_from(&self, id: String, metadata: &Value) -> RemoteCommandRecord {
        RemoteCommandRecord {
            id,
            name: metadata
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            metadata: metadata.clone(),
        }
    }

    /// Register a command remotely without recording a call
    pub fn seed(&self, metadata: &Value) -> RemoteCommandRecord {
        let record = self.record_from(self.allocate_id(), metadata);
        self.records.lock().push(record.clone());
        record
    }

    /// Mutating calls in the order they were attempted
    pub fn mutations(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.name.clone()).collect()
    }

    pub fn record(&self, name: &str) -> Option<RemoteCommandRecord> {
        self.records.lock().iter().find(|r| r.name == name).cloned()
    }

    /// Make every mutating call for `name` fail
    pub fn fail_on(&self, name: impl Into<String>) {
        self.failing.lock().insert(name.into());
    }

    /// Make `fetch_all` fail
    pub fn fail_fetch(&self) {
        self.fail_fetch.store(true, Ordering::Relaxed);
    }

    fn check(&self, call: ServiceCall, name: &str) -> Result<(), BoxError> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(name) {
            return Err(format!("service rejected '{}'", name).into());
        }
        Ok(())
    }

    fn name_of(&self, id: &str) -> Result<String, BoxError> {
        self.records
            .lock()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
            .ok_or_else(|| format!("unknown command id {}", id).into())
    }
}

#[async_trait]
impl CommandService for MemoryCommandService {
    async fn fetch_all(&self) -> Result<Vec<RemoteCommandRecord>, BoxError> {
        if self.fail_fetch.load(Ordering::Relaxed) {
            return Err("fetch unavailable".into());
        }
        Ok(self.records.lock().clone())
    }

    async fn create(&self, metadata: &Value) -> Result<RemoteCommandRecord, BoxError> {
        let record = self.record_from(self.allocate_id(), metadata);
        self.check(ServiceCall::Create(record.name.clone()), &record.name)?;
        self.records.lock().push(record.clone());
        Ok(record)
    }

    async fn edit(&self, id: &str, metadata: &Value) -> Result<RemoteCommandRecord, BoxError> {
        let name = self.name_of(id)?;
        self.check(ServiceCall::Edit(name.clone()), &name)?;

        let updated = self.record_from(id.to_string(), metadata);
        let mut records = self.records.lock();
        if let Some(existing) = records.iter_mut().find(|r| r.id == id) {
            *existing = updated.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        let name = self.name_of(id)?;
        self.check(ServiceCall::Delete(name.clone()), &name)?;
        self.records.lock().retain(|r| r.id != id);
        Ok(())
    }
}

/// A message sent through [`RecordingResponder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

/// Responder that keeps everything it is asked to send
#[derive(Debug, Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<Reply>>,
    choices: Mutex<Vec<Vec<AutocompleteChoice>>>,
}

impl RecordingResponder {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().clone()
    }

    /// Autocomplete responses, one entry per call
    pub fn choices(&self) -> Vec<Vec<AutocompleteChoice>> {
        self.choices.lock().clone()
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn reply(&self, content: &str, ephemeral: bool) -> Result<(), BoxError> {
        self.replies.lock().push(Reply {
            content: content.to_string(),
            ephemeral,
        });
        Ok(())
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), BoxError> {
        self.choices.lock().push(choices);
        Ok(())
    }
}

/// Counts handler invocations
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    count: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// A handler that bumps this counter and succeeds
    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        let count = self.count.clone();
        handler_fn(move |_ctx| {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }
}

/// Handler-less info for a chat-input command
pub fn command_info(name: &str) -> CommandInfo {
    CommandInfo {
        name: name.to_string(),
        data: json!({ "name": name, "description": "Test command" }),
        options: CommandOptions::default(),
        file_path: PathBuf::from(format!("{}.toml", name)),
        category: None,
    }
}

/// A definition whose handler does nothing
pub fn definition(name: &str) -> CommandDefinition {
    CommandDefinition {
        info: Arc::new(command_info(name)),
        run: handler_fn(|_ctx| async { Ok(()) }),
        autocomplete: None,
    }
}

/// A definition with explicit metadata and adjusted options
pub fn definition_with(
    name: &str,
    data: Value,
    configure: impl FnOnce(&mut CommandOptions),
) -> CommandDefinition {
    let mut info = command_info(name);
    info.data = data;
    configure(&mut info.options);
    CommandDefinition {
        info: Arc::new(info),
        run: handler_fn(|_ctx| async { Ok(()) }),
        autocomplete: None,
    }
}

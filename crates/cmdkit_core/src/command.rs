//! Command definitions and the handlers they bind to

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BoxError, Client, Interaction};

/// Per-command behaviour flags from the `options` table of a definition file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOptions {
    /// Excluded from global registration; restricted to developers
    #[serde(default, alias = "devOnly")]
    pub dev_only: bool,

    /// Permissions the invoking member must hold
    #[serde(default, alias = "userPermissions")]
    pub user_permissions: Vec<String>,

    /// Permissions the application must hold
    #[serde(default, alias = "botPermissions")]
    pub bot_permissions: Vec<String>,

    /// Remove the command from the remote registry instead of registering it
    #[serde(default)]
    pub deleted: bool,

    /// Unrecognized keys, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A loaded command with its handlers stripped.
///
/// This is what validations and [`CommandKit::commands`](crate::CommandKit::commands) see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    /// Metadata sent to the remote service: description, options, permissions
    pub data: Value,
    pub options: CommandOptions,
    pub file_path: PathBuf,
    pub category: Option<String>,
}

/// Arguments passed to a command handler
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub interaction: Arc<Interaction>,
    pub client: Arc<Client>,
}

pub type HandlerResult = Result<(), BoxError>;

/// Code that runs when a command (or its autocomplete) is invoked
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: CommandContext) -> HandlerResult;
}

/// Adapter turning an async closure into a [`CommandHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn call(&self, ctx: CommandContext) -> HandlerResult {
        (self.0)(ctx).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Named handlers that definition files refer to from `run` and `autocomplete`
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.names())
            .finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one under the same key
    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(key)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A validated command definition.
///
/// Immutable once loaded; a reload replaces the whole set.
#[derive(Clone)]
pub struct CommandDefinition {
    pub info: Arc<CommandInfo>,
    pub run: Arc<dyn CommandHandler>,
    pub autocomplete: Option<Arc<dyn CommandHandler>>,
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("info", &self.info)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandDefinition {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn options(&self) -> &CommandOptions {
        &self.info.options
    }
}

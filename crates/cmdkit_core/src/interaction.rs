//! Platform-neutral view of an inbound interaction

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::BoxError;

/// Which kind of interaction arrived from the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Slash command
    ChatInput,
    /// User or message context-menu command
    ContextMenu,
    /// Autocomplete request for a slash command option
    Autocomplete,
    /// Components, modals, pings and anything else
    Other,
}

impl InteractionKind {
    /// Whether the router handles this kind at all
    pub fn is_routable(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChatInput => write!(f, "chat-input"),
            Self::ContextMenu => write!(f, "context-menu"),
            Self::Autocomplete => write!(f, "autocomplete"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: String,
}

impl AutocompleteChoice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Reply capability of an interaction
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Send a message response
    async fn reply(&self, content: &str, ephemeral: bool) -> Result<(), BoxError>;

    /// Answer an autocomplete request
    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), BoxError>;
}

/// Responder that discards everything, for interactions built without one
#[derive(Debug, Default)]
pub struct NoopResponder;

#[async_trait]
impl InteractionResponder for NoopResponder {
    async fn reply(&self, _content: &str, _ephemeral: bool) -> Result<(), BoxError> {
        Ok(())
    }

    async fn autocomplete(&self, _choices: Vec<AutocompleteChoice>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An inbound request naming a command to execute or complete
#[derive(Clone)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub command_name: String,
    pub user_id: String,
    pub guild_id: Option<String>,
    /// Role ids of the invoking member, empty outside guilds
    pub member_roles: Vec<String>,
    /// Permission names held by the invoking member, `None` outside guilds
    pub member_permissions: Option<Vec<String>>,
    /// Permission names held by the application in the channel
    pub app_permissions: Option<Vec<String>>,
    /// Option values as sent by the platform: `[{ "name", "type", "value", "focused"? }]`
    pub options: Value,
    responder: Arc<dyn InteractionResponder>,
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("command_name", &self.command_name)
            .field("user_id", &self.user_id)
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

impl Interaction {
    pub fn new(
        id: impl Into<String>,
        kind: InteractionKind,
        command_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            command_name: command_name.into(),
            user_id: user_id.into(),
            guild_id: None,
            member_roles: Vec::new(),
            member_permissions: None,
            app_permissions: None,
            options: Value::Array(Vec::new()),
            responder: Arc::new(NoopResponder),
        }
    }

    pub fn with_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_member_roles(mut self, roles: Vec<String>) -> Self {
        self.member_roles = roles;
        self
    }

    pub fn with_member_permissions(mut self, permissions: Vec<String>) -> Self {
        self.member_permissions = Some(permissions);
        self
    }

    pub fn with_app_permissions(mut self, permissions: Vec<String>) -> Self {
        self.app_permissions = Some(permissions);
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_responder(mut self, responder: Arc<dyn InteractionResponder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn is_autocomplete(&self) -> bool {
        self.kind == InteractionKind::Autocomplete
    }

    /// Look up a top-level option value by name
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .as_array()?
            .iter()
            .find(|opt| opt.get("name").and_then(Value::as_str) == Some(name))
            .and_then(|opt| opt.get("value"))
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// The option currently being typed in an autocomplete request
    pub fn focused_option(&self) -> Option<(&str, &Value)> {
        fn find(options: &[Value]) -> Option<(&str, &Value)> {
            for opt in options {
                if opt.get("focused").and_then(Value::as_bool) == Some(true) {
                    let name = opt.get("name").and_then(Value::as_str)?;
                    return opt.get("value").map(|v| (name, v));
                }
                if let Some(nested) = opt.get("options").and_then(Value::as_array) {
                    if let Some(found) = find(nested) {
                        return Some(found);
                    }
                }
            }
            None
        }

        find(self.options.as_array()?)
    }

    pub async fn reply(&self, content: &str, ephemeral: bool) -> Result<(), BoxError> {
        self.responder.reply(content, ephemeral).await
    }

    pub async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), BoxError> {
        self.responder.autocomplete(choices).await
    }
}

/// Canonical key for a permission name.
///
/// `Administrator`, `ADMINISTRATOR`, `AddReactions`, `ADD_REACTIONS` and
/// `Add Reactions` all compare equal.
pub fn permission_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Names in `required` that `held` does not grant. Administrator grants everything.
pub fn missing_permissions(required: &[String], held: &[String]) -> Vec<String> {
    let held: Vec<String> = held.iter().map(|p| permission_key(p)).collect();
    if held.iter().any(|p| p == "administrator") {
        return Vec::new();
    }

    required
        .iter()
        .filter(|name| !held.contains(&permission_key(name)))
        .cloned()
        .collect()
}

//! Global application commands over the Discord HTTP API

use std::sync::Arc;

use async_trait::async_trait;
use cmdkit_core::{BoxError, CommandService, RemoteCommandRecord};
use serde_json::Value;
use serenity::http::Http;
use serenity::model::application::Command;
use serenity::model::id::CommandId;

use crate::error::{DiscordError, Result};

/// [`CommandService`] backed by serenity's [`Http`] client.
///
/// The application id must be set on the client before any call; the
/// event handler does this from the ready payload.
#[derive(Clone)]
pub struct SerenityCommandService {
    http: Arc<Http>,
}

impl std::fmt::Debug for SerenityCommandService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityCommandService")
            .field("application_id", &self.http.application_id())
            .finish()
    }
}

impl SerenityCommandService {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }
}

pub(crate) fn parse_command_id(id: &str) -> Result<CommandId> {
    match id.parse::<u64>() {
        Ok(raw) if raw != 0 => Ok(CommandId::new(raw)),
        _ => Err(DiscordError::InvalidCommandId { id: id.to_string() }),
    }
}

fn to_record(command: Command) -> Result<RemoteCommandRecord> {
    let id = command.id.get().to_string();
    let name = command.name.clone();
    let metadata =
        serde_json::to_value(command).map_err(|cause| DiscordError::MalformedPayload { cause })?;
    Ok(RemoteCommandRecord { id, name, metadata })
}

#[async_trait]
impl CommandService for SerenityCommandService {
    async fn fetch_all(&self) -> std::result::Result<Vec<RemoteCommandRecord>, BoxError> {
        let commands = self
            .http
            .get_global_commands()
            .await
            .map_err(|e| DiscordError::api("list global commands", e))?;

        Ok(commands
            .into_iter()
            .map(to_record)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn create(&self, metadata: &Value) -> std::result::Result<RemoteCommandRecord, BoxError> {
        let command = self
            .http
            .create_global_command(metadata)
            .await
            .map_err(|e| DiscordError::api("create global command", e))?;
        Ok(to_record(command)?)
    }

    async fn edit(
        &self,
        id: &str,
        metadata: &Value,
    ) -> std::result::Result<RemoteCommandRecord, BoxError> {
        let command = self
            .http
            .edit_global_command(parse_command_id(id)?, metadata)
            .await
            .map_err(|e| DiscordError::api("edit global command", e))?;
        Ok(to_record(command)?)
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), BoxError> {
        self.http
            .delete_global_command(parse_command_id(id)?)
            .await
            .map_err(|e| DiscordError::api("delete global command", e))?;
        Ok(())
    }
}

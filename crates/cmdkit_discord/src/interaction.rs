//! Conversion of serenity interactions into cmdkit interactions

use std::sync::Arc;

use async_trait::async_trait;
use cmdkit_core::{AutocompleteChoice, BoxError, Interaction, InteractionKind, InteractionResponder};
use serde_json::Value;
use serenity::builder::{
    CreateAutocompleteResponse, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::http::Http;
use serenity::model::application::{CommandInteraction, CommandType};
use serenity::model::application::Interaction as GatewayInteraction;
use serenity::model::permissions::Permissions;

use crate::error::DiscordError;

/// Answers one command interaction through the HTTP API
pub struct SerenityResponder {
    http: Arc<Http>,
    interaction: CommandInteraction,
}

impl SerenityResponder {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self { http, interaction }
    }
}

#[async_trait]
impl InteractionResponder for SerenityResponder {
    async fn reply(&self, content: &str, ephemeral: bool) -> Result<(), BoxError> {
        self.interaction
            .create_response(
                &self.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .ephemeral(ephemeral),
                ),
            )
            .await
            .map_err(|e| DiscordError::api("interaction reply", e))?;
        Ok(())
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), BoxError> {
        let response = choices
            .into_iter()
            .fold(CreateAutocompleteResponse::new(), |response, choice| {
                response.add_string_choice(choice.name, choice.value)
            });

        self.interaction
            .create_response(&self.http, CreateInteractionResponse::Autocomplete(response))
            .await
            .map_err(|e| DiscordError::api("autocomplete response", e))?;
        Ok(())
    }
}

pub(crate) fn interaction_kind(command_type: CommandType, autocomplete: bool) -> InteractionKind {
    if autocomplete {
        return InteractionKind::Autocomplete;
    }
    match command_type {
        CommandType::ChatInput => InteractionKind::ChatInput,
        CommandType::User | CommandType::Message => InteractionKind::ContextMenu,
        _ => InteractionKind::Other,
    }
}

/// Human-readable names of a permission set, e.g. `Ban Members`
pub(crate) fn permission_names(permissions: Permissions) -> Vec<String> {
    permissions
        .get_permission_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn from_command(http: Arc<Http>, command: CommandInteraction, autocomplete: bool) -> Interaction {
    let kind = interaction_kind(command.data.kind, autocomplete);
    let options =
        serde_json::to_value(&command.data.options).unwrap_or_else(|_| Value::Array(Vec::new()));

    let mut interaction = Interaction::new(
        command.id.get().to_string(),
        kind,
        command.data.name.clone(),
        command.user.id.get().to_string(),
    )
    .with_options(options);

    if let Some(guild_id) = command.guild_id {
        interaction = interaction.with_guild(guild_id.get().to_string());
    }
    if let Some(member) = &command.member {
        interaction = interaction
            .with_member_roles(member.roles.iter().map(|r| r.get().to_string()).collect());
        if let Some(permissions) = member.permissions {
            interaction = interaction.with_member_permissions(permission_names(permissions));
        }
    }
    if let Some(permissions) = command.app_permissions {
        interaction = interaction.with_app_permissions(permission_names(permissions));
    }

    interaction.with_responder(Arc::new(SerenityResponder::new(http, command)))
}

/// Convert a gateway interaction, or `None` for kinds cmdkit does not route
pub fn convert_interaction(http: Arc<Http>, interaction: GatewayInteraction) -> Option<Interaction> {
    match interaction {
        GatewayInteraction::Command(command) => Some(from_command(http, command, false)),
        GatewayInteraction::Autocomplete(command) => Some(from_command(http, command, true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit_core::interaction::missing_permissions;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interaction_kind_mapping() {
        assert_eq!(
            interaction_kind(CommandType::ChatInput, false),
            InteractionKind::ChatInput
        );
        assert_eq!(
            interaction_kind(CommandType::User, false),
            InteractionKind::ContextMenu
        );
        assert_eq!(
            interaction_kind(CommandType::Message, false),
            InteractionKind::ContextMenu
        );
        assert_eq!(
            interaction_kind(CommandType::ChatInput, true),
            InteractionKind::Autocomplete
        );
    }

    #[test]
    fn test_permission_names_satisfy_requirements() {
        let held = permission_names(Permissions::BAN_MEMBERS | Permissions::KICK_MEMBERS);
        let required = vec!["BanMembers".to_string(), "KICK_MEMBERS".to_string()];
        assert!(missing_permissions(&required, &held).is_empty());

        let missing = missing_permissions(&["ManageGuild".to_string()], &held);
        assert_eq!(missing, vec!["ManageGuild".to_string()]);
    }

    #[test]
    fn test_administrator_name_grants_everything() {
        let held = permission_names(Permissions::ADMINISTRATOR);
        assert!(missing_permissions(&["BanMembers".to_string()], &held).is_empty());
    }
}

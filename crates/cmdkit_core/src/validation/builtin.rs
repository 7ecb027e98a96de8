//! Validations appended ahead of any user-supplied ones

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{Validation, ValidationArgs, ValidationOutcome};
use crate::config::CommandKitConfig;
use crate::interaction::missing_permissions;

/// Reply to the user and stop the chain.
///
/// Autocomplete requests cannot carry a message, so those are stopped silently.
async fn deny(args: &ValidationArgs, message: &str) -> ValidationOutcome {
    if !args.interaction.is_autocomplete() {
        if let Err(e) = args.interaction.reply(message, true).await {
            warn!(
                "Failed to send validation reply for '{}': {}",
                args.command.name, e
            );
        }
    }
    ValidationOutcome::Veto
}

/// Restricts `dev_only` commands to configured developers
#[derive(Debug, Clone, Default)]
pub struct DevOnly {
    pub dev_user_ids: Vec<String>,
    pub dev_guild_ids: Vec<String>,
    pub dev_role_ids: Vec<String>,
}

#[async_trait]
impl Validation for DevOnly {
    fn name(&self) -> &str {
        "dev_only"
    }

    async fn validate(&self, args: &ValidationArgs) -> ValidationOutcome {
        if !args.command.options.dev_only {
            return ValidationOutcome::Continue;
        }

        let interaction = &args.interaction;

        if let Some(guild_id) = &interaction.guild_id {
            if !self.dev_guild_ids.is_empty() && !self.dev_guild_ids.contains(guild_id) {
                return deny(
                    args,
                    "❌ This command can only be used inside development servers.",
                )
                .await;
            }
        }

        let is_dev_user = self.dev_user_ids.contains(&interaction.user_id);
        let has_dev_role = interaction
            .member_roles
            .iter()
            .any(|role| self.dev_role_ids.contains(role));

        if is_dev_user || has_dev_role {
            ValidationOutcome::Continue
        } else {
            deny(args, "❌ This command can only be used by developers.").await
        }
    }
}

/// Checks the invoking member holds every permission in `user_permissions`
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPermissions;

#[async_trait]
impl Validation for UserPermissions {
    fn name(&self) -> &str {
        "user_permissions"
    }

    async fn validate(&self, args: &ValidationArgs) -> ValidationOutcome {
        let required = &args.command.options.user_permissions;
        if required.is_empty() {
            return ValidationOutcome::Continue;
        }

        // Outside a guild there are no member permissions to check
        let Some(held) = &args.interaction.member_permissions else {
            return ValidationOutcome::Continue;
        };

        let missing = missing_permissions(required, held);
        if missing.is_empty() {
            ValidationOutcome::Continue
        } else {
            deny(
                args,
                &format!(
                    "❌ You need the following permissions to use this command: {}",
                    missing.join(", ")
                ),
            )
            .await
        }
    }
}

/// Checks the application holds every permission in `bot_permissions`
#[derive(Debug, Clone, Copy, Default)]
pub struct BotPermissions;

#[async_trait]
impl Validation for BotPermissions {
    fn name(&self) -> &str {
        "bot_permissions"
    }

    async fn validate(&self, args: &ValidationArgs) -> ValidationOutcome {
        let required = &args.command.options.bot_permissions;
        if required.is_empty() {
            return ValidationOutcome::Continue;
        }

        let Some(held) = &args.interaction.app_permissions else {
            return ValidationOutcome::Continue;
        };

        let missing = missing_permissions(required, held);
        if missing.is_empty() {
            ValidationOutcome::Continue
        } else {
            deny(
                args,
                &format!(
                    "❌ I need the following permissions to run this command: {}",
                    missing.join(", ")
                ),
            )
            .await
        }
    }
}

/// The built-in chain in execution order
pub fn built_in_validations(config: &CommandKitConfig) -> Vec<Arc<dyn Validation>> {
    vec![
        Arc::new(DevOnly {
            dev_user_ids: config.dev_user_ids.clone(),
            dev_guild_ids: config.dev_guild_ids.clone(),
            dev_role_ids: config.dev_role_ids.clone(),
        }),
        Arc::new(UserPermissions),
        Arc::new(BotPermissions),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCommandService, RecordingResponder, command_info};
    use crate::{Client, CommandInfo, Interaction, InteractionKind};
    use pretty_assertions::assert_eq;

    fn args_for(interaction: Interaction, command: CommandInfo) -> ValidationArgs {
        ValidationArgs {
            interaction: Arc::new(interaction),
            command: Arc::new(command),
            client: Arc::new(Client::new(Arc::new(MemoryCommandService::new()))),
        }
    }

    fn dev_only_command() -> CommandInfo {
        let mut info = command_info("deploy");
        info.options.dev_only = true;
        info
    }

    #[tokio::test]
    async fn test_dev_only_allows_dev_user() {
        let validation = DevOnly {
            dev_user_ids: vec!["7".to_string()],
            ..Default::default()
        };
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "deploy", "7");

        let outcome = validation
            .validate(&args_for(interaction, dev_only_command()))
            .await;
        assert_eq!(outcome, ValidationOutcome::Continue);
    }

    #[tokio::test]
    async fn test_dev_only_allows_dev_role() {
        let validation = DevOnly {
            dev_role_ids: vec!["99".to_string()],
            ..Default::default()
        };
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "deploy", "8")
            .with_guild("5")
            .with_member_roles(vec!["99".to_string()]);

        let outcome = validation
            .validate(&args_for(interaction, dev_only_command()))
            .await;
        assert_eq!(outcome, ValidationOutcome::Continue);
    }

    #[tokio::test]
    async fn test_dev_only_rejects_and_replies() {
        let validation = DevOnly {
            dev_user_ids: vec!["7".to_string()],
            ..Default::default()
        };
        let responder = Arc::new(RecordingResponder::default());
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "deploy", "8")
            .with_responder(responder.clone());

        let outcome = validation
            .validate(&args_for(interaction, dev_only_command()))
            .await;

        assert_eq!(outcome, ValidationOutcome::Veto);
        let replies = responder.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].ephemeral);
        assert!(replies[0].content.contains("developers"));
    }

    #[tokio::test]
    async fn test_dev_only_rejects_outside_dev_guild() {
        let validation = DevOnly {
            dev_user_ids: vec!["7".to_string()],
            dev_guild_ids: vec!["100".to_string()],
            ..Default::default()
        };
        let interaction =
            Interaction::new("1", InteractionKind::ChatInput, "deploy", "7").with_guild("200");

        let outcome = validation
            .validate(&args_for(interaction, dev_only_command()))
            .await;
        assert_eq!(outcome, ValidationOutcome::Veto);
    }

    #[tokio::test]
    async fn test_dev_only_ignores_regular_commands() {
        let validation = DevOnly::default();
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "ping", "8");

        let outcome = validation
            .validate(&args_for(interaction, command_info("ping")))
            .await;
        assert_eq!(outcome, ValidationOutcome::Continue);
    }

    #[tokio::test]
    async fn test_user_permissions_lists_missing() {
        let mut command = command_info("ban");
        command.options.user_permissions = vec!["BanMembers".to_string()];
        let responder = Arc::new(RecordingResponder::default());
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "ban", "8")
            .with_guild("5")
            .with_member_permissions(vec!["SEND_MESSAGES".to_string()])
            .with_responder(responder.clone());

        let outcome = UserPermissions
            .validate(&args_for(interaction, command))
            .await;

        assert_eq!(outcome, ValidationOutcome::Veto);
        assert!(responder.replies()[0].content.ends_with("BanMembers"));
    }

    #[tokio::test]
    async fn test_bot_permissions_pass_when_held() {
        let mut command = command_info("ban");
        command.options.bot_permissions = vec!["Ban Members".to_string()];
        let interaction = Interaction::new("1", InteractionKind::ChatInput, "ban", "8")
            .with_app_permissions(vec!["BAN_MEMBERS".to_string()]);

        let outcome = BotPermissions.validate(&args_for(interaction, command)).await;
        assert_eq!(outcome, ValidationOutcome::Continue);
    }

    #[tokio::test]
    async fn test_autocomplete_veto_is_silent() {
        let mut command = command_info("ban");
        command.options.user_permissions = vec!["BanMembers".to_string()];
        let responder = Arc::new(RecordingResponder::default());
        let interaction = Interaction::new("1", InteractionKind::Autocomplete, "ban", "8")
            .with_member_permissions(Vec::new())
            .with_responder(responder.clone());

        let outcome = UserPermissions
            .validate(&args_for(interaction, command))
            .await;

        assert_eq!(outcome, ValidationOutcome::Veto);
        assert!(responder.replies().is_empty());
    }
}

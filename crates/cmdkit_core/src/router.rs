//! Routing inbound interactions to command handlers

use std::sync::Arc;

use tracing::debug;

use crate::command::CommandContext;
use crate::context::{self, ExecutionContext};
use crate::registry::CommandRegistry;
use crate::validation::{PipelineOutcome, ValidationArgs, ValidationPipeline};
use crate::{Client, CommandKitError, Interaction, Result};

/// What happened to one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a command, context-menu or autocomplete interaction
    Ignored,
    /// No loaded command has this name
    Unknown,
    /// Autocomplete for a command without an autocomplete handler
    NoAutocomplete,
    /// A validation stopped the chain
    Vetoed { by: String },
    /// The handler ran
    Handled,
}

pub struct InteractionRouter {
    registry: Arc<CommandRegistry>,
    pipeline: Option<Arc<ValidationPipeline>>,
    client: Arc<Client>,
}

impl InteractionRouter {
    pub fn new(
        registry: Arc<CommandRegistry>,
        pipeline: Option<Arc<ValidationPipeline>>,
        client: Arc<Client>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            client,
        }
    }

    /// Route one interaction.
    ///
    /// Unknown commands and autocomplete requests without a handler are
    /// dropped without error. Handler failures are returned.
    pub async fn route(&self, interaction: Arc<Interaction>) -> Result<Dispatch> {
        if !interaction.kind.is_routable() {
            return Ok(Dispatch::Ignored);
        }

        let Some(command) = self.registry.get(&interaction.command_name) else {
            debug!("No command named '{}'", interaction.command_name);
            return Ok(Dispatch::Unknown);
        };

        let is_autocomplete = interaction.is_autocomplete();
        let handler = if is_autocomplete {
            match &command.autocomplete {
                Some(handler) => handler.clone(),
                None => return Ok(Dispatch::NoAutocomplete),
            }
        } else {
            command.run.clone()
        };

        let execution = ExecutionContext {
            interaction: interaction.clone(),
            command: command.info.clone(),
        };

        context::scope(execution, async {
            if let Some(pipeline) = &self.pipeline {
                let args = ValidationArgs {
                    interaction: interaction.clone(),
                    command: command.info.clone(),
                    client: self.client.clone(),
                };
                if let PipelineOutcome::Vetoed { by } = pipeline.run(&args).await {
                    return Ok(Dispatch::Vetoed { by });
                }
            }

            debug!(
                "Dispatching {} interaction {} to '{}'",
                interaction.kind,
                interaction.id,
                command.name()
            );

            handler
                .call(CommandContext {
                    interaction: interaction.clone(),
                    client: self.client.clone(),
                })
                .await
                .map(|()| Dispatch::Handled)
                .map_err(|cause| CommandKitError::Handler {
                    command: command.name().to_string(),
                    handler: if is_autocomplete { "autocomplete" } else { "run" },
                    cause,
                })
        })
        .await
    }
}

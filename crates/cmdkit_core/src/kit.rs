//! The command kit: owns the registry, pipeline and router for one client

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::command::{CommandHandler, CommandInfo, HandlerTable};
use crate::config::CommandKitConfig;
use crate::loader;
use crate::reconcile::{self, ReconcileReport};
use crate::registry::{CommandRegistry, CommandSet};
use crate::router::{Dispatch, InteractionRouter};
use crate::validation::builtin::built_in_validations;
use crate::validation::{Validation, ValidationPipeline, ValidatorTable};
use crate::{Client, CommandKitError, Interaction, Result};

/// Assembles a [`CommandKit`]
#[derive(Default)]
pub struct CommandKitBuilder {
    client: Option<Arc<Client>>,
    config: CommandKitConfig,
    handlers: HandlerTable,
    validators: ValidatorTable,
}

impl CommandKitBuilder {
    pub fn client(mut self, client: Arc<Client>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CommandKitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn commands_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.commands_path = Some(path.into());
        self
    }

    pub fn validations_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.validations_path = Some(path.into());
        self
    }

    pub fn skip_built_in_validations(mut self, skip: bool) -> Self {
        self.config.skip_built_in_validations = skip;
        self
    }

    /// Users allowed to run dev-only commands
    pub fn dev_user_ids(mut self, ids: Vec<String>) -> Self {
        self.config.dev_user_ids = ids;
        self
    }

    /// Make a handler available to definition files under `key`
    pub fn handler(mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.register(key, handler);
        self
    }

    /// Make a validation available to validation files under `key`
    pub fn validator(mut self, key: impl Into<String>, validation: Arc<dyn Validation>) -> Self {
        self.validators.register(key, validation);
        self
    }

    pub fn build(self) -> Result<CommandKit> {
        let client = self
            .client
            .ok_or_else(|| CommandKitError::configuration("No client was provided"))?;

        if self.config.validations_path.is_some() && self.config.commands_path.is_none() {
            return Err(CommandKitError::configuration(
                "A validations path was given without a commands path",
            ));
        }

        let built_in = if self.config.skip_built_in_validations {
            Vec::new()
        } else {
            built_in_validations(&self.config)
        };
        let pipeline = (self.config.validations_path.is_some() || !built_in.is_empty())
            .then(|| Arc::new(ValidationPipeline::new(built_in)));

        let registry = Arc::new(CommandRegistry::new());
        let router = InteractionRouter::new(registry.clone(), pipeline.clone(), client.clone());

        Ok(CommandKit {
            config: self.config,
            client,
            handlers: self.handlers,
            validators: self.validators,
            registry,
            pipeline,
            router,
            reload: Mutex::new(()),
        })
    }
}

/// Loads command definitions, keeps them registered remotely and routes
/// interactions to them.
///
/// Create one per client with [`CommandKit::builder`], call
/// [`init`](Self::init) before connecting, [`on_ready`](Self::on_ready) when
/// the gateway signals ready and [`handle_interaction`](Self::handle_interaction)
/// for every inbound interaction.
pub struct CommandKit {
    config: CommandKitConfig,
    client: Arc<Client>,
    handlers: HandlerTable,
    validators: ValidatorTable,
    registry: Arc<CommandRegistry>,
    pipeline: Option<Arc<ValidationPipeline>>,
    router: InteractionRouter,
    // Serializes load/publish/reconcile sequences
    reload: Mutex<()>,
}

impl std::fmt::Debug for CommandKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandKit")
            .field("config", &self.config)
            .field("client", &self.client)
            .field("commands", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl CommandKit {
    pub fn builder() -> CommandKitBuilder {
        CommandKitBuilder::default()
    }

    /// Load commands and validations from the configured directories
    pub async fn init(&self) -> Result<()> {
        let _guard = self.reload.lock().await;

        if let Some(root) = &self.config.commands_path {
            self.load_and_publish(root).await?;
        }
        if let Some(root) = &self.config.validations_path {
            self.load_validations(root).await?;
        }

        info!(
            "Command kit ready with {} commands and {} validations",
            self.registry.len(),
            self.pipeline.as_ref().map_or(0, |p| p.len())
        );
        Ok(())
    }

    /// Mark the client ready and register the loaded commands globally
    pub async fn on_ready(&self) -> Result<ReconcileReport> {
        self.client.mark_ready();
        let _guard = self.reload.lock().await;
        self.reconcile_current().await
    }

    /// Route one inbound interaction
    pub async fn handle_interaction(&self, interaction: Interaction) -> Result<Dispatch> {
        let dispatch = self.router.route(Arc::new(interaction)).await?;
        debug!("Interaction outcome: {:?}", dispatch);
        Ok(dispatch)
    }

    /// Re-read every command definition from disk and reconcile.
    ///
    /// Nothing changes unless a commands path is configured and the client
    /// is ready.
    pub async fn reload_commands(&self) -> Result<ReconcileReport> {
        let root = self.config.commands_path.as_ref().ok_or_else(|| {
            CommandKitError::configuration("Cannot reload commands without a commands path")
        })?;
        if !self.client.is_ready() {
            return Err(CommandKitError::not_ready("reload commands"));
        }

        let _guard = self.reload.lock().await;
        self.load_and_publish(root).await?;
        self.reconcile_current().await
    }

    /// Re-read the user-supplied validations from disk
    pub async fn reload_validations(&self) -> Result<()> {
        let root = self.config.validations_path.as_ref().ok_or_else(|| {
            CommandKitError::configuration("Cannot reload validations without a validations path")
        })?;

        let _guard = self.reload.lock().await;
        self.load_validations(root).await
    }

    /// Loaded commands without their handlers, in load order
    pub fn commands(&self) -> Vec<Arc<CommandInfo>> {
        self.registry.snapshot().infos()
    }

    pub fn commands_path(&self) -> Option<&Path> {
        self.config.commands_path.as_deref()
    }

    pub fn validations_path(&self) -> Option<&Path> {
        self.config.validations_path.as_deref()
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Names of the validations run before each dispatch, in order
    pub fn validations(&self) -> Vec<String> {
        self.pipeline
            .as_ref()
            .map(|p| p.names())
            .unwrap_or_default()
    }

    async fn load_and_publish(&self, root: &Path) -> Result<()> {
        let outcome = loader::load_commands(root, &self.config.extensions, &self.handlers).await?;
        let previous = self
            .registry
            .publish(CommandSet::from_definitions(outcome.loaded));
        debug!(
            "Replaced {} commands with {}",
            previous.len(),
            self.registry.len()
        );
        Ok(())
    }

    async fn load_validations(&self, root: &Path) -> Result<()> {
        let outcome =
            loader::load_validations(root, &self.config.extensions, &self.validators).await?;
        if let Some(pipeline) = &self.pipeline {
            pipeline.replace_user(outcome.loaded);
        }
        Ok(())
    }

    async fn reconcile_current(&self) -> Result<ReconcileReport> {
        let snapshot = self.registry.snapshot();
        let report = reconcile::reconcile(
            self.client.service().as_ref(),
            snapshot.iter().map(Arc::as_ref),
        )
        .await?;

        info!(
            "Command registration: {} created, {} edited, {} deleted, {} unchanged, {} failed",
            report.created.len(),
            report.edited.len(),
            report.deleted.len(),
            report.unchanged.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

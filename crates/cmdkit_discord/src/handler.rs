use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cmdkit_core::CommandKit;
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::http::Http;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use tracing::{debug, error, info, warn};

use crate::interaction::convert_interaction;

/// Gateway event handler that drives a [`CommandKit`]
pub struct CommandKitHandler {
    kit: Arc<CommandKit>,
    /// The HTTP client the command service uses
    http: Arc<Http>,
    // Set once a registration pass got past the remote fetch
    registered: AtomicBool,
}

impl CommandKitHandler {
    pub fn new(kit: Arc<CommandKit>, http: Arc<Http>) -> Self {
        Self {
            kit,
            http,
            registered: AtomicBool::new(false),
        }
    }

    /// Register commands on the first ready of this process.
    ///
    /// Later gateway sessions fire `ready` again; those are skipped unless
    /// every earlier pass aborted. Returns whether a pass ran.
    pub async fn register_commands(&self) -> bool {
        if self.registered.swap(true, Ordering::SeqCst) {
            debug!("Commands already registered, skipping ready pass");
            return false;
        }

        match self.kit.on_ready().await {
            Ok(report) if report.is_success() => {
                info!("Registered commands: {} changes", report.changes());
            }
            Ok(report) => {
                for failure in &report.failures {
                    warn!("Command registration failed: {}", failure);
                }
            }
            Err(e) => {
                error!("Command registration aborted: {:?}", e);
                self.registered.store(false, Ordering::SeqCst);
            }
        }
        true
    }
}

#[async_trait]
impl EventHandler for CommandKitHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        self.http.set_application_id(ready.application.id);
        ctx.http.set_application_id(ready.application.id);

        self.register_commands().await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(interaction) = convert_interaction(ctx.http.clone(), interaction) else {
            return;
        };

        debug!(
            "Received {} interaction for '{}' from user {}",
            interaction.kind, interaction.command_name, interaction.user_id
        );

        if let Err(e) = self.kit.handle_interaction(interaction).await {
            error!("Error handling interaction: {:?}", e);
        }
    }
}

//! The remote command registry and the client handle passed to handlers

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BoxError;

/// A command as registered with the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommandRecord {
    pub id: String,
    pub name: String,
    /// Full metadata as reported by the service
    pub metadata: Value,
}

/// Global application-command operations of the remote service
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RemoteCommandRecord>, BoxError>;

    async fn create(&self, metadata: &Value) -> Result<RemoteCommandRecord, BoxError>;

    async fn edit(&self, id: &str, metadata: &Value) -> Result<RemoteCommandRecord, BoxError>;

    async fn delete(&self, id: &str) -> Result<(), BoxError>;
}

/// Handle to the gateway connection and remote service.
///
/// Handlers and validations receive this alongside the interaction.
pub struct Client {
    service: Arc<dyn CommandService>,
    ready: AtomicBool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(service: Arc<dyn CommandService>) -> Self {
        Self {
            service,
            ready: AtomicBool::new(false),
        }
    }

    pub fn service(&self) -> &Arc<dyn CommandService> {
        &self.service
    }

    /// Whether the gateway has signalled ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Called when the gateway session is lost
    pub fn mark_disconnected(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

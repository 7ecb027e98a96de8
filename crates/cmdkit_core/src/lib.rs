//! cmdkit core - command loading, registration and routing
//!
//! This crate turns a directory of declarative command definition files into
//! a live command set: it validates the files, keeps the remote global
//! command registry in step with them, and routes inbound interactions
//! through a validation pipeline to the bound handlers.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod interaction;
pub mod kit;
pub mod loader;
pub mod reconcile;
pub mod registry;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use command::{
    CommandContext, CommandDefinition, CommandHandler, CommandInfo, CommandOptions, HandlerTable,
    handler_fn,
};
pub use config::CommandKitConfig;
pub use context::ExecutionContext;
pub use error::{BoxError, CommandKitError, Result};
pub use interaction::{AutocompleteChoice, Interaction, InteractionKind, InteractionResponder};
pub use kit::{CommandKit, CommandKitBuilder};
pub use reconcile::{ReconcileReport, RegistrationFailure, RegistrationOp};
pub use router::Dispatch;
pub use service::{Client, CommandService, RemoteCommandRecord};
pub use validation::{Validation, ValidationArgs, ValidationOutcome, validation_fn};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AutocompleteChoice, Client, CommandContext, CommandHandler, CommandInfo, CommandKit,
        CommandKitConfig, CommandKitError, Dispatch, Interaction, InteractionKind, Result,
        Validation, ValidationArgs, ValidationOutcome, handler_fn, validation_fn,
    };
}

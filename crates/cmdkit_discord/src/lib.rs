//! cmdkit Discord integration
//!
//! Serenity implementations of the command service and interaction
//! responder, plus an event handler that feeds gateway events into a
//! [`CommandKit`](cmdkit_core::CommandKit).

pub mod error;
pub mod handler;
pub mod interaction;
pub mod service;

pub use error::{DiscordError, Result};
pub use handler::CommandKitHandler;
pub use interaction::{SerenityResponder, convert_interaction};
pub use service::SerenityCommandService;

// Re-export serenity for consumers
pub use serenity;

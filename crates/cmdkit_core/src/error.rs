use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::reconcile::RegistrationFailure;

/// Boxed error returned by command handlers and remote command services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Diagnostic, Debug)]
pub enum CommandKitError {
    #[error("Invalid command kit configuration")]
    #[diagnostic(
        code(cmdkit::configuration),
        help("Configuration error: {issue}")
    )]
    Configuration { issue: String },

    #[error("Client is not ready")]
    #[diagnostic(
        code(cmdkit::client_not_ready),
        help("Cannot {operation} before the gateway connection has signalled ready")
    )]
    ClientNotReady { operation: String },

    #[error("Failed to read definitions under {}", .path.display())]
    #[diagnostic(
        code(cmdkit::io),
        help("Check that the directory exists and is readable")
    )]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("Failed to fetch registered commands")]
    #[diagnostic(
        code(cmdkit::registration::fetch_failed),
        help("The remote command registry could not be listed; no changes were applied")
    )]
    FetchFailed {
        #[source]
        cause: BoxError,
    },

    #[error("Command registration failed for {} command(s)", .failures.len())]
    #[diagnostic(
        code(cmdkit::registration::failed),
        help("Failed commands: {}", crate::reconcile::summarize_failures(failures))
    )]
    Registration { failures: Vec<RegistrationFailure> },

    #[error("Command handler failed")]
    #[diagnostic(
        code(cmdkit::handler_failed),
        help("The {handler} handler of command '{command}' returned an error")
    )]
    Handler {
        command: String,
        handler: &'static str,
        #[source]
        cause: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, CommandKitError>;

impl CommandKitError {
    pub fn configuration(issue: impl Into<String>) -> Self {
        Self::Configuration {
            issue: issue.into(),
        }
    }

    pub fn not_ready(operation: impl Into<String>) -> Self {
        Self::ClientNotReady {
            operation: operation.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::RegistrationOp;
    use miette::Report;

    #[test]
    fn test_registration_error_lists_failed_commands() {
        let error = CommandKitError::Registration {
            failures: vec![
                RegistrationFailure {
                    name: "ping".to_string(),
                    op: RegistrationOp::Create,
                    message: "boom".to_string(),
                },
                RegistrationFailure {
                    name: "echo".to_string(),
                    op: RegistrationOp::Delete,
                    message: "gone".to_string(),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "Command registration failed for 2 command(s)"
        );

        let output = format!("{:?}", Report::new(error));
        assert!(output.contains("cmdkit::registration::failed"));
        assert!(output.contains("create 'ping': boom"));
        assert!(output.contains("delete 'echo': gone"));
    }

    #[test]
    fn test_not_ready_names_operation() {
        let error = CommandKitError::not_ready("reload commands");
        let output = format!("{:?}", Report::new(error));
        assert!(output.contains("Cannot reload commands before"));
    }
}

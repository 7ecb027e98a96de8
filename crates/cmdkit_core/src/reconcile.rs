//! Bringing the remote command registry in line with the local definitions
//!
//! One pass fetches the remote set once, then walks the local non-dev-only
//! definitions in order and issues at most one create, edit or delete per
//! definition. Remote commands with no local definition are left alone; only
//! `deleted = true` removes a command.
//!
//! A failed remote call is recorded against its command and the pass carries
//! on with the rest. Nothing is retried or rolled back.

pub mod compare;

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::command::CommandDefinition;
use crate::service::{CommandService, RemoteCommandRecord};
use crate::{CommandKitError, Result};

pub use compare::{commands_differ, normalize};

/// The remote operation that was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationOp {
    Create,
    Edit,
    Delete,
}

impl fmt::Display for RegistrationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One remote call that failed during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationFailure {
    pub name: String,
    pub op: RegistrationOp,
    pub message: String,
}

impl fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.op, self.name, self.message)
    }
}

pub(crate) fn summarize_failures(failures: &[RegistrationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What a reconciliation pass did, by command name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub edited: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    /// Marked deleted locally but not registered remotely
    pub skipped: Vec<String>,
    pub failures: Vec<RegistrationFailure>,
}

impl ReconcileReport {
    /// Number of remote calls that changed something
    pub fn changes(&self) -> usize {
        self.created.len() + self.edited.len() + self.deleted.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn recorded failures into an error
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(CommandKitError::Registration {
                failures: self.failures,
            })
        }
    }

    fn fail(&mut self, name: &str, op: RegistrationOp, error: impl fmt::Display) {
        let failure = RegistrationFailure {
            name: name.to_string(),
            op,
            message: error.to_string(),
        };
        warn!("Failed to {} command \"{}\" globally: {}", op, name, error);
        self.failures.push(failure);
    }
}

/// Run one reconciliation pass against the remote global command set
pub async fn reconcile<'a, I>(service: &dyn CommandService, definitions: I) -> Result<ReconcileReport>
where
    I: IntoIterator<Item = &'a CommandDefinition>,
{
    let remote: Vec<RemoteCommandRecord> = service
        .fetch_all()
        .await
        .map_err(|cause| CommandKitError::FetchFailed { cause })?;

    let mut report = ReconcileReport::default();

    for command in definitions {
        let name = command.name();
        let options = command.options();

        // Dev-only commands never take part in the global pass
        if options.dev_only {
            continue;
        }

        let target = remote.iter().find(|record| record.name == name);

        if options.deleted {
            match target {
                None => {
                    warn!("Ignoring: Command \"{}\" is globally marked as deleted.", name);
                    report.skipped.push(name.to_string());
                }
                Some(record) => match service.delete(&record.id).await {
                    Ok(()) => {
                        info!("Deleted command \"{}\" globally.", name);
                        report.deleted.push(name.to_string());
                    }
                    Err(e) => report.fail(name, RegistrationOp::Delete, e),
                },
            }
            continue;
        }

        let data = &command.info.data;

        match target {
            Some(record) if commands_differ(data, &record.metadata) => {
                match service.edit(&record.id, data).await {
                    Ok(_) => {
                        info!("Edited command \"{}\" globally.", name);
                        report.edited.push(name.to_string());
                    }
                    Err(e) => report.fail(name, RegistrationOp::Edit, e),
                }
            }
            Some(_) => report.unchanged.push(name.to_string()),
            None => match service.create(data).await {
                Ok(_) => {
                    info!("Registered command \"{}\" globally.", name);
                    report.created.push(name.to_string());
                }
                Err(e) => report.fail(name, RegistrationOp::Create, e),
            },
        }
    }

    Ok(report)
}

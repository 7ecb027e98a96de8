//! The validation pipeline run before every command dispatch
//!
//! Validations run strictly one after another. The first one to return
//! [`ValidationOutcome::Veto`] stops the chain and the handler is not called.
//! A veto is silent: validations that want the user to know why reply to the
//! interaction themselves.

pub mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::{Client, CommandInfo, Interaction};

/// What a validation decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Continue,
    Veto,
}

impl From<bool> for ValidationOutcome {
    /// `true` stops the chain
    fn from(stop: bool) -> Self {
        if stop { Self::Veto } else { Self::Continue }
    }
}

/// Everything a validation can look at
#[derive(Debug, Clone)]
pub struct ValidationArgs {
    pub interaction: Arc<Interaction>,
    pub command: Arc<CommandInfo>,
    pub client: Arc<Client>,
}

#[async_trait]
pub trait Validation: Send + Sync {
    fn name(&self) -> &str;

    async fn validate(&self, args: &ValidationArgs) -> ValidationOutcome;
}

/// Adapter turning an async closure into a [`Validation`]
pub struct FnValidation<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Validation for FnValidation<F>
where
    F: Fn(ValidationArgs) -> Fut + Send + Sync,
    Fut: Future<Output = ValidationOutcome> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(&self, args: &ValidationArgs) -> ValidationOutcome {
        (self.f)(args.clone()).await
    }
}

pub fn validation_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn Validation>
where
    F: Fn(ValidationArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ValidationOutcome> + Send + 'static,
{
    Arc::new(FnValidation {
        name: name.into(),
        f,
    })
}

/// Named validations that validation files refer to from `default`
#[derive(Clone, Default)]
pub struct ValidatorTable {
    validators: HashMap<String, Arc<dyn Validation>>,
}

impl ValidatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, validation: Arc<dyn Validation>) {
        self.validators.insert(key.into(), validation);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn Validation>> {
        self.validators.get(key)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Result of running the whole chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Passed,
    Vetoed { by: String },
}

/// Built-in validations followed by the user-supplied ones
pub struct ValidationPipeline {
    built_in: Vec<Arc<dyn Validation>>,
    user: RwLock<Arc<Vec<Arc<dyn Validation>>>>,
}

impl ValidationPipeline {
    pub fn new(built_in: Vec<Arc<dyn Validation>>) -> Self {
        Self {
            built_in,
            user: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Swap in a new set of user-supplied validations
    pub fn replace_user(&self, validations: Vec<Arc<dyn Validation>>) {
        *self.user.write() = Arc::new(validations);
    }

    /// Number of validations in the chain
    pub fn len(&self) -> usize {
        self.built_in.len() + self.user.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names in execution order
    pub fn names(&self) -> Vec<String> {
        let user = self.user.read().clone();
        self.built_in
            .iter()
            .chain(user.iter())
            .map(|v| v.name().to_string())
            .collect()
    }

    pub async fn run(&self, args: &ValidationArgs) -> PipelineOutcome {
        // Snapshot so a concurrent reload cannot change the chain mid-run
        let user = self.user.read().clone();

        for validation in self.built_in.iter().chain(user.iter()) {
            if validation.validate(args).await == ValidationOutcome::Veto {
                debug!(
                    "Validation '{}' stopped command '{}'",
                    validation.name(),
                    args.command.name
                );
                return PipelineOutcome::Vetoed {
                    by: validation.name().to_string(),
                };
            }
        }

        PipelineOutcome::Passed
    }
}

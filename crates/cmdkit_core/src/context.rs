//! Interaction-scoped context visible to everything a handler calls
//!
//! The context is a task-local bound around a single dispatch. Code running
//! inside the handler future can read it with [`current`]; concurrently
//! handled interactions each see their own, and tasks spawned from a handler
//! do not inherit it.

use std::future::Future;
use std::sync::Arc;

use crate::{CommandInfo, Interaction};

/// The interaction being handled and the command it targets
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub interaction: Arc<Interaction>,
    pub command: Arc<CommandInfo>,
}

tokio::task_local! {
    static EXECUTION_CONTEXT: ExecutionContext;
}

/// Run `future` with `context` bound for its whole dynamic extent
pub async fn scope<F>(context: ExecutionContext, future: F) -> F::Output
where
    F: Future,
{
    EXECUTION_CONTEXT.scope(context, future).await
}

/// The context of the interaction currently being handled, if any
pub fn current() -> Option<ExecutionContext> {
    EXECUTION_CONTEXT.try_with(Clone::clone).ok()
}

/// Shortcut for the current interaction
pub fn current_interaction() -> Option<Arc<Interaction>> {
    EXECUTION_CONTEXT
        .try_with(|ctx| ctx.interaction.clone())
        .ok()
}

/// Shortcut for the current command
pub fn current_command() -> Option<Arc<CommandInfo>> {
    EXECUTION_CONTEXT.try_with(|ctx| ctx.command.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InteractionKind;
    use crate::testing::command_info;
    use std::time::Duration;

    fn context(id: &str, name: &str) -> ExecutionContext {
        ExecutionContext {
            interaction: Arc::new(Interaction::new(id, InteractionKind::ChatInput, name, "7")),
            command: Arc::new(command_info(name)),
        }
    }

    #[tokio::test]
    async fn test_no_context_outside_scope() {
        assert!(current().is_none());
        assert!(current_command().is_none());
    }

    #[tokio::test]
    async fn test_context_visible_through_nested_calls() {
        async fn nested() -> Option<String> {
            tokio::task::yield_now().await;
            current_command().map(|c| c.name.clone())
        }

        let seen = scope(context("1", "ping"), nested()).await;
        assert_eq!(seen.as_deref(), Some("ping"));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_do_not_leak() {
        let a = scope(context("a", "first"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            current_interaction().map(|i| i.id.clone())
        });
        let b = scope(context("b", "second"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            current_interaction().map(|i| i.id.clone())
        });

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.as_deref(), Some("a"));
        assert_eq!(b.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_spawned_tasks_do_not_inherit() {
        let inner = scope(context("1", "ping"), async {
            tokio::spawn(async { current().is_some() }).await.unwrap()
        })
        .await;
        assert!(!inner);
    }
}

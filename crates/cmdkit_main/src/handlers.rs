//! Handlers the bundled command files refer to

use std::sync::Arc;

use cmdkit_core::{AutocompleteChoice, CommandHandler, CommandKitBuilder, handler_fn};

const ECHO_SUGGESTIONS: &[&str] = &["hello", "hello world", "pong", "ping"];

pub fn ping() -> Arc<dyn CommandHandler> {
    handler_fn(|ctx| async move { ctx.interaction.reply("Pong!", false).await })
}

pub fn echo() -> Arc<dyn CommandHandler> {
    handler_fn(|ctx| async move {
        let text = ctx.interaction.option_str("text").unwrap_or_default().to_string();
        let private = ctx
            .interaction
            .option("private")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        ctx.interaction.reply(&text, private).await
    })
}

pub fn echo_complete() -> Arc<dyn CommandHandler> {
    handler_fn(|ctx| async move {
        let typed = ctx
            .interaction
            .focused_option()
            .and_then(|(_, value)| value.as_str())
            .unwrap_or_default()
            .to_lowercase();

        let choices = ECHO_SUGGESTIONS
            .iter()
            .filter(|s| s.starts_with(&typed))
            .map(|s| AutocompleteChoice::new(*s, *s))
            .collect();
        ctx.interaction.autocomplete(choices).await
    })
}

/// Register every bundled handler under the key its command file uses
pub fn register(builder: CommandKitBuilder) -> CommandKitBuilder {
    builder
        .handler("general.ping", ping())
        .handler("general.echo", echo())
        .handler("general.echo.complete", echo_complete())
}

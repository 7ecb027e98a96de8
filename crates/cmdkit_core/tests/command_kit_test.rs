//! End-to-end tests for the command kit
//!
//! These build a real command tree on disk, run the kit against the in-memory
//! command service and drive interactions through the router.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cmdkit_core::testing::{MemoryCommandService, RecordingResponder, ServiceCall};
use cmdkit_core::validation::ValidationOutcome;
use cmdkit_core::{
    AutocompleteChoice, Client, CommandKit, CommandKitError, Dispatch, Interaction,
    InteractionKind, context, handler_fn, validation_fn,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tracing_test::traced_test;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const PING: &str = r#"
run = "general.ping"

[data]
name = "ping"
description = "Pong!"
"#;

struct Fixture {
    dir: TempDir,
    service: Arc<MemoryCommandService>,
    client: Arc<Client>,
    pings: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let service = Arc::new(MemoryCommandService::new());
        Self {
            dir: TempDir::new().unwrap(),
            client: Arc::new(Client::new(service.clone())),
            service,
            pings: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn commands(&self) -> std::path::PathBuf {
        self.dir.path().join("commands")
    }

    fn validations(&self) -> std::path::PathBuf {
        self.dir.path().join("validations")
    }

    fn kit(&self) -> CommandKit {
        let pings = self.pings.clone();
        CommandKit::builder()
            .client(self.client.clone())
            .commands_path(self.commands())
            .skip_built_in_validations(true)
            .handler(
                "general.ping",
                handler_fn(move |ctx| {
                    let pings = pings.clone();
                    async move {
                        pings.fetch_add(1, Ordering::SeqCst);
                        ctx.interaction.reply("Pong!", false).await
                    }
                }),
            )
            .build()
            .unwrap()
    }
}

#[tokio::test]
async fn test_ready_registers_new_command() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    let kit = fixture.kit();

    kit.init().await.unwrap();
    let report = kit.on_ready().await.unwrap();

    assert_eq!(report.created, vec!["ping".to_string()]);
    assert_eq!(
        fixture.service.mutations(),
        vec![ServiceCall::Create("ping".to_string())]
    );
    assert_eq!(kit.commands()[0].category.as_deref(), Some("general"));
}

#[tokio::test]
async fn test_identical_remote_command_is_left_alone() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    fixture
        .service
        .seed(&json!({ "name": "ping", "description": "Pong!", "type": 1, "options": [] }));
    let kit = fixture.kit();

    kit.init().await.unwrap();
    let report = kit.on_ready().await.unwrap();

    assert_eq!(report.unchanged, vec!["ping".to_string()]);
    assert!(fixture.service.mutations().is_empty());
}

#[tokio::test]
async fn test_deleted_definition_removes_remote_command() {
    let fixture = Fixture::new();
    write(
        &fixture.commands(),
        "ping.json",
        r#"{ "data": { "name": "ping" }, "run": "general.ping", "options": { "deleted": true } }"#,
    );
    fixture.service.seed(&json!({ "name": "ping", "description": "Pong!" }));
    let kit = fixture.kit();

    kit.init().await.unwrap();
    kit.on_ready().await.unwrap();

    assert_eq!(
        fixture.service.mutations(),
        vec![ServiceCall::Delete("ping".to_string())]
    );
    assert!(fixture.service.names().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_malformed_files_are_skipped() {
    let fixture = Fixture::new();
    let root = fixture.commands();
    write(&root, "general/ping.toml", PING);
    write(&root, "broken/no_data.toml", "run = \"general.ping\"\n");
    write(&root, "broken/no_name.toml", "run = \"general.ping\"\n[data]\ndescription = \"x\"\n");
    write(&root, "broken/bad_run.toml", "run = \"missing\"\n[data]\nname = \"bad\"\n");
    write(&root, "broken/garbage.json", "{ not json");
    write(&root, "notes.md", "not a definition");
    let kit = fixture.kit();

    kit.init().await.unwrap();

    let names: Vec<String> = kit.commands().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["ping".to_string()]);
    assert!(logs_contain("Ignoring: Command file"));
}

#[tokio::test]
async fn test_reload_picks_up_changed_metadata() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    let kit = fixture.kit();
    kit.init().await.unwrap();
    kit.on_ready().await.unwrap();

    write(
        &fixture.commands(),
        "general/ping.toml",
        &PING.replace("Pong!", "Replies with pong"),
    );
    let report = kit.reload_commands().await.unwrap();

    assert_eq!(report.edited, vec!["ping".to_string()]);
    assert_eq!(
        fixture.service.record("ping").unwrap().metadata["description"],
        json!("Replies with pong")
    );

    let again = kit.reload_commands().await.unwrap();
    assert_eq!(again.changes(), 0);
}

#[tokio::test]
async fn test_reload_before_ready_keeps_registry() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    let kit = fixture.kit();
    kit.init().await.unwrap();

    write(&fixture.commands(), "general/echo.toml", &PING.replace("ping", "echo"));
    let err = kit.reload_commands().await.unwrap_err();

    assert!(matches!(err, CommandKitError::ClientNotReady { .. }));
    assert_eq!(kit.commands().len(), 1);
}

#[tokio::test]
async fn test_missing_commands_directory_is_an_error() {
    let fixture = Fixture::new();
    let kit = fixture.kit();

    let err = kit.init().await.unwrap_err();
    assert!(matches!(err, CommandKitError::Io { .. }));
}

#[tokio::test]
async fn test_interaction_routes_to_handler() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    let kit = fixture.kit();
    kit.init().await.unwrap();

    let responder = Arc::new(RecordingResponder::default());
    let dispatch = kit
        .handle_interaction(
            Interaction::new("1", InteractionKind::ChatInput, "ping", "7")
                .with_responder(responder.clone()),
        )
        .await
        .unwrap();

    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(fixture.pings.load(Ordering::SeqCst), 1);
    assert_eq!(responder.replies()[0].content, "Pong!");

    let unknown = kit
        .handle_interaction(Interaction::new("2", InteractionKind::ChatInput, "foo", "7"))
        .await
        .unwrap();
    assert_eq!(unknown, Dispatch::Unknown);
    assert_eq!(fixture.pings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_autocomplete_handler_sees_focused_option() {
    let fixture = Fixture::new();
    write(
        &fixture.commands(),
        "tags/tag.toml",
        r#"
run = "tags.run"
autocomplete = "tags.complete"

[data]
name = "tag"
description = "Look up a tag"

[[data.options]]
type = 3
name = "key"
description = "Tag name"
autocomplete = true
"#,
    );
    let kit = CommandKit::builder()
        .client(fixture.client.clone())
        .commands_path(fixture.commands())
        .handler("tags.run", handler_fn(|_ctx| async { Ok(()) }))
        .handler(
            "tags.complete",
            handler_fn(|ctx| async move {
                let typed = ctx
                    .interaction
                    .focused_option()
                    .and_then(|(_, v)| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let in_scope = context::current_command().map(|c| c.name.clone());
                ctx.interaction
                    .autocomplete(vec![AutocompleteChoice::new(
                        format!("{}:{}", in_scope.unwrap_or_default(), typed),
                        typed,
                    )])
                    .await
            }),
        )
        .build()
        .unwrap();
    kit.init().await.unwrap();

    let responder = Arc::new(RecordingResponder::default());
    kit.handle_interaction(
        Interaction::new("1", InteractionKind::Autocomplete, "tag", "7")
            .with_options(json!([{ "name": "key", "type": 3, "value": "ru", "focused": true }]))
            .with_responder(responder.clone()),
    )
    .await
    .unwrap();

    assert_eq!(
        responder.choices(),
        vec![vec![AutocompleteChoice::new("tag:ru", "ru")]]
    );
}

#[tokio::test]
async fn test_user_validations_load_and_reload() {
    let fixture = Fixture::new();
    write(&fixture.commands(), "general/ping.toml", PING);
    write(&fixture.validations(), "a_block.toml", "default = \"block\"\n");
    write(&fixture.validations(), "b_broken.toml", "default = 12\n");

    let pings = fixture.pings.clone();
    let kit = CommandKit::builder()
        .client(fixture.client.clone())
        .commands_path(fixture.commands())
        .validations_path(fixture.validations())
        .skip_built_in_validations(true)
        .handler(
            "general.ping",
            handler_fn(move |_ctx| {
                let pings = pings.clone();
                async move {
                    pings.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .validator(
            "block",
            validation_fn("block", |_args| async { ValidationOutcome::Veto }),
        )
        .build()
        .unwrap();
    kit.init().await.unwrap();

    let ping = || Interaction::new("1", InteractionKind::ChatInput, "ping", "7");

    assert_eq!(kit.validations(), vec!["block".to_string()]);
    assert_eq!(
        kit.handle_interaction(ping()).await.unwrap(),
        Dispatch::Vetoed {
            by: "block".to_string()
        }
    );

    fs::remove_file(fixture.validations().join("a_block.toml")).unwrap();
    kit.reload_validations().await.unwrap();

    assert_eq!(kit.handle_interaction(ping()).await.unwrap(), Dispatch::Handled);
    assert_eq!(fixture.pings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dev_only_command_is_local_and_guarded() {
    let fixture = Fixture::new();
    write(
        &fixture.commands(),
        "dev/deploy.toml",
        r#"
run = "general.ping"

[data]
name = "deploy"
description = "Deploy"

[options]
devOnly = true
"#,
    );
    let pings = fixture.pings.clone();
    let kit = CommandKit::builder()
        .client(fixture.client.clone())
        .commands_path(fixture.commands())
        .handler(
            "general.ping",
            handler_fn(move |_ctx| {
                let pings = pings.clone();
                async move {
                    pings.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .dev_user_ids(vec!["42".to_string()])
        .build()
        .unwrap();
    kit.init().await.unwrap();

    let report = kit.on_ready().await.unwrap();
    assert_eq!(report.changes(), 0);
    assert!(fixture.service.mutations().is_empty());

    let responder = Arc::new(RecordingResponder::default());
    let dispatch = kit
        .handle_interaction(
            Interaction::new("1", InteractionKind::ChatInput, "deploy", "7")
                .with_responder(responder.clone()),
        )
        .await
        .unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Vetoed {
            by: "dev_only".to_string()
        }
    );
    assert!(responder.replies()[0].ephemeral);

    let allowed = kit
        .handle_interaction(Interaction::new("2", InteractionKind::ChatInput, "deploy", "42"))
        .await
        .unwrap();
    assert_eq!(allowed, Dispatch::Handled);
    assert_eq!(fixture.pings.load(Ordering::SeqCst), 1);
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("statbank").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("transfer"))
        .stdout(predicate::str::contains("describe"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn describe_requires_table() {
    let mut cmd = Command::cargo_bin("statbank").expect("Binary exists");
    cmd.arg("describe").arg("--config").arg("statbank.yaml");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--table"));
}

#[test]
fn transfer_fails_on_missing_config() {
    let mut cmd = Command::cargo_bin("statbank").expect("Binary exists");
    cmd.arg("transfer")
        .arg("--config")
        .arg("does-not-exist.yaml")
        .env("STATBANK_ENCRYPTION_TOKEN", "service-token");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn transfer_without_transfers_fails_before_prompting() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"statbank:\n  environment: TEST\n  encryption_url: http://127.0.0.1:9/encrypt\n  loaduser: LAST360\n",
    )
    .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("statbank").expect("Binary exists");
    cmd.arg("transfer")
        .arg("--config")
        .arg(config.path())
        .env("STATBANK_ENCRYPTION_TOKEN", "service-token");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no transfers configured"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use statbank::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Validate {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

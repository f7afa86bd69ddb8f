// `coiisy replay`: drive a session through a scripted event stream.
//
// Each script line is one JSON object:
//   {"status": "connected"}        gateway status change
//   {"connect": true}              user-initiated connect
//   {"reconnect": true}            user-initiated reconnect
//   {"send": "hello"}              compose and send a chat message
//   {"type": "chat_message", ...}  any server message

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use coiisy_client::config::ClientConfig;
use coiisy_client::gateway::{ConnectionStatus, LoopbackGateway};
use coiisy_client::orchestrator::{SessionView, SyncOrchestrator};
use coiisy_client::store::SessionStore;
use coiisy_common::protocol::ws::{ClientMessage, ServerMessage};
use coiisy_common::session::SessionId;
use coiisy_common::types::SessionIdentity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{format_message_line, format_participant_line, open_store};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Session id or session URL.
    pub session: String,

    /// JSON-lines event script.
    pub script: PathBuf,

    /// Snapshot directory (defaults to the configured storage dir).
    #[arg(long)]
    store: Option<PathBuf>,

    /// User id to join as (overrides config).
    #[arg(long, requires = "name")]
    user_id: Option<String>,

    /// Display name to join as (overrides config).
    #[arg(long, requires = "user_id")]
    name: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Status { status: ConnectionStatus },
    Connect { connect: bool },
    Reconnect { reconnect: bool },
    Send { send: String },
    Server(ServerMessage),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    #[serde(flatten)]
    pub view: SessionView,
    pub steps: usize,
    pub sent: Vec<ClientMessage>,
}

pub fn run(args: ReplayArgs, config: &ClientConfig) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let identity = resolve_identity(&args, config);
    if identity.is_none() {
        output::print_warning(
            format,
            "NO_IDENTITY",
            "no identity configured; send steps will be skipped",
        );
    }

    let result = open_store(args.store.clone(), config)
        .and_then(|store| replay(&args.session, &args.script, store, identity));
    match result {
        Ok(report) => {
            output::print_output(format, &report, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn resolve_identity(args: &ReplayArgs, config: &ClientConfig) -> Option<SessionIdentity> {
    match (&args.user_id, &args.name) {
        (Some(user_id), Some(name)) => Some(SessionIdentity::new(user_id.clone(), name.clone())),
        _ => config.identity(),
    }
}

pub fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptStep>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("script line {} is not a valid step", index + 1))
        })
        .collect()
}

/// Bind `session`, apply every script step and report the resulting view.
pub fn replay<S>(
    session: &str,
    script: &Path,
    store: S,
    identity: Option<SessionIdentity>,
) -> anyhow::Result<ReplayReport>
where
    S: SessionStore,
{
    let session_id = SessionId::from_user_input(session)
        .with_context(|| format!("invalid session `{session}`"))?;
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let steps = parse_script(&text)?;

    let gateway = LoopbackGateway::new();
    let mut orchestrator =
        SyncOrchestrator::new(gateway.clone(), store, move |_: &SessionId| identity.clone());
    orchestrator.bind_session(session_id.clone());
    info!(session_id = %session_id, steps = steps.len(), "replaying script");

    let total = steps.len();
    for (index, step) in steps.into_iter().enumerate() {
        apply_step(&mut orchestrator, &gateway, index + 1, step);
        orchestrator.pump();
    }

    Ok(ReplayReport { view: orchestrator.view(), steps: total, sent: gateway.take_sent() })
}

fn apply_step<S: SessionStore>(
    orchestrator: &mut SyncOrchestrator<LoopbackGateway, S>,
    gateway: &LoopbackGateway,
    line: usize,
    step: ScriptStep,
) {
    match step {
        ScriptStep::Status { status } => {
            gateway.set_status(status);
        }
        ScriptStep::Connect { connect: true } => {
            if !orchestrator.connect() {
                debug!(line, state = %orchestrator.state(), "connect ignored");
            }
        }
        ScriptStep::Reconnect { reconnect: true } => {
            if !orchestrator.reconnect() {
                debug!(line, state = %orchestrator.state(), "reconnect ignored");
            }
        }
        ScriptStep::Connect { connect: false } | ScriptStep::Reconnect { reconnect: false } => {}
        ScriptStep::Send { send } => {
            if orchestrator.send_message(&send).is_none() {
                warn!(line, "send skipped: no identity for this session");
            }
        }
        ScriptStep::Server(message) => {
            gateway.deliver(message);
        }
    }
}

fn format_human(report: &ReplayReport) -> String {
    let view = &report.view;
    let mut lines = vec![format!(
        "Session {}: {} ({}) after {} steps",
        view.session_id.as_deref().unwrap_or("-"),
        view.sync_state,
        view.status,
        report.steps
    )];
    match &view.identity {
        Some(identity) => {
            lines.push(format!("Identity: {} ({})", identity.display_name, identity.user_id));
        }
        None => lines.push("Identity: none".into()),
    }

    lines.push(format!("Messages ({}):", view.messages.len()));
    lines.extend(view.messages.iter().map(format_message_line));
    lines.push(format!("Participants ({}):", view.roster.len()));
    lines.extend(view.roster.iter().map(format_participant_line));

    let sent: Vec<&str> = report.sent.iter().map(ClientMessage::message_type).collect();
    lines.push(format!("Sent ({}): {}", sent.len(), sent.join(", ")));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use coiisy_client::orchestrator::SyncState;
    use coiisy_client::store::FileSessionStore;
    use coiisy_common::types::DeliveryState;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"
{"connect": true}
{"status": "connected"}
{"type": "session_history", "messages": [{"messageId": "h-1", "sessionId": "room-1", "userId": "u2", "fullName": "Bob", "content": "welcome", "createdAt": "2024-05-01T10:00:00Z"}]}
{"type": "user_joined_session", "participants": [{"userId": "u2", "fullName": "Bob", "isOnline": false}, {"userId": "u1", "fullName": "Alice", "isOnline": true}]}
{"send": "hi Bob"}
{"type": "user_disconnected", "userId": "u2"}
"#;

    fn write_script(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("script.jsonl");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn parses_each_step_shape() {
        let steps = parse_script(SCRIPT).unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], ScriptStep::Connect { connect: true });
        assert_eq!(steps[1], ScriptStep::Status { status: ConnectionStatus::Connected });
        assert!(matches!(steps[2], ScriptStep::Server(ServerMessage::SessionHistory { .. })));
        assert_eq!(steps[4], ScriptStep::Send { send: "hi Bob".into() });
        assert!(matches!(steps[5], ScriptStep::Server(ServerMessage::UserDisconnected { .. })));
    }

    #[test]
    fn bad_line_reports_its_number() {
        let error = parse_script("{\"connect\": true}\n\n{\"bogus\": 1}\n").unwrap_err();
        assert!(error.to_string().contains("script line 3"));
    }

    #[test]
    fn replay_builds_view_and_records_outbound_traffic() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, SCRIPT);
        let store = FileSessionStore::new(dir.path()).unwrap();

        let report = replay(
            "https://coiisy.example/session/room-1",
            &script,
            store.clone(),
            Some(SessionIdentity::new("u1", "Alice")),
        )
        .unwrap();

        assert_eq!(report.steps, 6);
        assert_eq!(report.view.session_id.as_deref(), Some("room-1"));
        assert_eq!(report.view.sync_state, SyncState::ConnectedAnnounced);
        assert_eq!(report.view.messages.len(), 2);
        assert_eq!(report.view.messages[1].delivery_state, DeliveryState::Sending);
        assert_eq!(report.view.roster[0].user_id, "u1");
        assert!(!report.view.roster[1].is_online);

        let sent: Vec<&str> = report.sent.iter().map(ClientMessage::message_type).collect();
        assert_eq!(sent, vec!["AUTH", "USER_JOINED", "CHAT"]);

        let session_id = SessionId::parse("room-1").unwrap();
        let snapshot = store.read(&session_id).unwrap().unwrap();
        assert_eq!(snapshot.messages.len(), 1);

        let human = format_human(&report);
        assert!(human.contains("connected_announced (connected)"));
        assert!(human.contains("hi Bob (sending)"));
        assert!(human.contains("Sent (3): AUTH, USER_JOINED, CHAT"));
    }

    #[test]
    fn replay_without_identity_never_announces() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, SCRIPT);
        let store = FileSessionStore::new(dir.path()).unwrap();

        let report = replay("room-1", &script, store, None).unwrap();

        assert_eq!(report.view.sync_state, SyncState::ConnectedUnauthenticated);
        assert!(report.sent.is_empty());
        assert_eq!(report.view.messages.len(), 1);
        assert!(format_human(&report).contains("Identity: none"));
    }

    #[test]
    fn invalid_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "");
        let store = FileSessionStore::new(dir.path()).unwrap();
        let error = replay("..", &script, store, None).unwrap_err();
        assert!(format!("{error:#}").contains("invalid session"));
    }

    #[test]
    fn json_report_flattens_the_view() {
        let report = ReplayReport { view: SessionView::default(), steps: 0, sent: Vec::new() };
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &report, format_human).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["sync_state"], "unbound");
        assert_eq!(parsed["status"], "idle");
        assert_eq!(parsed["steps"], 0);
        assert!(parsed["sent"].as_array().unwrap().is_empty());
    }
}

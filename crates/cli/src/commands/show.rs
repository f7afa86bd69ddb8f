// `coiisy show`: print the persisted snapshot of a session.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use coiisy_client::config::ClientConfig;
use coiisy_client::store::SessionStore;
use coiisy_common::session::SessionId;
use coiisy_common::types::SessionSnapshot;

use super::{format_message_line, open_store};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Session id or session URL.
    pub session: String,

    /// Snapshot directory (defaults to the configured storage dir).
    #[arg(long)]
    store: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ShowArgs, config: &ClientConfig) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = open_store(args.store, config).and_then(|store| load(&store, &args.session));
    match result {
        Ok(snapshot) => {
            output::print_output(format, &snapshot, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

pub fn load<S: SessionStore>(store: &S, session: &str) -> anyhow::Result<SessionSnapshot> {
    let session_id = SessionId::from_user_input(session)
        .with_context(|| format!("invalid session `{session}`"))?;
    store
        .read(&session_id)?
        .with_context(|| format!("no snapshot stored for session `{session_id}`"))
}

fn format_human(snapshot: &SessionSnapshot) -> String {
    let mut lines = vec![format!("Session {}", snapshot.session_id)];
    if let Some(identity) = &snapshot.identity {
        lines.push(format!("Identity: {} ({})", identity.display_name, identity.user_id));
    }
    if snapshot.messages.is_empty() {
        lines.push("No messages.".into());
    } else {
        lines.push(format!("Messages ({}):", snapshot.messages.len()));
        lines.extend(snapshot.messages.iter().map(format_message_line));
    }
    lines.join("\n")
}

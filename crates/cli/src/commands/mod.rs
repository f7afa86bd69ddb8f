// CLI subcommand dispatch.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use coiisy_client::config::ClientConfig;
use coiisy_client::store::FileSessionStore;
use coiisy_common::types::{ChatMessage, DeliveryState, Participant};

pub mod replay;
pub mod show;

#[derive(Subcommand)]
pub enum Command {
    /// Drive a session through a JSON-lines event script
    Replay(replay::ReplayArgs),
    /// Print the persisted snapshot of a session
    Show(show::ShowArgs),
}

pub fn run(cmd: Command, config: &ClientConfig) -> anyhow::Result<()> {
    match cmd {
        Command::Replay(args) => replay::run(args, config),
        Command::Show(args) => show::run(args, config),
    }
}

/// Open the snapshot store at `--store`, falling back to the configured root.
pub(crate) fn open_store(
    store_dir: Option<PathBuf>,
    config: &ClientConfig,
) -> anyhow::Result<FileSessionStore> {
    let root = store_dir
        .or_else(|| config.storage_root())
        .context("no storage directory: pass --store or set storage_dir in config")?;
    FileSessionStore::new(&root)
}

pub(crate) fn format_message_line(message: &ChatMessage) -> String {
    let marker = match message.delivery_state {
        DeliveryState::Sending => " (sending)",
        DeliveryState::Sent => "",
    };
    format!(
        "  [{}] {}: {}{marker}",
        message.created_at.format("%H:%M:%S"),
        message.author_display_name,
        message.content
    )
}

pub(crate) fn format_participant_line(participant: &Participant) -> String {
    let dot = if participant.is_online { '●' } else { '○' };
    format!(
        "  {dot} [{}] {} ({})",
        participant.initials(),
        participant.display_name,
        participant.user_id
    )
}

// Output formatting for `coiisy` commands.
//
// Reports go to stdout: human text on a TTY, one JSON object per line when
// piped or with `--json`. Errors and warnings go to stderr in the same format.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// JSON when `--json` was passed or stdout is not a terminal.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Print a command report to stdout.
pub fn print_output<T, F>(format: OutputFormat, report: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, report, human_fn)
}

/// Write a command report to `writer`; `human_fn` only runs for `Human`.
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    report: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(report)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, report).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

// ── Diagnostics ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Error => ANSI_RED,
            Self::Warning => ANSI_YELLOW,
        }
    }
}

fn render_diagnostic(
    format: OutputFormat,
    severity: Severity,
    code: &str,
    message: &str,
    is_tty: bool,
) -> String {
    match format {
        OutputFormat::Human if is_tty => {
            format!("{}{}:{ANSI_RESET} {message}", severity.color(), severity.label())
        }
        OutputFormat::Human => format!("{}: {message}", severity.label()),
        OutputFormat::Json => {
            let mut body = serde_json::Map::new();
            body.insert(
                severity.label().to_string(),
                serde_json::json!({ "code": code, "message": message }),
            );
            serde_json::Value::Object(body).to_string()
        }
    }
}

fn print_diagnostic(format: OutputFormat, severity: Severity, code: &str, message: &str) {
    let line = render_diagnostic(format, severity, code, message, io::stderr().is_terminal());
    let _ = writeln!(io::stderr().lock(), "{line}");
}

pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_diagnostic(format, Severity::Warning, code, message);
}

/// Print a command failure with a stable code and a next step for the user.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_diagnostic(format, Severity::Error, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");
    let lower = message.to_ascii_lowercase();

    if lower.contains("invalid session") {
        return (
            "INVALID_SESSION",
            format!("{message}. Pass a session id or a session URL like https://host/chat/<id>"),
        );
    }

    if lower.contains("no snapshot stored") {
        let session = backticked(&message).unwrap_or("<session>");
        return (
            "SESSION_NOT_FOUND",
            format!("No saved state for session {session}. Run: coiisy replay {session} <script>"),
        );
    }

    if lower.contains("script line") || lower.contains("failed to read script") {
        return ("INVALID_SCRIPT", message);
    }

    if lower.contains("no storage directory") {
        return (
            "NO_STORAGE_DIR",
            "No storage directory. Pass --store <dir> or set storage_dir in ~/.coiisy/config.toml"
                .to_string(),
        );
    }

    if lower.contains("snapshot") || lower.contains("permission denied") {
        return ("STORE_ERROR", message);
    }

    ("ERROR", message)
}

/// First non-empty span between backticks.
fn backticked(message: &str) -> Option<&str> {
    let candidate = message.split('`').nth(1)?.trim();
    (!candidate.is_empty()).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coiisy_common::types::{SessionIdentity, SessionSnapshot};

    fn snapshot() -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::empty("room-1");
        snapshot.identity = Some(SessionIdentity::new("u1", "Alice"));
        snapshot
    }

    #[test]
    fn piped_stdout_gets_json() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn json_report_is_one_line() {
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &snapshot(), |_| {
            unreachable!("human renderer is not used for JSON")
        })
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        let parsed: SessionSnapshot = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed, snapshot());
    }

    #[test]
    fn human_report_uses_renderer() {
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &snapshot(), |s| {
            format!("Session {}", s.session_id)
        })
        .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Session room-1\n");
    }

    #[test]
    fn diagnostics_render_per_format() {
        let plain = render_diagnostic(OutputFormat::Human, Severity::Warning, "W", "careful", false);
        assert_eq!(plain, "warning: careful");

        let colored = render_diagnostic(OutputFormat::Human, Severity::Error, "E", "boom", true);
        assert_eq!(colored, format!("{ANSI_RED}error:{ANSI_RESET} boom"));

        let json = render_diagnostic(OutputFormat::Json, Severity::Warning, "NO_IDENTITY", "x", true);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["warning"]["code"], "NO_IDENTITY");
        assert_eq!(parsed["warning"]["message"], "x");
    }

    #[test]
    fn invalid_session_points_at_url_form() {
        let err = anyhow::anyhow!("session id is empty").context("invalid session ``");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "INVALID_SESSION");
        assert!(message.contains("session URL"));
    }

    #[test]
    fn missing_snapshot_suggests_replay() {
        let err = anyhow::anyhow!("no snapshot stored for session `room-7`");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "SESSION_NOT_FOUND");
        assert!(message.contains("coiisy replay room-7"));
    }

    #[test]
    fn bad_script_keeps_line_number() {
        let err = anyhow::anyhow!("expected value").context("script line 4 is not a valid step");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "INVALID_SCRIPT");
        assert!(message.starts_with("script line 4"));
    }

    #[test]
    fn missing_storage_dir_mentions_flag() {
        let err = anyhow::anyhow!("no storage directory: pass --store or set storage_dir in config");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "NO_STORAGE_DIR");
        assert!(message.contains("--store"));
    }

    #[test]
    fn store_failures_keep_full_chain() {
        let err = anyhow::anyhow!("disk full").context("failed to write session snapshot");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "STORE_ERROR");
        assert_eq!(message, "failed to write session snapshot: disk full");

        let (code, _) = actionable_error(&anyhow::anyhow!("something else"));
        assert_eq!(code, "ERROR");
    }

    #[test]
    fn backticked_span() {
        assert_eq!(backticked("session `abc` missing"), Some("abc"));
        assert_eq!(backticked("no quotes here"), None);
        assert_eq!(backticked("empty `` name"), None);
    }
}

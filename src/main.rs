mod aggregate;
mod announcements;
mod bulk;
mod config;
mod dates;
mod db;
mod error;
mod grading;
mod ipc;
mod logging;
mod marks;
mod reports;
mod students;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};

/// Best-effort id recovery so a malformed request still gets a correlated reply.
fn bad_json_response(line: &str, e: &serde_json::Error) -> serde_json::Value {
    let id = serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
        .unwrap_or_default();
    ipc::err(&id, "bad_json", e.to_string(), None)
}

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::parse();
    logging::init_tracing(cfg.log_level.as_deref(), cfg.log_json)
        .context("failed to initialise logging")?;

    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace.as_ref() {
        let conn = db::open_db(path)
            .with_context(|| format!("failed to open workspace {}", path.display()))?;
        state.workspace = Some(path.clone());
        state.db = Some(conn);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "schoold ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable request");
                bad_json_response(&line, &e)
            }
        };

        writeln!(stdout, "{}", resp).context("failed to write response")?;
        stdout.flush().context("failed to flush stdout")?;
    }

    Ok(())
}

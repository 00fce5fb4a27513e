//! evbridge demo host.
//!
//! Stands in for both sides of the bridge: it plays the host application by
//! registering logging listeners, and the native engine by reading event
//! lines from stdin.
//!
//! Input, one command per line:
//! - `global <app_type> <json>` / `session <session_id> <json>`: wire-shape push
//! - `listen global:<app_type>` / `listen session:<session_id>`
//! - `stop global:<app_type>` / `stop session:<session_id>`
//! - `current <session_id>`, `list`, `metrics`

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use evbridge_core::error::{BridgeError, Result};
use evbridge_core::protocol::{GlobalEvent, SessionEvent};
use evbridge_host::{config, Bridge, GlobalListener, SessionListener};

const DEFAULT_CONFIG: &str = "evbridge.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("EVBRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = if std::path::Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        config::BridgeConfig::default()
    };

    let bridge = Arc::new(Bridge::new(&cfg));
    bridge.attach_engine();

    let app_types = if cfg.app_types.is_empty() {
        vec![evbridge_host::cm::CM_APP_TYPE.to_string()]
    } else {
        cfg.app_types.clone()
    };
    for app_type in &app_types {
        listen(&bridge, "global", app_type);
    }

    tracing::info!(channels = ?bridge.list_channels(), "evbridge-host ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BridgeError::Internal(format!("stdin read failed: {e}")))?
    {
        handle_line(&bridge, line.trim());
    }

    println!("{}", bridge.metrics().render());
    bridge.shutdown();
    Ok(())
}

fn handle_line(bridge: &Bridge, line: &str) {
    let mut parts = line.splitn(3, ' ');
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();

    match cmd {
        "" => {}
        "global" => {
            let ok = bridge.push_global_wire(arg, rest);
            tracing::info!(app_type = %arg, dispatched = ok, "global push");
        }
        "session" => {
            let ok = bridge.push_session_wire(arg, rest);
            tracing::info!(session = %arg, dispatched = ok, "session push");
        }
        "listen" | "stop" => match arg.split_once(':') {
            Some((scope, name)) if cmd == "listen" => listen(bridge, scope, name),
            Some(("global", name)) => {
                bridge.stop_global_listening(name);
            }
            Some(("session", name)) => {
                bridge.stop_session_listening(name);
            }
            _ => tracing::warn!(%arg, "expected global:<app_type> or session:<session_id>"),
        },
        "current" => match bridge.set_current_session(arg) {
            Ok(()) => tracing::info!(session = %arg, "current session set"),
            Err(e) => tracing::warn!(error = %e, "current session rejected"),
        },
        "list" => println!("{}", bridge.list_channels_json()),
        "metrics" => println!("{}", bridge.metrics().render()),
        other => tracing::warn!(command = %other, "unknown command"),
    }
}

fn listen(bridge: &Bridge, scope: &str, name: &str) {
    let id = format!("demo:{name}");
    let ok = match scope {
        "global" => bridge.start_global_listening(
            name,
            Arc::new(GlobalListener::from_fn(id, |ev: GlobalEvent| {
                tracing::info!(event = ?ev, "global event");
                Ok(())
            })),
        ),
        "session" => bridge.start_session_listening(
            name,
            Arc::new(SessionListener::from_fn(id, |ev: SessionEvent| {
                tracing::info!(event = ?ev, "session event");
                Ok(())
            })),
        ),
        _ => false,
    };
    if !ok {
        tracing::warn!(%scope, %name, "listen failed");
    }
}

//! Command dispatch: bridges CLI args -> SyncStore -> output formatting.

pub mod config_cmd;
pub mod export;
pub mod fetch;
pub mod watch;

use std::sync::Arc;

use telesync_api::{HttpFetcher, ReconnectConfig, TransportConfig, WebSocketChannel};
use telesync_config::ResolvedProfile;
use telesync_core::{SyncConfig, SyncStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    resolved: &ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Fetch(args) => {
            let store = build_store(resolved, one_shot(&resolved.sync))?;
            fetch::handle(&store, args, global).await
        }
        Command::Export(args) => {
            let store = build_store(resolved, one_shot(&resolved.sync))?;
            export::handle(&store, args, global).await
        }
        Command::Watch(args) => {
            let mut sync = resolved.sync.clone();
            if let Some(limit) = args.limit {
                sync.default_limit = limit;
            }
            let store = build_store(resolved, sync)?;
            watch::handle(store, args, global).await
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Wire the HTTP fetcher and WebSocket channel into a store.
fn build_store(resolved: &ResolvedProfile, sync: SyncConfig) -> Result<SyncStore, CliError> {
    let transport = TransportConfig {
        timeout: resolved.timeout,
        danger_accept_invalid_certs: resolved.insecure,
    };
    let fetcher = HttpFetcher::new(resolved.server.clone(), &transport)?;
    let channel = WebSocketChannel::new(resolved.push_url.clone(), ReconnectConfig::default());

    Ok(SyncStore::new(sync, Arc::new(fetcher), Arc::new(channel)))
}

/// Single-pull commands exit right after the pull, so they never schedule retries.
fn one_shot(sync: &SyncConfig) -> SyncConfig {
    SyncConfig {
        max_retries: 0,
        ..sync.clone()
    }
}

//! `fetch`: one pull, printed in the selected format.

use telesync_core::SyncStore;
use tracing::debug;

use crate::cli::{FetchArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(store: &SyncStore, args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let limit = args.limit.unwrap_or(store.config().default_limit);
    store.refresh(limit).await?;

    let snapshot = store.current();
    debug!(limit, points = snapshot.total_points(), "fetched snapshot");

    let rendered = output::render_snapshot(global.output_format(), &snapshot)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

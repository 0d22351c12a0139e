//! `watch`: keep the store in sync and print a status record per change.
//!
//! Reads one-letter commands from stdin: `p` toggles live/paused, `r`
//! retries the pull and reopens a push channel that failed to open, `s`
//! prints the status, `q` quits. EOF on stdin keeps watching
//! until Ctrl-C.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use telesync_core::{Mode, SyncState, SyncStore};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output::{self, StatusView};

/// A line read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Toggle,
    Retry,
    Status,
    Quit,
    Blank,
    Unknown,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" | "live" => Self::Toggle,
            "r" | "retry" => Self::Retry,
            "s" | "status" => Self::Status,
            "q" | "quit" | "exit" => Self::Quit,
            "" => Self::Blank,
            _ => Self::Unknown,
        }
    }
}

struct Printer<'a> {
    global: &'a GlobalOpts,
    color: bool,
    max_retries: u32,
    last: Option<String>,
}

impl Printer<'_> {
    /// Print the state unless it renders identically to the last record.
    fn changed(&mut self, state: &SyncState) -> Result<(), CliError> {
        let rendered = self.render(state)?;
        if self.last.as_deref() != Some(rendered.as_str()) {
            output::print_output(&rendered, self.global.quiet);
            self.last = Some(rendered);
        }
        Ok(())
    }

    fn always(&mut self, state: &SyncState) -> Result<(), CliError> {
        let rendered = self.render(state)?;
        output::print_output(&rendered, false);
        self.last = Some(rendered);
        Ok(())
    }

    fn render(&self, state: &SyncState) -> Result<String, CliError> {
        let status = StatusView::from_state(state, self.max_retries);
        output::render_status(self.global.output_format(), &status, self.color)
    }
}

pub async fn handle(store: SyncStore, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut printer = Printer {
        global,
        color: output::should_color(global.color_mode()),
        max_retries: store.config().max_retries,
        last: None,
    };

    if args.paused {
        store.toggle_live();
    }
    store.initialize().await;

    let mut states = store.stream();
    printer.changed(&states.latest())?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = states.changed() => {
                let Some(state) = changed else { break };
                printer.changed(&state)?;
            }
            line = stdin.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    debug!("stdin closed, watching until interrupted");
                    stdin_open = false;
                    continue;
                };
                match Input::parse(&line) {
                    Input::Toggle => {
                        let mode = store.toggle_live();
                        if !global.quiet {
                            eprintln!("{}", if mode == Mode::Live { "resumed" } else { "paused" });
                        }
                    }
                    Input::Retry => {
                        // The outcome is reported through the state stream.
                        if let Err(e) = store.recover().await {
                            debug!(error = %e, "manual recovery failed");
                        }
                    }
                    Input::Status => printer.always(&store.state())?,
                    Input::Quit => break,
                    Input::Blank => {}
                    Input::Unknown => {
                        eprintln!("unknown command {:?} (p = toggle live, r = retry, s = status, q = quit)", line.trim());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    store.disconnect().await;
    Ok(())
}

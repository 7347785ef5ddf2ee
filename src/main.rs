mod api;
mod app;
mod cli;
mod config;
mod filter;
mod input;
mod model;
mod poll;
mod ui;

use anyhow::{Context, Result};
use api::SnapshotClient;
use app::{App, AppCommand};
use clap::Parser;
use cli::CliArgs;
use config::{FilterStore, SavedFilters};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use model::{ClusterSelector, FilterCriteria};
use poll::{PollEvent, Poller};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let store = FilterStore::discover();
    let criteria = initial_criteria(&args, &store);

    let client = SnapshotClient::new(
        args.endpoint.clone(),
        Duration::from_millis(args.timeout_ms.max(100)),
    )?;
    let mut app = App::new(args.endpoint.clone(), criteria);

    run(&mut app, client, &store, args.poll_ms.max(250)).await
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    // The TUI owns stdout, so diagnostics go nowhere unless redirected.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::sink)
        .try_init();

    Ok(())
}

fn initial_criteria(args: &CliArgs, store: &FilterStore) -> FilterCriteria {
    let saved = if args.no_restore {
        None
    } else {
        store.load().unwrap_or_else(|error| {
            warn!("ignoring unreadable saved filters: {error:#}");
            None
        })
    }
    .unwrap_or_default();

    FilterCriteria {
        cluster: args
            .cluster
            .as_deref()
            .map(ClusterSelector::from_token)
            .unwrap_or_default(),
        search: saved.search,
        failed_only: args.failed_only || saved.failed_only,
    }
}

async fn run(
    app: &mut App,
    client: SnapshotClient,
    store: &FilterStore,
    poll_ms: u64,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, client, store, poll_ms).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    client: SnapshotClient,
    store: &FilterStore,
    poll_ms: u64,
) -> Result<()> {
    let (poll_tx, mut poll_rx) = mpsc::unbounded_channel::<PollEvent>();
    let poller = Poller::spawn(client, Duration::from_millis(poll_ms), poll_tx);
    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            let command = app.apply_action(action);
                            if command == AppCommand::PersistFilters {
                                persist_filters(store, app);
                            }
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = poll_rx.recv() => {
                match maybe_event {
                    Some(event) => app.apply_poll_event(event),
                    // Only reachable once the sender is gone, i.e. at teardown.
                    None => break,
                }
            }
        }
    }

    poller.stop();
    Ok(())
}

fn persist_filters(store: &FilterStore, app: &App) {
    let filters = SavedFilters {
        search: app.criteria().search.clone(),
        failed_only: app.criteria().failed_only,
    };
    if let Err(error) = store.save(&filters) {
        warn!("failed to persist filters: {error:#}");
    }
}

use chrono::Local;
use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use lead_api::HttpLeadApi;
use lead_desk::{
    app::App,
    config::{init_logging, Args, Config},
    input::{handle_input, KeyOutcome},
    manager::MANAGER_REFRESH_INTERVAL,
    push::push_loop,
    runtime::Runtime,
    stats::STATS_POLL_INTERVAL,
    ui::render_ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, io, sync::Arc};
use tokio::sync::mpsc;
use tracing::info;

const EVENT_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_args(Args::parse())?;
    init_logging();
    info!(
        "lead_desk_start: portal={} api={}",
        config.portal, config.api_url
    );

    let api = Arc::new(HttpLeadApi::new(&config.api_url)?);
    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    if let Some(push) = config.push.clone() {
        let push_tx = tx.clone();
        tokio::spawn(async move {
            push_loop(push, push_tx).await;
        });
    }
    let runtime = Runtime::new(api, tx, config.sound);
    let mut app = App::new(&config, Local::now().date_naive());

    runtime.spawn_all(app.startup_tasks());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut events = EventStream::new();
    let start = tokio::time::Instant::now();
    let mut stats_ticker =
        tokio::time::interval_at(start + STATS_POLL_INTERVAL, STATS_POLL_INTERVAL);
    let mut manager_ticker =
        tokio::time::interval_at(start + MANAGER_REFRESH_INTERVAL, MANAGER_REFRESH_INTERVAL);

    loop {
        terminal.draw(|frame| render_ui(frame, &app))?;
        tokio::select! {
            _ = stats_ticker.tick() => {
                runtime.spawn_all(app.on_stats_tick());
            }
            _ = manager_ticker.tick() => {
                runtime.spawn_all(app.on_manager_tick());
            }
            Some(event) = rx.recv() => {
                runtime.spawn_all(app.apply_event(event));
            }
            maybe_event = events.next() => {
                if let Some(Ok(event)) = maybe_event {
                    match handle_input(event, &mut app) {
                        KeyOutcome::Quit => break,
                        KeyOutcome::Continue(tasks) => runtime.spawn_all(tasks),
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

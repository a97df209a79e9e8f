use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

use dogewatch::api::{lookup_address, HttpIndexerApi, IndexerApi};
use dogewatch::app::{App, InputMode, Tab};
use dogewatch::config;
use dogewatch::monitor::{Monitor, MonitorCommand, MonitorConfig, MonitorView};
use dogewatch::types::AppEvent;
use dogewatch::ui;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = config::load().context("Failed to load configuration")?;
    log::info!("starting dogewatch against {}", cfg.indexer_url);

    let api: Arc<dyn IndexerApi> = Arc::new(HttpIndexerApi::new(
        cfg.indexer_url.clone(),
        cfg.request_timeout_ms,
    ));

    // monitor task + channels
    let (cmd_tx, cmd_rx) = unbounded_channel::<MonitorCommand>();
    let (monitor, view_rx) = Monitor::new(api.clone(), MonitorConfig::from(&cfg));
    let monitor_task = tokio::spawn(monitor.run(cmd_rx));

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (ev_tx, ev_rx) = unbounded_channel::<AppEvent>();
    let mut app = App::new(cfg.max_blocks_display);

    let res = run_loop(
        &mut app,
        &mut terminal,
        api,
        view_rx,
        ev_tx,
        ev_rx,
        cmd_tx.clone(),
    )
    .await;

    // cleanup
    let _ = cmd_tx.send(MonitorCommand::Shutdown);
    monitor_task.abort();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    api: Arc<dyn IndexerApi>,
    mut view_rx: watch::Receiver<MonitorView>,
    ev_tx: UnboundedSender<AppEvent>,
    mut ev_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<MonitorCommand>,
) -> Result<()> {
    loop {
        // latest projection from the monitor task
        if view_rx.has_changed().unwrap_or(false) {
            app.on_view(view_rx.borrow_and_update().clone());
        }

        // results from spawned one-shot tasks
        while let Ok(ev) = ev_rx.try_recv() {
            app.on_event(ev);
        }

        // submitted address lookups run off the UI loop
        if let Some(address) = app.take_pending_lookup() {
            let api = api.clone();
            let tx = ev_tx.clone();
            tokio::spawn(async move {
                let result = lookup_address(api.as_ref(), &address).await;
                let _ = tx.send(AppEvent::lookup_finished(address, result));
            });
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    handle_key(app, k, &cmd_tx);
                }
            }
        }

        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, k: KeyEvent, cmd_tx: &UnboundedSender<MonitorCommand>) {
    // Address input mode captures everything except control chords
    if app.input_mode() == InputMode::Address {
        match k.code {
            KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => {
                app.address_add_char(c)
            }
            KeyCode::Backspace => app.address_backspace(),
            KeyCode::Enter => app.submit_address(),
            KeyCode::Esc => app.cancel_address_input(),
            _ => {}
        }
        return;
    }

    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Tab => app.next_tab(),
        KeyCode::Char('r') => {
            let _ = cmd_tx.send(MonitorCommand::ManualRetry);
        }
        KeyCode::Char('i') | KeyCode::Enter if app.tab() == Tab::Address => {
            app.start_address_input()
        }
        KeyCode::Up | KeyCode::Char('k') => app.up(),
        KeyCode::Down | KeyCode::Char('j') => app.down(),
        _ => {}
    }
}

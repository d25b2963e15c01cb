mod api_client;
mod app;
mod catalog;
mod clean;
mod config;
mod dom;
mod error;
mod globals;
mod images;
mod links;
mod margin_tables;
mod overlay;
mod pipeline;
mod render_md;
mod server;
mod snippets;
mod ui;
mod upstream;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dotenvy::dotenv;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Position, Rect},
};
use std::fs::File;
use std::io;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use api_client::ApiClient;
use app::{App, AppMessage, AppState};
use catalog::ChapterCatalog;
use config::{Cli, Command, ReaderConfig, ServerConfig, parse_base_url};
use server::ChapterSummary;
use ui::{draw_ui, overlay_rect};

/// Lines moved per PgUp/PgDn or wheel notch
const SCROLL_STEP: i32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();
            globals::init_globals()?;
            server::serve(ServerConfig::from_args(&args)?).await
        }
        Command::Chapters(args) => {
            let catalog = ChapterCatalog::build(&parse_base_url(&args.source_base)?);
            let summaries: Vec<ChapterSummary> =
                catalog.chapters().iter().map(ChapterSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            Ok(())
        }
        Command::Read(args) => read(ReaderConfig::from_args(&args)?).await,
    }
}

async fn read(config: ReaderConfig) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file
    let log_file = File::create(&config.log_file)
        .with_context(|| format!("Cannot create log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    globals::init_globals()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channel for background tasks
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut app = App::new(ApiClient::new(config.server.clone()), tx)?;
    app.request_chapters();
    tracing::info!(server = %config.server, "reader started");

    // Run the app
    let res = run_app(&mut terminal, &mut app, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "reader exited with error");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<AppMessage>,
) -> Result<()> {
    let mut screen = Rect::default();

    loop {
        // Check for messages from background tasks (non-blocking)
        while let Ok(msg) = rx.try_recv() {
            app.handle_message(msg);
        }

        // Draw UI
        terminal.draw(|f| {
            screen = f.area();
            draw_ui(f, app);
        })?;

        // Handle input with timeout - only read ONE event per loop iteration
        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events, ignore release and repeat
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('q')
                    {
                        return Ok(());
                    }
                    handle_key(app, key);
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse, screen),
                _ => {}
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match app.state {
        AppState::Error => {
            // Any key dismisses the error
            app.dismiss_error();
        }
        AppState::PickingChapter => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.picker_next(),
            KeyCode::Char('k') | KeyCode::Up => app.picker_previous(),
            KeyCode::Enter => app.confirm_picker(),
            KeyCode::Esc | KeyCode::Char('c') => app.close_picker(),
            _ => {}
        },
        // Only Ctrl-Q while a load is pending
        AppState::Loading => {}
        AppState::Reading => match key.code {
            KeyCode::Tab | KeyCode::Char('j') | KeyCode::Down => app.next_link(),
            KeyCode::BackTab | KeyCode::Char('k') | KeyCode::Up => app.previous_link(),
            KeyCode::Enter => app.activate_selected_link(),
            KeyCode::PageDown | KeyCode::Char(' ') => app.scroll(SCROLL_STEP),
            KeyCode::PageUp => app.scroll(-SCROLL_STEP),
            KeyCode::Esc | KeyCode::Backspace => app.overlay_back(),
            KeyCode::Char('x') => app.close_overlay(),
            KeyCode::Char('r') => app.preview_selected_reference(),
            KeyCode::Char('c') => app.open_picker(),
            KeyCode::Char('n') => app.next_chapter(),
            KeyCode::Char('p') => app.previous_chapter(),
            _ => {}
        },
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, screen: Rect) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let position = Position::new(mouse.column, mouse.row);
            if !overlay_rect(screen).contains(position) {
                app.backdrop_clicked();
            }
        }
        MouseEventKind::ScrollDown => app.scroll(SCROLL_STEP / 3),
        MouseEventKind::ScrollUp => app.scroll(-SCROLL_STEP / 3),
        _ => {}
    }
}

use rynx_inline::app::App;
use rynx_inline::config::{Cli, Config};
use rynx_inline::constants::{CHANNEL_CAPACITY, EVENT_POLL_TIMEOUT_MS};
use rynx_inline::event_handler::{handle_key_event, handle_mouse_event};
use rynx_inline::logging;
use rynx_inline::ui::ui;

use anyhow::Context;
use clap::Parser;
use std::{io, time::Duration};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
        supports_keyboard_enhancement,
    },
};

use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    let page_url = config.page_url()?;

    let _log_guard = match config.log_dir() {
        Some(dir) => Some(
            logging::init(&dir)
                .with_context(|| format!("cannot open log directory {}", dir.display()))?,
        ),
        None => None,
    };
    tracing::info!(%page_url, "starting");

    // This hook catches panics and restores the terminal before printing the error
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    // Without this most terminals report Ctrl+Esc as a bare Esc.
    let enhanced_keys = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced_keys {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);
    let res = match App::new(&config, page_url, tx, rx) {
        Ok(mut app) => {
            app.resize(terminal.size()?.width);
            app.load_page();
            run_app(&mut terminal, app).await.map_err(anyhow::Error::from)
        }
        Err(e) => Err(e.into()),
    };

    // Teardown
    if enhanced_keys {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!(error = %err, "exiting with error");
    }
    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        let size = terminal.size()?;

        terminal.draw(|f| ui(f, &app))?;

        // Handle network events
        if let Ok(response) = app.rx.try_recv() {
            app.handle_network_response(response);
        }
        app.tick();

        // Handle input events
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Resize(width, _height) => {
                    app.resize(width);
                }
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if handle_key_event(&mut app, key, size.height)? {
                        tracing::info!("quit requested");
                        return Ok(()); // Quit signal received
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse_event(&mut app, mouse, size.height)?;
                }
                _ => {}
            }
        }
    }
}

use color_eyre::{eyre::eyre, Result};
use fairway_finder::{
    api::RangeRanker,
    app::App,
    config::{api_key_from_env, Config},
    events::{Event, EventHandler},
    location::Geolocator,
    logging,
    search::Searcher,
    ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    // Clients are built before the terminal is taken over so setup errors
    // print normally.
    let config = Config::load();
    let api_key = api_key_from_env()
        .ok_or_else(|| eyre!("set GEMINI_API_KEY (or API_KEY) to a Gemini API key"))?;
    let ranker = RangeRanker::new(&api_key, &config.api)?;
    let geolocator = Geolocator::from_config(&config.location)?;

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new();
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    let searcher = Searcher::new(geolocator, ranker, events.tx.clone());

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Tick => app.on_tick(),
                Event::Input(key) => {
                    if let Some(generation) = app.handle_key(key) {
                        searcher.spawn(generation);
                    }
                }
                Event::PermissionRequest { generation, reply } => {
                    app.on_permission_request(generation, reply)
                }
                Event::LocationResolved { generation, result } => {
                    app.on_location(generation, result)
                }
                Event::RankingFinished { generation, result } => {
                    app.on_ranking(generation, result)
                }
            }
        }
    }

    restore_terminal(terminal)?;
    info!("Exiting");
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}

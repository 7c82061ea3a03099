use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod config;
mod db;
mod error;
mod models;
mod services;
mod settings;
mod stats;
mod tui;

use app::App;
use config::Config;
use error::Result;
use stats::{difference_sentence, window_caption, DashboardStats};
use tui::{draw, handle_key_event};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --token flag
    let token_arg = if args.len() >= 3 && args[1] == "--token" {
        Some(args[2].clone())
    } else {
        None
    };

    // Check for --refresh flag (headless refresh)
    let headless_refresh = args.len() >= 2 && args[1] == "--refresh";

    // Check for --stats flag (print stats and exit)
    let print_stats = args.len() >= 2 && args[1] == "--stats";
    let as_json = args.iter().any(|a| a == "--json");

    // Initialize app
    let mut app = App::new(&config).await?;

    // If a token was given, store it and exit
    if let Some(token) = token_arg {
        app.set_token(&token).await?;
        println!("Saved Readwise access token");
        return Ok(());
    }

    // If headless refresh, just refresh and exit
    if headless_refresh {
        let count = app.refresh_blocking().await?;
        println!("Fetched {} documents", count);
        return Ok(());
    }

    if print_stats {
        report_stats(&app.stats, as_json)?;
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Advance spinner animation
        app.tick();

        // Poll for completed refresh results
        app.poll_refresh_result().await?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.input_mode(), app.show_help) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

fn report_stats(stats: &DashboardStats, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("Read articles total: {}", stats.archived_total);
    println!("Read articles {}: {}", stats.year, stats.archived_this_year);
    println!();
    println!("Articles/Month ({})", window_caption(&Local::now()));
    for bucket in &stats.window {
        println!(
            "  {:<15} added {:>4}  read {:>4}",
            bucket.month, bucket.articles_added, bucket.articles_read
        );
    }
    println!("{}", difference_sentence(stats.window_difference));
    println!();
    println!(
        "Year to date: added {}  read {}",
        stats.range_totals.added, stats.range_totals.read
    );
    Ok(())
}

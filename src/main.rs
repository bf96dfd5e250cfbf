use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};

use vidgrab::app::App;
use vidgrab::command::{CookieSource, FormatPreset};
use vidgrab::config;
use vidgrab::cookies::CookieStore;
use vidgrab::tui::{Renderer, handle_key, handle_paste};
use vidgrab::{logging, update};

/// Tick interval for draining session output (milliseconds)
const POLL_INTERVAL_MS: u64 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "vidgrab",
    author,
    version,
    about = "A TUI front-end for yt-dlp: paste a URL, pick a preset, watch the download live",
    long_about = None
)]
struct Args {
    /// Video URL to pre-fill
    url: Option<String>,

    /// Destination directory (defaults to the configured download dir)
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Quality/format preset
    #[arg(short = 'f', long, value_enum)]
    format: Option<FormatPreset>,

    /// Take cookies from this browser instead of the cookies.txt file
    #[arg(long, value_name = "BROWSER")]
    cookies_from_browser: Option<String>,

    /// Maximum log lines kept per download
    #[arg(short = 'b', long)]
    max_buffer_lines: Option<usize>,

    /// Replace this executable with the latest release and exit
    #[arg(long)]
    update: bool,

    /// Check whether a newer release exists and exit
    #[arg(long)]
    check_update: bool,
}

/// Initialize the terminal for TUI
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()
}

/// Restore the terminal even when rendering panics
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Run the application
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    let mut events = EventStream::new();

    loop {
        // Update visible lines based on terminal size: help + url(3) +
        // settings + status + log borders
        let size = terminal.size()?;
        let visible_lines = size.height.saturating_sub(8) as usize;
        app.view_mut().set_visible_lines(visible_lines);

        // Render
        terminal.draw(|frame| {
            Renderer::render(frame, &app);
        })?;

        // Wait for a terminal event or the next output tick
        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        handle_key(&mut app, key);
                    }
                    Some(Ok(Event::Paste(text))) => handle_paste(&mut app, text),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)) => {}
        }

        // Drain subprocess output onto the log
        app.poll_session().await;

        // Check if we should quit
        if app.should_quit() {
            app.shutdown().await;
            break;
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    // The update client blocks; run it before the async runtime starts
    if args.update {
        match update::update() {
            Ok(version) => {
                println!("updated to v{version}");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    if args.check_update {
        let (current, latest, available) = update::get_version_info();
        println!("current: v{current}");
        println!("latest:  v{latest}");
        if available {
            println!("run `vidgrab --update` to install");
        }
        return Ok(());
    }

    run(args)
}

#[tokio::main]
async fn run(args: Args) -> io::Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("warning: file logging disabled: {e}");
    }

    let mut settings = config::load_settings_or_default();
    if let Some(dir) = args.dir {
        settings.download_dir = dir;
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(browser) = args.cookies_from_browser {
        settings.cookie_source = CookieSource::Browser(browser);
    }
    if let Some(lines) = args.max_buffer_lines {
        settings.max_log_lines = lines;
    }

    // Stale session cookies are not carried across runs
    let cookie_store = CookieStore::new(CookieStore::default_path());
    if let Err(e) = cookie_store.ensure_exists().and_then(|_| cookie_store.clear()) {
        tracing::warn!(error = %e, "could not reset cookie file");
    }

    let mut app = App::new(settings, args.url, cookie_store);

    // Release check off the UI thread; result lands in the status bar
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let _ = tx.send(update::check_notice());
    });
    app.set_update_probe(rx);

    install_panic_hook();
    let mut terminal = init_terminal()?;

    let result = run_app(&mut terminal, app).await;

    restore_terminal(&mut terminal)?;

    result
}

use std::io::{stdout, Stdout, Write};
use std::path::PathBuf;
use std::thread;
use std::time;

use clap::Parser;
use crossbeam::channel::{unbounded, Sender};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
    QueueableCommand, Result,
};
use tui::{backend::CrosstermBackend, Terminal};

use wavescout::app::App;
use wavescout::config::Settings;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct WavescoutArgs {
    /// Waveform file to open on startup.
    vcd_file: Option<String>,

    /// A previously saved session (`.yaml`) to restore instead of the bare
    /// waveform tree; still requires the waveform the session was recorded
    /// against.
    #[clap(short, long)]
    session: Option<String>,

    /// Where user preferences are persisted, TOML-encoded.
    #[clap(long, default_value = "wavescout.toml")]
    settings: String,
}

fn spawn_input_listener(tx: Sender<CrosstermEvent>) {
    thread::spawn(move || loop {
        if event::poll(time::Duration::from_millis(100)).unwrap() {
            tx.send(event::read().unwrap()).unwrap();
        }
    });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().unwrap();
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.backend_mut().queue(EnableMouseCapture)?;
    terminal.backend_mut().queue(EnterAlternateScreen)?;
    terminal.backend_mut().flush()?;
    terminal.clear()?;
    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>, msg: &str) -> Result<()> {
    terminal.backend_mut().queue(DisableMouseCapture)?;
    terminal.backend_mut().queue(LeaveAlternateScreen)?;
    terminal.backend_mut().flush()?;
    disable_raw_mode()?;
    terminal.show_cursor()?;
    println!("{}", msg);
    Ok(())
}

fn main() -> Result<()> {
    if !stdout().is_tty() {
        println!("Error: Cannot open viewer when not TTY!");
        return Ok(());
    }

    simple_logging::log_to_file("wavescout.log", log::LevelFilter::Info).ok();

    let args = WavescoutArgs::parse();
    let settings_path = PathBuf::from(&args.settings);
    let settings = Settings::load(&settings_path).unwrap_or_else(|e| {
        log::warn!("failed to load settings from {}: {e}", settings_path.display());
        Settings::default()
    });

    let (tx_input, rx_input) = unbounded();
    spawn_input_listener(tx_input);

    let mut terminal = setup_terminal()?;
    let mut app = App::new(settings);

    if let Some(session_path) = &args.session {
        if let Err(e) = app.load_session(&PathBuf::from(session_path)) {
            log::error!("failed to load session {session_path}: {e}");
        }
    } else if let Some(vcd_file) = &args.vcd_file {
        app.open_waveform(PathBuf::from(vcd_file));
    }

    loop {
        let frame_start = time::Instant::now();

        terminal.draw(|frame| app.render(frame))?;

        while !rx_input.is_empty() {
            if let Ok(event) = rx_input.recv() {
                app.handle_event(event);
            }
        }

        if app.should_quit() {
            let msg = app.status().unwrap_or("bye").to_string();
            cleanup_terminal(&mut terminal, &msg)?;
            break;
        }

        let frame_target = time::Duration::from_millis(20);
        let frame_elapsed = frame_start.elapsed();
        if frame_elapsed < frame_target {
            thread::sleep(frame_target - frame_elapsed);
        }
    }

    Ok(())
}

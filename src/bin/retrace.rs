//! `retrace` replay binary: loads a trace file and drives the replay TUI.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use crossterm::event::{self, Event as TermEvent};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use retrace::loader::Trace;
use retrace::replay::{App, MIN_HEIGHT, MIN_WIDTH};

/// Step through a recorded `.debug.trace` file.
#[derive(Parser, Debug)]
#[command(name = "retrace", about = "Replay a recorded debug trace")]
struct Cli {
    /// Path to a trace file. Defaults to `.debug.trace` in the working directory.
    trace_path: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let path = cli.trace_path.unwrap_or_else(|| ".debug.trace".to_string());

    let trace = Trace::load(&path);
    if trace.is_empty() {
        eprintln!("retrace: no events in trace file {path}");
        return ExitCode::FAILURE;
    }

    let (width, height) = match crossterm::terminal::size() {
        Ok(size) => size,
        Err(err) => {
            eprintln!("retrace: failed to read terminal size: {err}");
            return ExitCode::FAILURE;
        }
    };
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        eprintln!(
            "retrace: terminal too small ({width}x{height}); need at least {MIN_WIDTH}x{MIN_HEIGHT}"
        );
        return ExitCode::FAILURE;
    }

    let mut app = match App::new(trace) {
        Ok(app) => app,
        Err(_) => {
            eprintln!("retrace: no events in trace file {path}");
            return ExitCode::FAILURE;
        }
    };

    match run(&mut app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("retrace: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the render/input loop, always restoring the terminal on the way out.
fn run(app: &mut App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| retrace::replay::draw(frame, &mut *app))?;

        // EOF on input is treated as quit, not propagated as an error.
        match event::read() {
            Ok(TermEvent::Key(key)) => app.handle_key(key),
            Ok(_) => {}
            Err(_) => return Ok(()),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

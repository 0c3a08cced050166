// Main application loop for the TUI

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::core::install::InstallOutcome;
use crate::core::system::SystemInfo;
use crate::iommu::TopologyQuery;
use crate::utils::CommandRunner;
use crate::wizard::Wizard;

use super::input::handle_key_event;
use super::render::ui;
use super::state::{AppState, LogLevel};

/// How the interactive session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppExit {
    /// The wizard reached its terminal stage; carries the kernel arguments
    /// when they still have to be added by hand
    Completed { manual_kernel_args: Option<String> },
    /// The operator left early
    Quit,
    /// A fatal error stopped the wizard
    Failed(String),
}

/// Log the detected host properties into the console feed
fn log_system_info<Q: TopologyQuery, R: CommandRunner>(app: &mut AppState<Q, R>) {
    let bootloader = app.system_info.bootloader;
    let cpu_vendor = format!("{:?}", app.system_info.cpu_vendor);
    let virtualization_enabled = app.system_info.virtualization_enabled;
    let distribution = app
        .system_info
        .distribution
        .as_ref()
        .map(|d| format!("{} {}", d.name, d.version));

    app.add_log(&format!("Bootloader tooling: {}", bootloader), LogLevel::Info);
    app.add_log(&format!("CPU vendor: {}", cpu_vendor), LogLevel::Info);
    if let Some(distribution) = distribution {
        app.add_log(&format!("Distribution: {}", distribution), LogLevel::Info);
    }
    if virtualization_enabled {
        app.add_log("Virtualization is enabled", LogLevel::Success);
    } else {
        app.add_log("Warning: Virtualization is disabled in firmware", LogLevel::Warning);
    }
}

/// Runs the wizard in the terminal until it completes, fails or the operator quits
pub fn run_app<Q: TopologyQuery, R: CommandRunner>(wizard: Wizard<Q, R>, system_info: SystemInfo) -> io::Result<AppExit> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = AppState::new(wizard, system_info);
    app.add_log("Welcome to Exliar Quickpass", LogLevel::Info);
    log_system_info(&mut app);

    let result = event_loop(&mut terminal, &mut app);

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result?;

    Ok(if let Some(message) = app.fatal_error.take() {
        AppExit::Failed(message)
    } else if app.completed {
        let manual_kernel_args = match app.wizard.install_outcome() {
            Some(InstallOutcome::Manual { kernel_args }) => Some(kernel_args.clone()),
            _ => None,
        };
        AppExit::Completed { manual_kernel_args }
    } else {
        AppExit::Quit
    })
}

fn event_loop<Q: TopologyQuery, R: CommandRunner>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState<Q, R>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

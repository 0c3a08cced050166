// Application state management for the TUI

use crate::core::system::SystemInfo;
use crate::iommu::TopologyQuery;
use crate::ui::colors::PastelColor;
use crate::utils::CommandRunner;
use crate::wizard::Wizard;
use ratatui::style::Color;
use secrecy::zeroize::Zeroizing;

/// Console entries kept on screen
const MAX_LOG_MESSAGES: usize = 100;

/// Reserved up front so typing never reallocates the credential buffer
const PASSWORD_CAPACITY: usize = 256;

/// A styled log message for the console feed
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub timestamp: String,
    pub text: String,
    pub level: LogLevel,
}

/// Log message levels with associated colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Get the color for this log level
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Info => PastelColor::Lavender.as_ratatui(),
            LogLevel::Success => PastelColor::Mint.as_ratatui(),
            LogLevel::Warning => PastelColor::Peach.as_ratatui(),
            LogLevel::Error => PastelColor::Pink.as_ratatui(),
        }
    }
}

/// Ratatui app state
pub struct AppState<Q: TopologyQuery, R: CommandRunner> {
    pub title: String,
    pub should_quit: bool,
    pub wizard: Wizard<Q, R>,
    pub system_info: SystemInfo,
    pub log_messages: Vec<LogMessage>,
    /// Credential typed at the install stage; wiped once copied into a secret
    pub password: Zeroizing<String>,
    /// Set when a fatal error ended the run
    pub fatal_error: Option<String>,
    /// Set once the wizard reports completion
    pub completed: bool,
}

impl<Q: TopologyQuery, R: CommandRunner> AppState<Q, R> {
    pub fn new(wizard: Wizard<Q, R>, system_info: SystemInfo) -> Self {
        Self {
            title: "Exliar Quickpass".to_string(),
            should_quit: false,
            wizard,
            system_info,
            log_messages: Vec::new(),
            password: Zeroizing::new(String::with_capacity(PASSWORD_CAPACITY)),
            fatal_error: None,
            completed: false,
        }
    }

    /// Add a log message to the console feed and the log file
    pub fn add_log(&mut self, text: &str, level: LogLevel) {
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", text),
            LogLevel::Warning => tracing::warn!("{}", text),
            LogLevel::Error => tracing::error!("{}", text),
        }

        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        self.log_messages.push(LogMessage {
            timestamp,
            text: text.to_string(),
            level,
        });

        if self.log_messages.len() > MAX_LOG_MESSAGES {
            self.log_messages.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::tui::testing::app_in;
    use tempfile::TempDir;

    #[test]
    fn console_keeps_the_latest_messages() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);

        for i in 0..(MAX_LOG_MESSAGES + 5) {
            app.add_log(&format!("message {}", i), LogLevel::Info);
        }

        assert_eq!(app.log_messages.len(), MAX_LOG_MESSAGES);
        assert_eq!(app.log_messages[0].text, "message 5");
        assert_eq!(app.log_messages[0].timestamp.len(), 8);
    }
}

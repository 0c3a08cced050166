// Input handling for the TUI

use crossterm::event::{KeyCode, KeyModifiers};
use secrecy::zeroize::Zeroize;
use secrecy::SecretString;

use super::state::{AppState, LogLevel};
use crate::core::install::InstallOutcome;
use crate::iommu::TopologyQuery;
use crate::utils::CommandRunner;
use crate::wizard::{Confirmation, ConfirmationKind, Stage, YES};

/// Handles key events for the application
pub fn handle_key_event<Q: TopologyQuery, R: CommandRunner>(
    app: &mut AppState<Q, R>,
    key_code: KeyCode,
    modifiers: KeyModifiers,
) {
    let typing_password = app.wizard.stage() == Stage::Install;

    match key_code {
        KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Esc => {
            app.should_quit = true;
        }
        KeyCode::Enter => confirm(app),
        KeyCode::Backspace if typing_password => {
            app.password.pop();
        }
        KeyCode::Char(c) if typing_password => {
            app.password.push(c);
        }
        KeyCode::Up | KeyCode::Char('k') => app.wizard.list_mut().select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.wizard.list_mut().select_next(),
        _ => {}
    }
}

/// Builds the confirmation the current stage expects and advances the wizard
fn confirm<Q: TopologyQuery, R: CommandRunner>(app: &mut AppState<Q, R>) {
    let stage = app.wizard.stage();
    let confirmation = match stage.expects() {
        ConfirmationKind::Acknowledge => Confirmation::Acknowledge,
        ConfirmationKind::Selection => Confirmation::Selection(app.wizard.list().selected_item().cloned()),
        ConfirmationKind::Choice => Confirmation::Choice(
            app.wizard
                .list()
                .selected_item()
                .map_or(false, |item| item.title == YES),
        ),
        ConfirmationKind::Authenticate => {
            if app.password.is_empty() {
                app.add_log("Enter your password to continue", LogLevel::Warning);
                return;
            }
            let secret = SecretString::from(app.password.as_str());
            app.password.zeroize();
            Confirmation::Authenticate(secret)
        }
    };

    match app.wizard.advance(confirmation) {
        Ok(done) => after_advance(app, stage, done),
        Err(e) if e.is_fatal() => {
            app.add_log(&e.to_string(), LogLevel::Error);
            app.fatal_error = Some(e.to_string());
            app.should_quit = true;
        }
        Err(e) => app.add_log(&e.to_string(), LogLevel::Warning),
    }
}

fn after_advance<Q: TopologyQuery, R: CommandRunner>(app: &mut AppState<Q, R>, from: Stage, done: bool) {
    let to = app.wizard.stage();

    if from == to && !done {
        app.add_log("Nothing to select here, press Esc to exit", LogLevel::Warning);
        return;
    }

    match from {
        Stage::Intro => app.add_log("Configuration scaffolding created", LogLevel::Success),
        Stage::ChooseGpu => {
            if let Some(group) = app.wizard.facts().chosen_gpu_group() {
                let text = format!("GPU is in IOMMU group {}", group);
                app.add_log(&text, LogLevel::Info);
            }
        }
        Stage::ChooseGpuGroup => {
            let text = match app.wizard.facts().vbios_path() {
                Some(path) => format!("VBIOS ROM found at {}", path.display()),
                None => "No VBIOS ROM found for this GPU".to_string(),
            };
            app.add_log(&text, LogLevel::Info);
        }
        Stage::ChooseVideoPolicy => {
            app.add_log("Boot configuration written", LogLevel::Success);
            app.add_log("Enter your password to install it", LogLevel::Info);
        }
        Stage::Install => match app.wizard.install_outcome().cloned() {
            Some(InstallOutcome::Configured { bootloader, .. }) => {
                app.add_log(&format!("Kernel arguments added using {}", bootloader), LogLevel::Success);
                app.add_log("Reboot to apply the passthrough configuration", LogLevel::Warning);
            }
            Some(InstallOutcome::Manual { kernel_args }) => {
                app.add_log("No supported bootloader tooling was found", LogLevel::Warning);
                app.add_log(&format!("Add these kernel arguments manually: {}", kernel_args), LogLevel::Warning);
            }
            None => {}
        },
        Stage::Done => {
            app.completed = true;
            app.should_quit = true;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::tui::testing::app_in;
    use tempfile::TempDir;

    fn press(app: &mut AppState<impl TopologyQuery, impl CommandRunner>, code: KeyCode) {
        handle_key_event(app, code, KeyModifiers::NONE);
    }

    #[test]
    fn escape_and_ctrl_q_quit() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);

        let mut app = app_in(&temp);
        handle_key_event(&mut app, KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn enter_on_intro_lists_gpus() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.wizard.stage(), Stage::ChooseGpu);
        assert_eq!(app.wizard.list().len(), 2);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.wizard.list().selected_index(), 1);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.wizard.list().selected_index(), 0);
    }

    #[test]
    fn password_is_typed_only_at_install() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);
        press(&mut app, KeyCode::Char('x'));
        assert!(app.password.is_empty());

        for _ in 0..6 {
            press(&mut app, KeyCode::Enter);
        }
        assert_eq!(app.wizard.stage(), Stage::ChooseVideoPolicy);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.stage(), Stage::Install);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.stage(), Stage::Install, "empty password must not submit");

        let capacity = app.password.capacity();
        for c in "pw1".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.password.as_str(), "pw");
        assert_eq!(app.password.capacity(), capacity, "typing must not move the buffer");

        press(&mut app, KeyCode::Enter);
        assert!(app.password.is_empty());
        assert_eq!(app.password.capacity(), capacity);
        assert_eq!(app.wizard.stage(), Stage::Done);

        press(&mut app, KeyCode::Enter);
        assert!(app.completed);
        assert!(app.should_quit);
        assert!(app.fatal_error.is_none());
    }
}

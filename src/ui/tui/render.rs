// UI rendering functions for the TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::state::AppState;
use crate::core::install::InstallOutcome;
use crate::iommu::TopologyQuery;
use crate::ui::colors::Theme;
use crate::utils::CommandRunner;
use crate::wizard::{ConfirmationKind, Stage};

/// Main UI render function
pub fn ui<Q: TopologyQuery, R: CommandRunner>(f: &mut Frame, app: &AppState<Q, R>) {
    let theme = Theme::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Stage panel
            Constraint::Length(8), // Console log
            Constraint::Length(3), // Footer
        ])
        .split(f.size());

    render_title(f, app, chunks[0], &theme);
    render_stage(f, app, chunks[1], &theme);
    render_console(f, app, chunks[2], &theme);
    render_footer(f, app, chunks[3], &theme);
}

fn panel<'a>(title: String, color: ratatui::style::Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(title, Style::default().fg(color).add_modifier(Modifier::BOLD)))
        .border_style(Style::default().fg(color))
}

/// Render the title bar with the stage progress
fn render_title<Q: TopologyQuery, R: CommandRunner>(f: &mut Frame, app: &AppState<Q, R>, area: Rect, theme: &Theme) {
    let stage = app.wizard.stage();
    let progress = format!("Step {} of {}: {}", stage as usize + 1, Stage::Done as usize + 1, stage);

    let title = Paragraph::new(Line::from(Span::styled(
        progress,
        Style::default().fg(theme.accent.as_ratatui()).add_modifier(Modifier::BOLD),
    )))
    .block(panel(format!(" ✨ {} ✨ ", app.title), theme.primary.as_ratatui()))
    .alignment(Alignment::Center);

    f.render_widget(title, area);
}

/// Render the panel for the current stage
fn render_stage<Q: TopologyQuery, R: CommandRunner>(f: &mut Frame, app: &AppState<Q, R>, area: Rect, theme: &Theme) {
    let stage = app.wizard.stage();
    let block = panel(format!(" {} ", stage.title()), theme.secondary.as_ratatui());

    match stage {
        Stage::ChooseGpu | Stage::ChooseGpuGroup | Stage::ChooseUsb | Stage::ChooseUsbGroup | Stage::ChooseVideoPolicy => {
            render_selection(f, app, block, area, theme)
        }
        _ => {
            let paragraph = Paragraph::new(stage_text(app, theme))
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, area);
        }
    }
}

/// Render the current list, with the prompt above it
fn render_selection<Q: TopologyQuery, R: CommandRunner>(
    f: &mut Frame,
    app: &AppState<Q, R>,
    block: Block,
    area: Rect,
    theme: &Theme,
) {
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let prompt = Paragraph::new(Line::from(Span::styled(
        stage_prompt(app.wizard.stage()),
        Style::default().fg(theme.primary.as_ratatui()),
    )))
    .wrap(Wrap { trim: true });
    f.render_widget(prompt, chunks[0]);

    let list = app.wizard.list();
    if list.is_empty() {
        let hint = if app.wizard.stage().expects() == ConfirmationKind::Selection {
            "Nothing was found. Press Esc to exit."
        } else {
            "Nothing was found. Press Enter to continue."
        };
        let empty = Paragraph::new(Span::styled(
            hint,
            Style::default().fg(theme.warning.as_ratatui()),
        ));
        f.render_widget(empty, chunks[1]);
        return;
    }

    let width = chunks[1].width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = list
        .items()
        .iter()
        .map(|item| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    truncate_to_width(&item.title, width),
                    Style::default().fg(theme.text.as_ratatui()).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    truncate_to_width(&item.description, width),
                    Style::default().fg(theme.muted.as_ratatui()),
                )),
            ])
        })
        .collect();

    // Group listings are informational, so the cursor only shows where a choice is made
    let selectable = app.wizard.stage().expects() != ConfirmationKind::Acknowledge;
    let mut widget = List::new(items);
    if selectable {
        widget = widget
            .highlight_style(Style::default().fg(theme.accent.as_ratatui()).add_modifier(Modifier::BOLD))
            .highlight_symbol("❯ ");
    }

    let mut state = ListState::default();
    if selectable {
        state.select(Some(list.selected_index()));
    }
    f.render_stateful_widget(widget, chunks[1], &mut state);
}

fn stage_prompt(stage: Stage) -> &'static str {
    match stage {
        Stage::ChooseGpu => "Select the GPU you want to pass through to the virtual machine",
        Stage::ChooseGpuGroup => "These devices share the GPU's IOMMU group and will all be passed through",
        Stage::ChooseUsb => "Select the USB controller to pass through",
        Stage::ChooseUsbGroup => "These devices share the USB controller's IOMMU group",
        Stage::ChooseVideoPolicy => "Disable host video output on the passed-through GPU?",
        _ => "",
    }
}

/// Body text for the stages that show no list
fn stage_text<'a, Q: TopologyQuery, R: CommandRunner>(app: &'a AppState<Q, R>, theme: &Theme) -> Vec<Line<'a>> {
    let label_style = Style::default().fg(theme.text.as_ratatui()).add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(theme.text.as_ratatui());
    let hint_style = Style::default().fg(theme.accent.as_ratatui()).add_modifier(Modifier::BOLD);

    match app.wizard.stage() {
        Stage::Intro => vec![
            Line::from("This wizard isolates a GPU and its IOMMU group for passthrough to a virtual machine."),
            Line::from("It writes kernel arguments, module and initramfs configuration, then installs them with sudo."),
            Line::from(""),
            Line::from(vec![
                Span::styled("Bootloader tooling: ", label_style),
                Span::styled(app.system_info.bootloader.to_string(), value_style),
            ]),
            Line::from(vec![
                Span::styled("Configuration directory: ", label_style),
                Span::styled(app.wizard.config().paths.root.display().to_string(), value_style),
            ]),
            Line::from(""),
            Line::from(Span::styled("Press Enter to begin", hint_style)),
        ],
        Stage::ConfirmVbios => {
            let mut lines = match app.wizard.facts().vbios_path() {
                Some(path) => vec![
                    Line::from(vec![
                        Span::styled("VBIOS ROM: ", label_style),
                        Span::styled(path.display().to_string(), value_style),
                    ]),
                    Line::from(vec![
                        Span::styled("Dump script: ", label_style),
                        Span::styled(app.wizard.config().paths.vbios_script.display().to_string(), value_style),
                    ]),
                    Line::from("Run the script as root if your GPU needs a VBIOS file for passthrough."),
                ],
                None => vec![Line::from(Span::styled(
                    "No VBIOS ROM was reported for this GPU; no dump script was written.",
                    Style::default().fg(theme.warning.as_ratatui()),
                ))],
            };
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Press Enter to continue", hint_style)));
            lines
        }
        Stage::Install => vec![
            Line::from("The configuration is written. Installing it requires sudo."),
            Line::from(""),
            Line::from(vec![
                Span::styled("Password: ", label_style),
                Span::styled("*".repeat(app.password.chars().count()), value_style),
            ]),
            Line::from(""),
            Line::from(Span::styled("Press Enter to install", hint_style)),
        ],
        Stage::Done => {
            let mut lines = Vec::new();
            match app.wizard.install_outcome() {
                Some(InstallOutcome::Manual { kernel_args }) => {
                    lines.push(Line::from(Span::styled(
                        "Add these kernel arguments to your bootloader manually:",
                        Style::default().fg(theme.warning.as_ratatui()),
                    )));
                    lines.push(Line::from(Span::styled(kernel_args.as_str(), value_style)));
                }
                Some(InstallOutcome::Configured { bootloader, kernel_args }) => {
                    lines.push(Line::from(Span::styled(
                        format!("Kernel arguments added using {}:", bootloader),
                        Style::default().fg(theme.success.as_ratatui()),
                    )));
                    lines.push(Line::from(Span::styled(kernel_args.as_str(), value_style)));
                    lines.push(Line::from("Reboot to apply the passthrough configuration."));
                }
                None => {}
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Press Enter to exit", hint_style)));
            lines
        }
        _ => Vec::new(),
    }
}

/// Render console log panel, newest messages at the bottom
fn render_console<Q: TopologyQuery, R: CommandRunner>(f: &mut Frame, app: &AppState<Q, R>, area: Rect, theme: &Theme) {
    let block = panel(" Console ".to_string(), theme.muted.as_ratatui());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    let skip = app.log_messages.len().saturating_sub(visible);
    let time_style = Style::default().fg(theme.muted.as_ratatui());

    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .skip(skip)
        .map(|msg| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", msg.timestamp), time_style),
                Span::styled(msg.text.as_str(), Style::default().fg(msg.level.color())),
            ]))
        })
        .collect();

    f.render_widget(List::new(log_items), inner);
}

/// Render the key help footer
fn render_footer<Q: TopologyQuery, R: CommandRunner>(f: &mut Frame, app: &AppState<Q, R>, area: Rect, theme: &Theme) {
    let key = Style::default().fg(theme.accent.as_ratatui()).add_modifier(Modifier::BOLD);
    let text = Style::default().fg(theme.text.as_ratatui());

    let mut help = Vec::new();
    if app.wizard.stage().expects() != ConfirmationKind::Authenticate {
        help.extend([Span::styled("↑/↓", key), Span::styled(" move | ", text)]);
    }
    help.extend([
        Span::styled("Enter", key),
        Span::styled(" confirm | ", text),
        Span::styled("Esc", key),
        Span::styled(" quit", text),
    ]);

    let paragraph = Paragraph::new(Line::from(help))
        .block(panel(String::new(), theme.muted.as_ratatui()))
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

/// Cuts `text` to at most `max_width` terminal columns, marking the cut with an ellipsis
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut result = String::new();
    let mut width = 0;
    for c in text.chars() {
        let char_width = c.width().unwrap_or(0);
        if width + char_width > max_width - 1 {
            break;
        }
        width += char_width;
        result.push(c);
    }
    result.push('…');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iommu::{RequestedFields, TopologyFilter, TopologyRequest};
    use crate::ui::tui::testing::{app_in, app_with, walk_to_install};
    use crate::wizard::Confirmation;
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::TempDir;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_to_width("GA102", 10), "GA102");
    }

    #[test]
    fn long_text_is_cut_by_display_width() {
        assert_eq!(truncate_to_width("GeForce RTX 3080", 8), "GeForce…");
        // Wide characters count two columns each
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    fn screen(app: &AppState<impl TopologyQuery, impl CommandRunner>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content.iter().map(|cell| cell.symbol.as_str()).collect()
    }

    #[test]
    fn intro_and_gpu_list_render() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);
        assert!(screen(&app).contains("Press Enter to begin"));

        app.wizard.advance(crate::wizard::Confirmation::Acknowledge).unwrap();
        let text = screen(&app);
        assert!(text.contains("Step 2 of 9"));
        assert!(text.contains("GA102 [GeForce RTX 3080]"));
    }

    #[test]
    fn password_is_masked() {
        let temp = TempDir::new().unwrap();
        let mut app = app_in(&temp);
        walk_to_install(&mut app);
        app.password.push_str("secret");

        let text = screen(&app);
        assert!(!text.contains("secret"));
        assert!(text.contains("******"));
    }

    /// Lists the GPU and nothing else
    struct GpuOnly;

    impl TopologyQuery for GpuOnly {
        fn query(&self, request: &TopologyRequest) -> crate::error::Result<Vec<String>> {
            Ok(match (request.filter, &request.fields) {
                (TopologyFilter::Gpus, RequestedFields::Format(_)) => {
                    vec!["IOMMU Group 16: NVIDIA Corporation: GA102 [GeForce RTX 3080] (rev a1): [10de:2206]".to_string()]
                }
                _ => Vec::new(),
            })
        }
    }

    #[test]
    fn empty_listing_hint_matches_the_stage() {
        let temp = TempDir::new().unwrap();
        let mut app = app_with(&temp, GpuOnly);
        app.wizard.advance(Confirmation::Acknowledge).unwrap();
        let gpu = app.wizard.list().selected_item().cloned();
        app.wizard.advance(Confirmation::Selection(gpu)).unwrap();

        assert_eq!(app.wizard.stage(), Stage::ChooseGpuGroup);
        let text = screen(&app);
        assert!(text.contains("Press Enter to continue"));
        assert!(!text.contains("Press Esc to exit"));

        app.wizard.advance(Confirmation::Acknowledge).unwrap();
        assert_eq!(app.wizard.stage(), Stage::ChooseUsb);
        assert!(screen(&app).contains("Nothing was found. Press Esc to exit."));
    }
}

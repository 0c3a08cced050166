// Pastel color palette shared by the TUI and the CLI summary

use crossterm::style::{Color, StyledContent, Stylize};
use std::fmt;

/// Defines the pastel color palette for the UI
#[derive(Clone, Copy, Debug)]
pub enum PastelColor {
    Pink,
    Lavender,
    Mint,
    SkyBlue,
    Peach,
    White,
    Gray,
}

impl PastelColor {
    fn rgb(&self) -> (u8, u8, u8) {
        match self {
            PastelColor::Pink => (255, 182, 193),
            PastelColor::Lavender => (204, 169, 221),
            PastelColor::Mint => (176, 224, 183),
            PastelColor::SkyBlue => (173, 216, 230),
            PastelColor::Peach => (255, 218, 185),
            PastelColor::White => (255, 255, 255),
            PastelColor::Gray => (169, 169, 169),
        }
    }

    /// Terminal color for crossterm output (CLI mode)
    pub fn as_color(&self) -> Color {
        let (r, g, b) = self.rgb();
        Color::Rgb { r, g, b }
    }

    /// Terminal color for ratatui widgets
    pub fn as_ratatui(&self) -> ratatui::style::Color {
        let (r, g, b) = self.rgb();
        ratatui::style::Color::Rgb(r, g, b)
    }
}

/// A styled text element for plain terminal output
pub struct StyledText<'a> {
    styled: StyledContent<&'a str>,
}

impl<'a> StyledText<'a> {
    pub fn new(text: &'a str, fg_color: PastelColor) -> Self {
        Self {
            styled: text.with(fg_color.as_color()),
        }
    }

    pub fn bold(text: &'a str, fg_color: PastelColor) -> Self {
        Self {
            styled: text.with(fg_color.as_color()).bold(),
        }
    }
}

impl<'a> fmt::Display for StyledText<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.styled)
    }
}

/// Theme defining the main colors used by the UI
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub primary: PastelColor,
    pub secondary: PastelColor,
    pub accent: PastelColor,
    pub text: PastelColor,
    pub muted: PastelColor,
    pub warning: PastelColor,
    pub error: PastelColor,
    pub success: PastelColor,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: PastelColor::Lavender,
            secondary: PastelColor::SkyBlue,
            accent: PastelColor::Pink,
            text: PastelColor::White,
            muted: PastelColor::Gray,
            warning: PastelColor::Peach,
            error: PastelColor::Pink,
            success: PastelColor::Mint,
        }
    }
}

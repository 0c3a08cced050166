// Terminal UI module for Exliar Quickpass
//
// A pastel ratatui front end for the wizard, plus the colored plain-text
// output used by CLI mode.

pub mod colors;
pub mod tui;

use std::io;

use crate::core::system::SystemInfo;
use crate::iommu::TopologyQuery;
use crate::utils::CommandRunner;
use crate::wizard::Wizard;

pub use tui::AppExit;

/// Runs the wizard in the ratatui UI
pub fn run_tui<Q: TopologyQuery, R: CommandRunner>(wizard: Wizard<Q, R>, system_info: SystemInfo) -> io::Result<AppExit> {
    tui::run_app(wizard, system_info)
}

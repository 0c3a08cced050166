// TUI implementation using Ratatui
// This module contains the main application loop, state management,
// and rendering functions for the terminal user interface.

pub use app::{run_app, AppExit};

mod app;
mod input;
pub mod render;
mod state;

#[cfg(test)]
pub(crate) mod testing {
    //! A wizard wired to canned topology output

    use super::state::AppState;
    use crate::core::config::testing::{config_in, HostFixture};
    use crate::core::system::{Bootloader, CpuVendor, SystemInfo};
    use crate::error::Result;
    use crate::iommu::{RequestedFields, TopologyFilter, TopologyQuery, TopologyRequest};
    use crate::utils::testing::RecordingRunner;
    use crate::wizard::{Confirmation, ConfirmationKind, Stage, Wizard};
    use tempfile::TempDir;

    pub struct CannedTopology;

    impl TopologyQuery for CannedTopology {
        fn query(&self, request: &TopologyRequest) -> Result<Vec<String>> {
            let lines: &[&str] = match (request.filter, &request.fields) {
                (TopologyFilter::Gpus, RequestedFields::Format(_)) => &[
                    "IOMMU Group 16: NVIDIA Corporation: GA102 [GeForce RTX 3080] (rev a1): [10de:2206]",
                    "IOMMU Group 28: Advanced Micro Devices, Inc. [AMD/ATI]: Navi 21 (rev c1): [1002:73bf]",
                ],
                (TopologyFilter::GpuGroupRelated, _) => &[
                    "IOMMU Group 16: NVIDIA Corporation: GA102 [GeForce RTX 3080] (rev a1): [10de:2206]",
                    "IOMMU Group 16: NVIDIA Corporation: GA102 High Definition Audio Controller (rev a1): [10de:1aef]",
                ],
                (TopologyFilter::GpuGroup, RequestedFields::Ids) => &["[10de:2206]", "[10de:1aef]"],
                (TopologyFilter::UsbControllers, _) | (TopologyFilter::UsbGroupRelated, _) => &[
                    "IOMMU Group 21: Advanced Micro Devices, Inc. [AMD]: Matisse USB 3.0 Host Controller: [1022:149c]",
                ],
                _ => &[],
            };
            Ok(lines.iter().map(|line| line.to_string()).collect())
        }
    }

    pub fn system_info() -> SystemInfo {
        SystemInfo {
            bootloader: Bootloader::Grubby,
            cpu_vendor: CpuVendor::AMD,
            virtualization_enabled: true,
            distribution: None,
        }
    }

    pub fn app_in(temp: &TempDir) -> AppState<CannedTopology, RecordingRunner> {
        app_with(temp, CannedTopology)
    }

    pub fn app_with<Q: TopologyQuery>(temp: &TempDir, query: Q) -> AppState<Q, RecordingRunner> {
        let config = config_in(
            temp.path(),
            HostFixture { modprobe: true, dracut: true, mkinitcpio: None },
            Bootloader::Grubby,
        );
        AppState::new(Wizard::new(config, query, RecordingRunner::default()), system_info())
    }

    /// Confirms the first entry of every stage until the password prompt
    pub fn walk_to_install(app: &mut AppState<CannedTopology, RecordingRunner>) {
        while app.wizard.stage() != Stage::Install {
            let confirmation = match app.wizard.stage().expects() {
                ConfirmationKind::Selection => Confirmation::Selection(app.wizard.list().selected_item().cloned()),
                ConfirmationKind::Choice => Confirmation::Choice(true),
                _ => Confirmation::Acknowledge,
            };
            app.wizard.advance(confirmation).unwrap();
        }
    }
}

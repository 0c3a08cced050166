// src/core/bootloader/grubby.rs

use crate::error::Result;
use crate::utils::CommandRunner;

/// Bootloader entries managed through grubby
#[derive(Debug, Default)]
pub struct GrubbyConfig;

impl GrubbyConfig {
    pub fn new() -> Self {
        Self
    }

    /// Adds all parameters to every installed kernel in one grubby call
    pub fn add_parameters(&self, runner: &dyn CommandRunner, params: &[String]) -> Result<()> {
        tracing::info!(?params, "adding kernel parameters with grubby");
        let args = vec![
            "grubby".to_string(),
            "--update-kernel=ALL".to_string(),
            format!("--args={}", params.join(" ")),
        ];
        runner.run("sudo", &args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::RecordingRunner;

    #[test]
    fn updates_all_kernels_at_once() {
        let runner = RecordingRunner::default();
        let params = vec!["intel_iommu=on".to_string(), "vfio_pci.ids=10de:1234".to_string()];

        GrubbyConfig::new().add_parameters(&runner, &params).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sudo");
        assert_eq!(
            calls[0].args,
            vec!["grubby", "--update-kernel=ALL", "--args=intel_iommu=on vfio_pci.ids=10de:1234"]
        );
    }
}

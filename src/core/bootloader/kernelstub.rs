// src/core/bootloader/kernelstub.rs

use crate::error::Result;
use crate::utils::CommandRunner;

/// systemd-boot through Pop!_OS kernelstub
#[derive(Debug, Default)]
pub struct KernelstubConfig;

impl KernelstubConfig {
    pub fn new() -> Self {
        Self
    }

    /// Adds each parameter with `kernelstub -a`; kernelstub applies changes immediately
    pub fn add_parameters(&self, runner: &dyn CommandRunner, params: &[String]) -> Result<()> {
        tracing::info!(?params, "adding kernel parameters with kernelstub");
        for param in params {
            let args = vec!["kernelstub".to_string(), "-a".to_string(), param.clone()];
            runner.run("sudo", &args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::RecordingRunner;

    #[test]
    fn one_invocation_per_parameter() {
        let runner = RecordingRunner::default();
        let params = vec!["amd_iommu=on".to_string(), "iommu=pt".to_string()];

        KernelstubConfig::new().add_parameters(&runner, &params).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["sudo kernelstub -a amd_iommu=on", "sudo kernelstub -a iommu=pt"]
        );
    }

    #[test]
    fn stops_at_first_failure() {
        let runner = RecordingRunner {
            fail_program: Some("sudo".to_string()),
            ..Default::default()
        };
        let params = vec!["amd_iommu=on".to_string(), "iommu=pt".to_string()];

        assert!(KernelstubConfig::new().add_parameters(&runner, &params).is_err());
        assert_eq!(runner.calls.borrow().len(), 1);
    }
}

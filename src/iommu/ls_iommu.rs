// ls-iommu backed topology query

use std::path::PathBuf;

use super::{TopologyQuery, TopologyRequest};
use crate::error::{Error, Result};
use crate::utils::{CommandRunner, SystemRunner};

/// Queries the topology by running the `ls-iommu` binary
#[derive(Debug, Clone)]
pub struct LsIommu<R: CommandRunner = SystemRunner> {
    binary: PathBuf,
    runner: R,
}

impl LsIommu<SystemRunner> {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, SystemRunner)
    }
}

impl<R: CommandRunner> LsIommu<R> {
    pub fn with_runner(binary: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }
}

impl<R: CommandRunner> TopologyQuery for LsIommu<R> {
    fn query(&self, request: &TopologyRequest) -> Result<Vec<String>> {
        let program = self.binary.to_string_lossy();
        let stdout = self
            .runner
            .run(&program, &request.to_args())
            .map_err(|e| Error::Topology(e.to_string()))?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iommu::IommuGroup;
    use crate::utils::testing::RecordingRunner;

    #[test]
    fn passes_request_arguments_to_binary() {
        let query = LsIommu::with_runner("utils/ls-iommu", RecordingRunner::default());
        let lines = query.query(&TopologyRequest::gpu_ids(&IommuGroup::new("07"))).unwrap();

        assert!(lines.is_empty());
        assert_eq!(query.runner.command_lines(), vec!["utils/ls-iommu -gr -i 07 --id"]);
    }

    #[test]
    fn missing_binary_is_a_topology_error() {
        let query = LsIommu::new("/nonexistent/ls-iommu");
        let err = query.query(&TopologyRequest::rom(&IommuGroup::new("1"))).unwrap_err();
        assert!(matches!(err, Error::Topology(_)));
    }
}

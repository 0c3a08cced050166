// Kernel command line fragment
//
// The fragment lives in a single-line file under the config directory. It is
// always deleted and written from scratch, never merged, and the installer
// later hands it to the bootloader tooling verbatim.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::system::CpuVendor;
use crate::error::{Error, Result};

/// Whether vfio-pci should stop the host from driving the passed-through GPU's video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoPolicy {
    /// Set `disable_vga=1` and turn off the EFI framebuffer
    DisableVfioVideo,
    /// Leave video output alone
    KeepVideo,
}

impl VideoPolicy {
    pub fn from_choice(yes: bool) -> Self {
        if yes {
            VideoPolicy::DisableVfioVideo
        } else {
            VideoPolicy::KeepVideo
        }
    }

    /// Value for vfio-pci's `disable_vga` option
    pub fn disable_vga(&self) -> u8 {
        match self {
            VideoPolicy::DisableVfioVideo => 1,
            VideoPolicy::KeepVideo => 0,
        }
    }
}

/// Strips the brackets some tool output wraps around vendor:device ids
pub fn normalize_device_id(raw: &str) -> String {
    raw.trim().trim_start_matches('[').trim_end_matches(']').to_string()
}

/// Deletes any previous fragment and writes the IOMMU and vfio-pci id arguments
pub fn write_cmdline(path: &Path, cpu_vendor: &CpuVendor, device_ids: &[String]) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    }

    let content = format!(
        "{} iommu=pt vfio_pci.ids={}",
        cpu_vendor.iommu_argument(),
        device_ids.join(",")
    );
    tracing::info!(path = %path.display(), %content, "writing kernel arguments");
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// Appends the video policy arguments to the fragment
pub fn append_video_policy(path: &Path, policy: VideoPolicy) -> Result<()> {
    append_argument(path, &format!("vfio_pci.disable_vga={}", policy.disable_vga()))?;
    if policy == VideoPolicy::DisableVfioVideo {
        append_argument(path, "video=efifb:off")?;
    }
    Ok(())
}

/// Appends one space-separated argument to the fragment
pub fn append_argument(path: &Path, argument: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    write!(file, " {}", argument).map_err(|e| Error::io(path, e))
}

/// Reads the fragment back exactly as written
pub fn read_cmdline(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids() -> Vec<String> {
        vec!["10de:1234".to_string(), "10de:aa56".to_string()]
    }

    #[test]
    fn writes_ids_and_video_flags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kernel_args");

        write_cmdline(&path, &CpuVendor::AMD, &ids()).unwrap();
        append_video_policy(&path, VideoPolicy::DisableVfioVideo).unwrap();

        assert_eq!(
            read_cmdline(&path).unwrap(),
            "amd_iommu=on iommu=pt vfio_pci.ids=10de:1234,10de:aa56 vfio_pci.disable_vga=1 video=efifb:off"
        );
    }

    #[test]
    fn keeping_video_only_records_the_option() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kernel_args");

        write_cmdline(&path, &CpuVendor::Intel, &ids()).unwrap();
        append_video_policy(&path, VideoPolicy::KeepVideo).unwrap();

        let content = read_cmdline(&path).unwrap();
        assert!(content.starts_with("intel_iommu=on"));
        assert!(content.ends_with("vfio_pci.disable_vga=0"));
        assert!(!content.contains("efifb"));
    }

    #[test]
    fn rewriting_replaces_previous_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kernel_args");
        fs::write(&path, "old arguments that must not survive").unwrap();

        write_cmdline(&path, &CpuVendor::AMD, &["1002:73bf".to_string()]).unwrap();

        assert_eq!(read_cmdline(&path).unwrap(), "amd_iommu=on iommu=pt vfio_pci.ids=1002:73bf");
    }

    #[test]
    fn device_ids_lose_brackets() {
        assert_eq!(normalize_device_id("[10de:2206]"), "10de:2206");
        assert_eq!(normalize_device_id(" 10de:1aef "), "10de:1aef");
    }
}

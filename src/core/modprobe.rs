// Modprobe rules for vfio-pci
//
// Writes the staged modprobe.d/vfio.conf: claims the device ids for vfio-pci
// and makes sure vfio-pci loads before any driver that could grab the GPU or
// its sibling functions.

use std::fs;

use crate::core::cmdline::VideoPolicy;
use crate::core::config::ConfigPaths;
use crate::error::{Error, Result};

/// Drivers that must wait for vfio-pci, in the order they are written
pub const SOFTDEP_DRIVERS: [&str; 7] = [
    "amdgpu",
    "radeon",
    "nouveau",
    "nvidia",
    "snd_hda_intel",
    "xhci_hcd",
    "drm",
];

/// Renders vfio.conf for the given ids
pub fn render_modprobe(device_ids: &[String], policy: VideoPolicy) -> String {
    let mut lines = vec![
        "## Generated by exliar-quickpass, install to /etc/modprobe.d/vfio.conf".to_string(),
        "## Binds the selected IOMMU group to vfio-pci at boot".to_string(),
        format!(
            "options vfio_pci ids={} disable_vga={}",
            device_ids.join(","),
            policy.disable_vga()
        ),
    ];
    lines.extend(
        SOFTDEP_DRIVERS
            .iter()
            .map(|driver| format!("softdep {} pre: vfio_pci", driver)),
    );
    lines.join("\n") + "\n"
}

/// Writes the staged vfio.conf, replacing any earlier version
pub fn write_modprobe(paths: &ConfigPaths, device_ids: &[String], policy: VideoPolicy) -> Result<()> {
    let path = paths.modprobe_file();
    tracing::info!(path = %path.display(), "writing modprobe rules");
    fs::write(&path, render_modprobe(device_ids, policy)).map_err(|e| Error::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_line_carries_ids_and_vga_flag() {
        let content = render_modprobe(
            &["10de:1234".to_string(), "10de:aa56".to_string()],
            VideoPolicy::DisableVfioVideo,
        );
        assert!(content.contains("options vfio_pci ids=10de:1234,10de:aa56 disable_vga=1\n"));
    }

    #[test]
    fn every_softdep_is_present_once() {
        let content = render_modprobe(&["1002:73bf".to_string()], VideoPolicy::KeepVideo);
        for driver in SOFTDEP_DRIVERS {
            let line = format!("softdep {} pre: vfio_pci", driver);
            assert_eq!(content.matches(&line).count(), 1, "{line}");
        }
        assert!(content.ends_with("softdep drm pre: vfio_pci\n"));
    }
}

// Initramfs configuration
//
// vfio-pci has to be inside the initramfs to claim the GPU before the
// graphics driver does. Dracut gets a drop-in file, mkinitcpio gets its
// staged MODULES and HOOKS arrays rewritten.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::core::cmdline;
use crate::core::config::ConfigPaths;
use crate::error::{Error, Result};

/// Modules loaded ahead of everything else, in load order
pub const VFIO_MODULES: [&str; 3] = ["vfio_pci", "vfio", "vfio_iommu_type1"];

/// Kernel argument asking dracut's initramfs to load vfio_pci first
pub const DRACUT_PRELOAD_ARGUMENT: &str = "rd.driver.pre=vfio_pci";

/// Writes the dracut drop-in and adds the preload argument to the cmdline
pub fn write_dracut(paths: &ConfigPaths) -> Result<()> {
    let path = paths.dracut_file();
    let content = format!("force_drivers+=\" {} \"\n", VFIO_MODULES.join(" "));
    tracing::info!(path = %path.display(), "writing dracut configuration");
    fs::write(&path, content).map_err(|e| Error::io(&path, e))?;

    cmdline::append_argument(&paths.cmdline, DRACUT_PRELOAD_ARGUMENT)
}

/// Rewrites the staged mkinitcpio.conf in place
pub fn write_mkinitcpio(paths: &ConfigPaths) -> Result<()> {
    let path = &paths.mkinitcpio;
    tracing::info!(path = %path.display(), "updating mkinitcpio configuration");
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let updated = update_mkinitcpio(&content)?;
    write_if_changed(path, &content, &updated)
}

fn write_if_changed(path: &Path, current: &str, updated: &str) -> Result<()> {
    if current == updated {
        tracing::debug!(path = %path.display(), "already up-to-date");
        return Ok(());
    }
    fs::write(path, updated).map_err(|e| Error::io(path, e))
}

/// Puts the vfio modules at the front of MODULES and makes sure HOOKS has modconf.
///
/// Existing entries keep their order; duplicates of the vfio modules are dropped.
pub fn update_mkinitcpio(content: &str) -> Result<String> {
    let modules_re = Regex::new(r"(?m)^(?P<prefix>\s*MODULES\s*=\s*\()(?P<items>[^)]*)(?P<suffix>\).*)$")?;
    let hooks_re = Regex::new(r"(?m)^(?P<prefix>\s*HOOKS\s*=\s*\()(?P<items>[^)]*)(?P<suffix>\).*)$")?;

    let mut updated = if modules_re.is_match(content) {
        modules_re
            .replace(content, |caps: &regex::Captures| {
                let mut modules: Vec<&str> = VFIO_MODULES.to_vec();
                modules.extend(
                    caps["items"]
                        .split_whitespace()
                        .filter(|m| !VFIO_MODULES.contains(m)),
                );
                format!("{}{}{}", &caps["prefix"], modules.join(" "), &caps["suffix"])
            })
            .to_string()
    } else {
        let mut appended = content.to_string();
        if !appended.is_empty() && !appended.ends_with('\n') {
            appended.push('\n');
        }
        appended.push_str(&format!("MODULES=({})\n", VFIO_MODULES.join(" ")));
        appended
    };

    updated = hooks_re
        .replace(&updated, |caps: &regex::Captures| {
            let items = &caps["items"];
            if items.split_whitespace().any(|hook| hook == "modconf") {
                return caps[0].to_string();
            }
            let mut hooks: Vec<&str> = items.split_whitespace().collect();
            // modconf reads modprobe.d, so it has to run once udev is up
            let position = hooks
                .iter()
                .position(|hook| *hook == "udev" || *hook == "systemd")
                .map(|idx| idx + 1)
                .unwrap_or(hooks.len());
            hooks.insert(position, "modconf");
            format!("{}{}{}", &caps["prefix"], hooks.join(" "), &caps["suffix"])
        })
        .to_string();

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vfio_modules_are_prepended() {
        let updated = update_mkinitcpio("MODULES=(btrfs crc32c)\nHOOKS=(base udev modconf block)\n").unwrap();
        assert!(updated.contains("MODULES=(vfio_pci vfio vfio_iommu_type1 btrfs crc32c)\n"));
        assert!(updated.contains("HOOKS=(base udev modconf block)\n"));
    }

    #[test]
    fn update_is_idempotent() {
        let once = update_mkinitcpio("MODULES=()\nHOOKS=(base udev block)\n").unwrap();
        let twice = update_mkinitcpio(&once).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("MODULES=(vfio_pci vfio vfio_iommu_type1)\n"));
    }

    #[test]
    fn modconf_is_inserted_after_udev() {
        let updated = update_mkinitcpio("MODULES=()\nHOOKS=(base udev autodetect block filesystems)\n").unwrap();
        assert!(updated.contains("HOOKS=(base udev modconf autodetect block filesystems)\n"));
    }

    #[test]
    fn commented_examples_are_left_alone() {
        let content = "# MODULES=(piix ide_disk)\nMODULES=(i915)\n";
        let updated = update_mkinitcpio(content).unwrap();
        assert!(updated.starts_with("# MODULES=(piix ide_disk)\n"));
        assert!(updated.contains("\nMODULES=(vfio_pci vfio vfio_iommu_type1 i915)\n"));
    }

    #[test]
    fn missing_modules_line_is_appended() {
        let updated = update_mkinitcpio("COMPRESSION=\"zstd\"").unwrap();
        assert_eq!(updated, "COMPRESSION=\"zstd\"\nMODULES=(vfio_pci vfio vfio_iommu_type1)\n");
    }
}

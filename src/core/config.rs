// Configuration targets for Exliar Quickpass
//
// Every artifact is first written into a staging tree under the config
// directory (mirroring /etc) and only copied onto the host by the
// privileged installer. Whether a writer runs depends on whether its staging
// target exists, checked at the moment of use.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::system::{Bootloader, CpuVendor, SystemInfo};
use crate::error::{Error, Result};

/// Staging locations written by the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPaths {
    pub root: PathBuf,
    pub cmdline: PathBuf,
    pub modprobe_dir: PathBuf,
    pub dracut_dir: PathBuf,
    pub mkinitcpio: PathBuf,
    pub config_file: PathBuf,
    pub utils_dir: PathBuf,
    pub vbios_script: PathBuf,
}

impl ConfigPaths {
    pub fn new(config_dir: impl Into<PathBuf>, utils_dir: impl Into<PathBuf>) -> Self {
        let root = config_dir.into();
        let utils_dir = utils_dir.into();
        let etc = root.join("etc");
        Self {
            cmdline: root.join("kernel_args"),
            modprobe_dir: etc.join("modprobe.d"),
            dracut_dir: etc.join("dracut.conf.d"),
            mkinitcpio: etc.join("mkinitcpio.conf"),
            config_file: root.join("config.json"),
            vbios_script: utils_dir.join("dump_vbios.sh"),
            utils_dir,
            root,
        }
    }

    pub fn modprobe_file(&self) -> PathBuf {
        self.modprobe_dir.join("vfio.conf")
    }

    pub fn dracut_file(&self) -> PathBuf {
        self.dracut_dir.join("vfio.conf")
    }

    /// Every path this tool writes, so a rerun can clear them without
    /// touching anything else the operator keeps alongside
    fn owned_artifacts(&self) -> [&Path; 6] {
        [
            &self.cmdline,
            &self.config_file,
            &self.modprobe_dir,
            &self.dracut_dir,
            &self.mkinitcpio,
            &self.vbios_script,
        ]
    }

    pub fn has_modprobe(&self) -> bool {
        self.modprobe_dir.is_dir()
    }

    pub fn has_dracut(&self) -> bool {
        self.dracut_dir.is_dir()
    }

    pub fn has_mkinitcpio(&self) -> bool {
        self.mkinitcpio.is_file()
    }
}

/// Host locations the staged artifacts are installed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPaths {
    pub modprobe_dir: PathBuf,
    pub dracut_dir: PathBuf,
    pub mkinitcpio: PathBuf,
    pub initramfs_tools: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            modprobe_dir: PathBuf::from("/etc/modprobe.d"),
            dracut_dir: PathBuf::from("/etc/dracut.conf.d"),
            mkinitcpio: PathBuf::from("/etc/mkinitcpio.conf"),
            initramfs_tools: PathBuf::from("/etc/initramfs-tools"),
        }
    }
}

/// Everything the wizard and installer know about this host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: ConfigPaths,
    pub system: SystemPaths,
    pub bootloader: Bootloader,
    pub cpu_vendor: CpuVendor,
}

impl Config {
    pub fn new(paths: ConfigPaths, system: SystemPaths, info: &SystemInfo) -> Self {
        Self {
            paths,
            system,
            bootloader: info.bootloader,
            cpu_vendor: info.cpu_vendor.clone(),
        }
    }

    /// Builds the staging tree for this host.
    ///
    /// Artifacts left by an earlier run are removed first; anything else in
    /// the config directory is left alone. A staging target is created only
    /// when the matching host target exists, which is what later gates each
    /// writer.
    pub fn init_scaffolding(&self) -> Result<()> {
        let paths = &self.paths;
        tracing::info!(root = %paths.root.display(), "initializing configuration scaffolding");

        for stale in paths.owned_artifacts() {
            remove_stale(stale)?;
        }
        create_dir(&paths.root)?;
        create_dir(&paths.utils_dir)?;

        if self.system.modprobe_dir.is_dir() {
            create_dir(&paths.modprobe_dir)?;
        }
        if self.system.dracut_dir.is_dir() {
            create_dir(&paths.dracut_dir)?;
        }
        if self.system.mkinitcpio.is_file() {
            if let Some(parent) = paths.mkinitcpio.parent() {
                create_dir(parent)?;
            }
            fs::copy(&self.system.mkinitcpio, &paths.mkinitcpio)
                .map_err(|e| Error::io(&paths.mkinitcpio, e))?;
        }

        self.save()
    }

    /// Writes the detected configuration as JSON for the operator to inspect
    pub fn save(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(&self.paths.config_file, serialized).map_err(|e| Error::io(&self.paths.config_file, e))
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

fn remove_stale(path: &Path) -> Result<()> {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    removed.map_err(|e| Error::io(path, e))
}

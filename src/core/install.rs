// Privileged installer
//
// Runs once, after the operator has confirmed everything: elevates with the
// captured credential, discards it, copies the staged artifacts onto the host
// and hands the kernel arguments to the detected bootloader tooling.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::core::bootloader::{split_parameters, GrubbyConfig, KernelstubConfig};
use crate::core::cmdline;
use crate::core::config::Config;
use crate::core::system::Bootloader;
use crate::error::{Error, Result};
use crate::utils::{timestamped_backup_path, CommandRunner};

/// What the installer did with the kernel arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The bootloader tooling was updated
    Configured { bootloader: Bootloader, kernel_args: String },
    /// No supported tooling; the operator has to add these arguments by hand
    Manual { kernel_args: String },
}

impl InstallOutcome {
    pub fn kernel_args(&self) -> &str {
        match self {
            InstallOutcome::Configured { kernel_args, .. } | InstallOutcome::Manual { kernel_args } => kernel_args,
        }
    }
}

/// Performs the privileged configuration writes
pub struct Installer<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Elevates once with `auth` and applies the staged configuration.
    ///
    /// Not reentrant: the sudo timestamp obtained here is reused by every
    /// following command.
    pub fn install(&self, auth: SecretString) -> Result<InstallOutcome> {
        tracing::info!("getting authentication token by elevating with sudo once");
        self.elevate(&auth)?;

        tracing::info!("discarding credential");
        drop(auth);

        let kernel_args = cmdline::read_cmdline(&self.config.paths.cmdline)?;
        let params = split_parameters(&kernel_args);

        match self.config.bootloader {
            Bootloader::KernelStub => {
                tracing::info!("configuring systemd-boot using kernelstub");
                self.install_staged_files()?;
                self.regenerate_initramfs()?;
                KernelstubConfig::new().add_parameters(self.runner, &params)?;
            }
            Bootloader::Grubby => {
                tracing::info!("configuring bootloader using grubby");
                self.install_staged_files()?;
                self.regenerate_initramfs()?;
                GrubbyConfig::new().add_parameters(self.runner, &params)?;
            }
            Bootloader::Unsupported => {
                tracing::warn!("unsupported bootloader, kernel arguments must be added manually");
                return Ok(InstallOutcome::Manual { kernel_args });
            }
        }

        Ok(InstallOutcome::Configured {
            bootloader: self.config.bootloader,
            kernel_args,
        })
    }

    /// Validates the credential with `sudo -S -v`, caching the sudo timestamp
    fn elevate(&self, auth: &SecretString) -> Result<()> {
        let args = vec!["-S".to_string(), "-p".to_string(), String::new(), "-v".to_string()];
        self.runner
            .run_with_stdin("sudo", &args, auth.expose_secret().as_bytes())
            .map(|_| ())
            .map_err(|e| match e {
                Error::CommandFailed { stderr, .. } => Error::Elevation(stderr),
                other => Error::Elevation(other.to_string()),
            })
    }

    /// Staged artifact and host destination pairs, for artifacts that were written
    fn staged_files(&self) -> Vec<(PathBuf, PathBuf)> {
        let paths = &self.config.paths;
        let system = &self.config.system;
        [
            (paths.modprobe_file(), system.modprobe_dir.join("vfio.conf")),
            (paths.dracut_file(), system.dracut_dir.join("vfio.conf")),
            (paths.mkinitcpio.clone(), system.mkinitcpio.clone()),
        ]
        .into_iter()
        .filter(|(staged, _)| staged.is_file())
        .collect()
    }

    fn install_staged_files(&self) -> Result<()> {
        for (staged, host) in self.staged_files() {
            if host.exists() {
                let backup = timestamped_backup_path(&host);
                tracing::info!(file = %host.display(), backup = %backup.display(), "backing up host file");
                self.sudo_copy(&host, &backup)?;
            }
            tracing::info!(from = %staged.display(), to = %host.display(), "installing configuration");
            self.sudo_copy(&staged, &host)?;
        }
        Ok(())
    }

    fn sudo_copy(&self, from: &Path, to: &Path) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            "-f".to_string(),
            from.display().to_string(),
            to.display().to_string(),
        ];
        self.runner.run("sudo", &args).map(|_| ())
    }

    /// Picks the initramfs generator that matches the staged configuration
    fn regenerate_initramfs(&self) -> Result<()> {
        let paths = &self.config.paths;
        let command: &[&str] = if paths.dracut_file().is_file() {
            &["dracut", "-f"]
        } else if paths.has_mkinitcpio() {
            &["mkinitcpio", "-P"]
        } else if self.config.system.initramfs_tools.is_dir() {
            &["update-initramfs", "-u", "-k", "all"]
        } else {
            tracing::warn!("no supported initramfs generator found, skipping regeneration");
            return Ok(());
        };

        tracing::info!(command = %command.join(" "), "regenerating initramfs");
        let args: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        self.runner.run("sudo", &args).map(|_| ())
    }
}

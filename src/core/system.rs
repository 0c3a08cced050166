// System detection module for Exliar Quickpass
//
// This module handles detection of the host properties the wizard needs:
// - Bootloader tooling (kernelstub, grubby)
// - CPU vendor, which decides the IOMMU kernel argument
// - Virtualization support and distribution details for the summary

use std::fmt;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::utils::find_in_path;

/// Bootloader tooling the installer knows how to drive.
///
/// Produced once at detection time; the installer matches it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bootloader {
    /// systemd-boot managed through Pop!_OS kernelstub
    KernelStub,
    /// Any bootloader managed through grubby (Fedora, RHEL)
    Grubby,
    /// No supported tooling; kernel arguments must be applied by hand
    Unsupported,
}

impl fmt::Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bootloader::KernelStub => write!(f, "kernelstub"),
            Bootloader::Grubby => write!(f, "grubby"),
            Bootloader::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Represents the system's CPU vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuVendor {
    AMD,
    Intel,
    Other(String),
}

impl CpuVendor {
    /// Kernel argument that turns the IOMMU on for this vendor
    pub fn iommu_argument(&self) -> &'static str {
        match self {
            CpuVendor::AMD => "amd_iommu=on",
            // Intel is the fallback; the AMD driver enables itself by default
            CpuVendor::Intel | CpuVendor::Other(_) => "intel_iommu=on",
        }
    }
}

/// Holds information about the Linux distribution
#[derive(Debug, Clone)]
pub struct Distribution {
    pub name: String,
    pub version: String,
    pub id: String,
}

/// Contains all detected system information
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub bootloader: Bootloader,
    pub cpu_vendor: CpuVendor,
    pub virtualization_enabled: bool,
    pub distribution: Option<Distribution>,
}

impl SystemInfo {
    /// Detects and collects all system information
    pub fn detect() -> Self {
        let cpuinfo = fs::read_to_string("/proc/cpuinfo").unwrap_or_default();
        let os_release = fs::read_to_string("/etc/os-release").unwrap_or_default();

        SystemInfo {
            bootloader: detect_bootloader(),
            cpu_vendor: parse_cpu_vendor(&cpuinfo),
            virtualization_enabled: parse_virtualization_support(&cpuinfo),
            distribution: parse_distribution(&os_release),
        }
    }

    /// Returns a textual summary of the system information
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Bootloader: {}\n", self.bootloader));
        summary.push_str(&format!("CPU Vendor: {:?}\n", self.cpu_vendor));
        summary.push_str(&format!(
            "Virtualization: {}\n",
            if self.virtualization_enabled { "Enabled" } else { "Disabled" }
        ));

        if let Some(ref distro) = self.distribution {
            summary.push_str(&format!("Distribution: {} {} ({})\n", distro.name, distro.version, distro.id));
        }

        summary
    }
}

/// Detects which bootloader tooling is installed, kernelstub first
fn detect_bootloader() -> Bootloader {
    bootloader_from_tools(
        find_in_path("kernelstub").is_some(),
        find_in_path("grubby").is_some(),
    )
}

fn bootloader_from_tools(has_kernelstub: bool, has_grubby: bool) -> Bootloader {
    if has_kernelstub {
        Bootloader::KernelStub
    } else if has_grubby {
        Bootloader::Grubby
    } else {
        Bootloader::Unsupported
    }
}

/// Reads the CPU vendor out of /proc/cpuinfo content
fn parse_cpu_vendor(cpuinfo: &str) -> CpuVendor {
    for line in cpuinfo.lines() {
        if line.starts_with("vendor_id") {
            if line.contains("AuthenticAMD") {
                return CpuVendor::AMD;
            } else if line.contains("GenuineIntel") {
                return CpuVendor::Intel;
            } else if let Some(vendor) = line.split(':').nth(1) {
                return CpuVendor::Other(vendor.trim().to_string());
            }
            break;
        }
    }

    CpuVendor::Other("Unknown".to_string())
}

/// Checks the first flags line for AMD-V (svm) or VT-x (vmx)
fn parse_virtualization_support(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("flags"))
        .map(|line| line.split_whitespace().any(|flag| flag == "svm" || flag == "vmx"))
        .unwrap_or(false)
}

/// Reads NAME, VERSION and ID from os-release content
fn parse_distribution(os_release: &str) -> Option<Distribution> {
    let mut name = String::new();
    let mut version = String::new();
    let mut id = String::new();

    for line in os_release.lines() {
        if let Some(value) = line.strip_prefix("NAME=") {
            name = value.trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("VERSION=") {
            version = value.trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("ID=") {
            id = value.trim_matches('"').to_string();
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(Distribution { name, version, id })
    }
}

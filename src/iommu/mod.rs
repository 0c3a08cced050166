// IOMMU topology module for Exliar Quickpass
//
// Device enumeration is delegated to the external `ls-iommu` tool. This
// module describes queries against it and parses the line-oriented output
// into typed records.

pub mod ls_iommu;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Field selection used for every device listing shown to the operator
pub const DEVICE_FIELDS: &str = "vendor:,prod_name,optional_revision:,device_id";

static GROUP_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Returns the first run of 1 to 3 digits in `descriptor`.
///
/// First match wins. A vendor name containing digits ahead of the group
/// number yields the wrong group; callers only pass descriptors whose group
/// label comes first.
pub fn extract_iommu_group(descriptor: &str) -> Option<IommuGroup> {
    let pattern = GROUP_PATTERN.get_or_init(|| Regex::new(r"\d{1,3}").expect("valid group pattern"));
    pattern
        .find(descriptor)
        .map(|m| IommuGroup(m.as_str().to_string()))
}

/// An IOMMU group number, kept as the literal text the tool printed ("07")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IommuGroup(String);

impl IommuGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IommuGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One PCI function as reported by the topology tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub descriptor: String,        // Group label, e.g. "IOMMU Group 16"
    pub vendor: String,            // e.g. "NVIDIA Corporation"
    pub product: String,           // e.g. "GA102 [GeForce RTX 3080]"
    pub revision: Option<String>,  // e.g. "a1"
    pub device_id: String,         // e.g. "[10de:2206]"
}

impl DeviceRecord {
    /// Parses one output line of the form
    /// `IOMMU Group <n>: <vendor>: <product> [(rev <r>)]: <device id>`.
    ///
    /// Missing segments are left empty; only blank lines are rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let parts: Vec<&str> = line.split(": ").map(str::trim).collect();
        let descriptor = parts[0].to_string();
        let vendor = parts.get(1).map(|s| s.to_string()).unwrap_or_default();

        let (product_raw, device_id) = match parts.len() {
            0..=2 => (String::new(), String::new()),
            3 => (parts[2].to_string(), String::new()),
            n => (parts[2..n - 1].join(": "), parts[n - 1].to_string()),
        };
        let (product, revision) = split_revision(&product_raw);

        Some(DeviceRecord {
            descriptor,
            vendor,
            product,
            revision,
            device_id,
        })
    }

    /// The IOMMU group this function belongs to, if the descriptor carries one
    pub fn iommu_group(&self) -> Option<IommuGroup> {
        extract_iommu_group(&self.descriptor)
    }
}

/// Splits a trailing `(rev xx)` or `rev xx` off a product name
fn split_revision(product: &str) -> (String, Option<String>) {
    let trimmed = product.trim();
    if let Some(idx) = trimmed.rfind("(rev ") {
        if trimmed.ends_with(')') {
            let rev = trimmed[idx + 5..trimmed.len() - 1].trim().to_string();
            return (trimmed[..idx].trim_end().to_string(), Some(rev));
        }
    }
    if let Some(idx) = trimmed.rfind(" rev ") {
        let rev = trimmed[idx + 5..].trim();
        if !rev.is_empty() && !rev.contains(' ') {
            return (trimmed[..idx].trim_end().to_string(), Some(rev.to_string()));
        }
    }
    (trimmed.to_string(), None)
}

/// Which slice of the topology a query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyFilter {
    /// Every GPU (`-g`), or one group when a group id is given
    Gpus,
    /// Every USB controller (`-u`)
    UsbControllers,
    /// Functions sharing the group or the device id of a GPU (`-grr`)
    GpuGroupRelated,
    /// Functions in a GPU's group (`-gr`)
    GpuGroup,
    /// USB controller functions in a group (`-ur`)
    UsbGroupRelated,
}

impl TopologyFilter {
    pub fn flag(&self) -> &'static str {
        match self {
            TopologyFilter::Gpus => "-g",
            TopologyFilter::UsbControllers => "-u",
            TopologyFilter::GpuGroupRelated => "-grr",
            TopologyFilter::GpuGroup => "-gr",
            TopologyFilter::UsbGroupRelated => "-ur",
        }
    }
}

/// What each output line should contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedFields {
    /// A `-F` format string, e.g. [`DEVICE_FIELDS`]
    Format(String),
    /// Only vendor:device ids (`--id`)
    Ids,
    /// Only VBIOS ROM paths (`--rom`)
    Rom,
}

/// A single invocation of the topology tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyRequest {
    pub filter: TopologyFilter,
    pub group: Option<IommuGroup>,
    pub fields: RequestedFields,
}

impl TopologyRequest {
    /// Device listing for a filter, optionally restricted to one group
    pub fn devices(filter: TopologyFilter, group: Option<&IommuGroup>) -> Self {
        Self {
            filter,
            group: group.cloned(),
            fields: RequestedFields::Format(DEVICE_FIELDS.to_string()),
        }
    }

    /// Device ids of every function in a GPU's group
    pub fn gpu_ids(group: &IommuGroup) -> Self {
        Self {
            filter: TopologyFilter::GpuGroup,
            group: Some(group.clone()),
            fields: RequestedFields::Ids,
        }
    }

    /// VBIOS ROM paths for a GPU group
    pub fn rom(group: &IommuGroup) -> Self {
        Self {
            filter: TopologyFilter::Gpus,
            group: Some(group.clone()),
            fields: RequestedFields::Rom,
        }
    }

    /// Command line arguments for the topology tool
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.filter.flag().to_string()];
        if let Some(group) = &self.group {
            args.push("-i".to_string());
            args.push(group.to_string());
        }
        match &self.fields {
            RequestedFields::Format(format) => {
                args.push("-F".to_string());
                args.push(format.clone());
            }
            RequestedFields::Ids => args.push("--id".to_string()),
            RequestedFields::Rom => args.push("--rom".to_string()),
        }
        args
    }
}

/// Synchronous access to the host's IOMMU topology.
///
/// Implementations return raw output lines in tool order; an empty vector is
/// a valid answer.
pub trait TopologyQuery {
    fn query(&self, request: &TopologyRequest) -> Result<Vec<String>>;
}

/// Runs a device listing and parses every non-blank line
pub fn query_devices(query: &dyn TopologyQuery, request: &TopologyRequest) -> Result<Vec<DeviceRecord>> {
    Ok(query
        .query(request)?
        .iter()
        .filter_map(|line| DeviceRecord::parse(line))
        .collect())
}

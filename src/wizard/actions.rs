// Stage actions
//
// Each handler takes only the facts and collaborators its stage needs and
// returns what the stage derives. The state machine stores the results.

use std::path::PathBuf;

use crate::core::cmdline::{self, normalize_device_id, VideoPolicy};
use crate::core::config::Config;
use crate::core::{initramfs, modprobe, vbios};
use crate::error::{Error, Result};
use crate::iommu::{extract_iommu_group, query_devices, IommuGroup, TopologyFilter, TopologyQuery, TopologyRequest};
use crate::wizard::list::{SelectionItem, SelectionList};

/// Runs a device listing; a failed query degrades to an empty list
pub fn device_list(query: &dyn TopologyQuery, request: &TopologyRequest) -> SelectionList {
    match query_devices(query, request) {
        Ok(records) => SelectionList::from_records(&records),
        Err(e) => {
            tracing::warn!(error = %e, ?request, "topology query failed, showing an empty list");
            SelectionList::default()
        }
    }
}

/// Runs a raw query; a failed query degrades to no lines
fn raw_lines(query: &dyn TopologyQuery, request: &TopologyRequest) -> Vec<String> {
    query.query(request).unwrap_or_else(|e| {
        tracing::warn!(error = %e, ?request, "topology query failed");
        Vec::new()
    })
}

/// Recovers the IOMMU group from a chosen item
pub fn group_of(item: &SelectionItem) -> Result<IommuGroup> {
    extract_iommu_group(&item.description).ok_or_else(|| Error::MissingIommuGroup(item.description.clone()))
}

/// ChooseGpu: the chosen group plus every function sharing it or the GPU's device id
pub fn choose_gpu(query: &dyn TopologyQuery, item: &SelectionItem) -> Result<(IommuGroup, SelectionList)> {
    let group = group_of(item)?;
    tracing::info!(%group, gpu = %item.title, "GPU selected");
    let members = device_list(query, &TopologyRequest::devices(TopologyFilter::GpuGroupRelated, Some(&group)));
    Ok((group, members))
}

/// ChooseGpuGroup: finds the VBIOS ROM of the group and writes the dumper script
pub fn locate_vbios(query: &dyn TopologyQuery, config: &Config, group: &IommuGroup) -> Result<Option<PathBuf>> {
    let rom = raw_lines(query, &TopologyRequest::rom(group))
        .into_iter()
        .next()
        .map(PathBuf::from);

    match &rom {
        Some(path) => vbios::write_dumper(&config.paths.vbios_script, path)?,
        None => tracing::warn!(%group, "no VBIOS ROM path reported, skipping dumper script"),
    }
    Ok(rom)
}

/// ChooseUsb: USB controller functions in the chosen controller's group
pub fn choose_usb(query: &dyn TopologyQuery, item: &SelectionItem) -> Result<SelectionList> {
    let group = group_of(item)?;
    tracing::info!(%group, controller = %item.title, "USB controller selected");
    Ok(device_list(
        query,
        &TopologyRequest::devices(TopologyFilter::UsbGroupRelated, Some(&group)),
    ))
}

/// Device ids of every function in the GPU group, without brackets
pub fn gpu_device_ids(query: &dyn TopologyQuery, group: &IommuGroup) -> Vec<String> {
    raw_lines(query, &TopologyRequest::gpu_ids(group))
        .iter()
        .map(|id| normalize_device_id(id))
        .filter(|id| !id.is_empty())
        .collect()
}

/// ChooseVideoPolicy: rewrites the cmdline and every boot artifact whose target exists
pub fn emit_boot_configuration(config: &Config, device_ids: &[String], policy: VideoPolicy) -> Result<()> {
    let paths = &config.paths;

    cmdline::write_cmdline(&paths.cmdline, &config.cpu_vendor, device_ids)?;
    cmdline::append_video_policy(&paths.cmdline, policy)?;

    if paths.has_modprobe() {
        modprobe::write_modprobe(paths, device_ids, policy)?;
    }
    if paths.has_dracut() {
        initramfs::write_dracut(paths)?;
    }
    if paths.has_mkinitcpio() {
        initramfs::write_mkinitcpio(paths)?;
    }
    Ok(())
}

// Facts accumulated while the wizard runs
//
// Each field is written by exactly one stage action and only read by later
// stages. Stage ordering guarantees a field is populated before any stage
// that reads it is reachable.

use std::path::PathBuf;

use crate::core::cmdline::VideoPolicy;
use crate::iommu::IommuGroup;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardFacts {
    chosen_gpu_group: Option<IommuGroup>,    // written by ChooseGpu
    vbios_path: Option<PathBuf>,             // written by ChooseGpuGroup, None when no ROM was found
    gpu_device_ids: Vec<String>,             // written by ChooseVideoPolicy
    video_policy: Option<VideoPolicy>,       // written by ChooseVideoPolicy
}

impl WizardFacts {
    pub fn chosen_gpu_group(&self) -> Option<&IommuGroup> {
        self.chosen_gpu_group.as_ref()
    }

    pub fn vbios_path(&self) -> Option<&PathBuf> {
        self.vbios_path.as_ref()
    }

    pub fn gpu_device_ids(&self) -> &[String] {
        &self.gpu_device_ids
    }

    pub fn video_policy(&self) -> Option<VideoPolicy> {
        self.video_policy
    }

    pub(super) fn set_chosen_gpu_group(&mut self, group: IommuGroup) {
        debug_assert!(self.chosen_gpu_group.is_none(), "GPU group written twice");
        self.chosen_gpu_group = Some(group);
    }

    pub(super) fn set_vbios_path(&mut self, path: Option<PathBuf>) {
        debug_assert!(self.vbios_path.is_none(), "VBIOS path written twice");
        self.vbios_path = path;
    }

    pub(super) fn set_gpu_device_ids(&mut self, ids: Vec<String>) {
        debug_assert!(self.gpu_device_ids.is_empty(), "GPU device ids written twice");
        self.gpu_device_ids = ids;
    }

    pub(super) fn set_video_policy(&mut self, policy: VideoPolicy) {
        debug_assert!(self.video_policy.is_none(), "video policy written twice");
        self.video_policy = Some(policy);
    }
}

// Wizard state machine for Exliar Quickpass
//
// The wizard owns the current stage, the list shown for it and the facts
// derived so far. Every operator confirmation runs exactly one stage action
// and moves the machine forward; nothing else mutates the facts.

pub mod actions;
pub mod facts;
pub mod list;

use std::fmt;

use secrecy::SecretString;

use crate::core::cmdline::VideoPolicy;
use crate::core::config::Config;
use crate::core::install::{InstallOutcome, Installer};
use crate::error::{Error, Result};
use crate::iommu::{TopologyFilter, TopologyQuery, TopologyRequest};
use crate::utils::CommandRunner;

pub use facts::WizardFacts;
pub use list::{SelectionItem, SelectionList, NO, YES};

/// Wizard stages, in the order they are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Intro,
    ChooseGpu,
    ChooseGpuGroup,
    ChooseUsb,
    ChooseUsbGroup,
    ConfirmVbios,
    ChooseVideoPolicy,
    Install,
    Done,
}

impl Stage {
    /// The stage that follows this one; `Done` is terminal
    pub fn next(&self) -> Stage {
        match self {
            Stage::Intro => Stage::ChooseGpu,
            Stage::ChooseGpu => Stage::ChooseGpuGroup,
            Stage::ChooseGpuGroup => Stage::ChooseUsb,
            Stage::ChooseUsb => Stage::ChooseUsbGroup,
            Stage::ChooseUsbGroup => Stage::ConfirmVbios,
            Stage::ConfirmVbios => Stage::ChooseVideoPolicy,
            Stage::ChooseVideoPolicy => Stage::Install,
            Stage::Install => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }

    /// The confirmation payload this stage accepts
    pub fn expects(&self) -> ConfirmationKind {
        match self {
            Stage::ChooseGpu | Stage::ChooseUsb => ConfirmationKind::Selection,
            Stage::ChooseVideoPolicy => ConfirmationKind::Choice,
            Stage::Install => ConfirmationKind::Authenticate,
            Stage::Intro
            | Stage::ChooseGpuGroup
            | Stage::ChooseUsbGroup
            | Stage::ConfirmVbios
            | Stage::Done => ConfirmationKind::Acknowledge,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Intro => "Welcome",
            Stage::ChooseGpu => "Select GPU",
            Stage::ChooseGpuGroup => "GPU IOMMU Group",
            Stage::ChooseUsb => "Select USB Controller",
            Stage::ChooseUsbGroup => "USB IOMMU Group",
            Stage::ConfirmVbios => "VBIOS",
            Stage::ChooseVideoPolicy => "Video Output",
            Stage::Install => "Install",
            Stage::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// The payload type of a [`Confirmation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Acknowledge,
    Selection,
    Choice,
    Authenticate,
}

/// An operator confirmation for the current stage
#[derive(Debug)]
pub enum Confirmation {
    /// Plain OK
    Acknowledge,
    /// The highlighted list item, `None` when the list is empty
    Selection(Option<SelectionItem>),
    /// YES (true) or NO (false)
    Choice(bool),
    /// The credential for privilege elevation
    Authenticate(SecretString),
}

impl Confirmation {
    pub fn kind(&self) -> ConfirmationKind {
        match self {
            Confirmation::Acknowledge => ConfirmationKind::Acknowledge,
            Confirmation::Selection(_) => ConfirmationKind::Selection,
            Confirmation::Choice(_) => ConfirmationKind::Choice,
            Confirmation::Authenticate(_) => ConfirmationKind::Authenticate,
        }
    }
}

/// The passthrough wizard
pub struct Wizard<Q: TopologyQuery, R: CommandRunner> {
    stage: Stage,
    facts: WizardFacts,
    list: SelectionList,
    config: Config,
    query: Q,
    runner: R,
    install_outcome: Option<InstallOutcome>,
}

impl<Q: TopologyQuery, R: CommandRunner> Wizard<Q, R> {
    pub fn new(config: Config, query: Q, runner: R) -> Self {
        Self {
            stage: Stage::Intro,
            facts: WizardFacts::default(),
            list: SelectionList::default(),
            config,
            query,
            runner,
            install_outcome: None,
        }
    }

    /// Runs the current stage's action for `confirmation`.
    ///
    /// Returns `true` when the caller should move on: after the video policy
    /// stage that means starting the privileged phase, after `Done` it means
    /// exiting. A selection stage confirmed with an empty list stays put and
    /// returns `false`.
    pub fn advance(&mut self, confirmation: Confirmation) -> Result<bool> {
        let expected = self.stage.expects();
        if confirmation.kind() != expected {
            return Err(Error::ConfirmationMismatch {
                stage: self.stage,
                expected,
                got: confirmation.kind(),
            });
        }

        tracing::debug!(stage = ?self.stage, "advancing");
        let query: &dyn TopologyQuery = &self.query;

        match (self.stage, confirmation) {
            (Stage::Intro, Confirmation::Acknowledge) => {
                self.config.init_scaffolding()?;
                self.list = actions::device_list(query, &TopologyRequest::devices(TopologyFilter::Gpus, None));
            }
            (Stage::ChooseGpu, Confirmation::Selection(item)) => {
                let Some(item) = item else {
                    tracing::warn!("no GPU to select");
                    return Ok(false);
                };
                let (group, members) = actions::choose_gpu(query, &item)?;
                self.facts.set_chosen_gpu_group(group);
                self.list = members;
            }
            (Stage::ChooseGpuGroup, Confirmation::Acknowledge) => {
                let group = self.gpu_group()?;
                let vbios = actions::locate_vbios(query, &self.config, &group)?;
                self.facts.set_vbios_path(vbios);
                self.list = actions::device_list(
                    query,
                    &TopologyRequest::devices(TopologyFilter::UsbControllers, None),
                );
            }
            (Stage::ChooseUsb, Confirmation::Selection(item)) => {
                let Some(item) = item else {
                    tracing::warn!("no USB controller to select");
                    return Ok(false);
                };
                self.list = actions::choose_usb(query, &item)?;
            }
            (Stage::ChooseUsbGroup, Confirmation::Acknowledge) => {
                self.list = SelectionList::default();
            }
            (Stage::ConfirmVbios, Confirmation::Acknowledge) => {
                self.list = SelectionList::yes_no(
                    "Disable host video output on the passed-through GPU",
                    "Keep host video output enabled",
                );
            }
            (Stage::ChooseVideoPolicy, Confirmation::Choice(yes)) => {
                let group = self.gpu_group()?;
                let ids = actions::gpu_device_ids(query, &group);
                let policy = VideoPolicy::from_choice(yes);
                actions::emit_boot_configuration(&self.config, &ids, policy)?;

                self.facts.set_gpu_device_ids(ids);
                self.facts.set_video_policy(policy);
                self.list = SelectionList::default();
                self.stage = Stage::Install;
                return Ok(true);
            }
            (Stage::Install, Confirmation::Authenticate(auth)) => {
                let outcome = Installer::new(&self.config, &self.runner).install(auth)?;
                if let InstallOutcome::Manual { kernel_args } = &outcome {
                    tracing::warn!(%kernel_args, "add these kernel arguments to your bootloader manually");
                }
                self.install_outcome = Some(outcome);
                self.stage = Stage::Done;
                return Ok(false);
            }
            (Stage::Done, Confirmation::Acknowledge) => return Ok(true),
            (stage, other) => {
                return Err(Error::ConfirmationMismatch {
                    stage,
                    expected,
                    got: other.kind(),
                })
            }
        }

        self.stage = self.stage.next();
        Ok(false)
    }

    /// The GPU group recorded by ChooseGpu, which precedes every reader
    fn gpu_group(&self) -> Result<crate::iommu::IommuGroup> {
        self.facts
            .chosen_gpu_group()
            .cloned()
            .ok_or_else(|| Error::MissingIommuGroup(String::from("no GPU group recorded")))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn facts(&self) -> &WizardFacts {
        &self.facts
    }

    pub fn list(&self) -> &SelectionList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut SelectionList {
        &mut self.list
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn install_outcome(&self) -> Option<&InstallOutcome> {
        self.install_outcome.as_ref()
    }
}

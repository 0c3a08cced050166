// End-to-end wizard run against a fake host

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use exliar_quickpass::core::config::{Config, ConfigPaths, SystemPaths};
use exliar_quickpass::core::install::InstallOutcome;
use exliar_quickpass::core::system::{Bootloader, CpuVendor};
use exliar_quickpass::error::Result;
use exliar_quickpass::iommu::{RequestedFields, TopologyFilter, TopologyQuery, TopologyRequest};
use exliar_quickpass::utils::CommandRunner;
use exliar_quickpass::wizard::{Confirmation, Stage, Wizard};
use secrecy::SecretString;
use tempfile::TempDir;

const GPU: &str = "IOMMU Group 07: Advanced Micro Devices, Inc. [AMD/ATI]: Navi 21 [Radeon RX 6800] (rev c1): [1002:73bf]";
const GPU_AUDIO: &str = "IOMMU Group 07: Advanced Micro Devices, Inc. [AMD/ATI]: Navi 21 HDMI Audio: [1002:ab28]";
const USB: &str = "IOMMU Group 21: Advanced Micro Devices, Inc. [AMD]: Matisse USB 3.0 Host Controller: [1022:149c]";

struct FakeHost;

impl TopologyQuery for FakeHost {
    fn query(&self, request: &TopologyRequest) -> Result<Vec<String>> {
        let lines: &[&str] = match (request.filter, &request.fields) {
            (TopologyFilter::Gpus, RequestedFields::Format(_)) => &[GPU],
            (TopologyFilter::Gpus, RequestedFields::Rom) => &["/sys/devices/pci0000:00/0000:00:03.1/0000:0b:00.0/rom"],
            (TopologyFilter::GpuGroupRelated, _) => &[GPU, GPU_AUDIO],
            (TopologyFilter::GpuGroup, RequestedFields::Ids) => &["[1002:73bf]", "[1002:ab28]"],
            (TopologyFilter::UsbControllers, _) | (TopologyFilter::UsbGroupRelated, _) => &[USB],
            _ => &[],
        };
        Ok(lines.iter().map(|line| line.to_string()).collect())
    }
}

#[derive(Default)]
struct Recorder {
    lines: RefCell<Vec<String>>,
}

impl CommandRunner for Recorder {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        self.lines.borrow_mut().push(format!("{} {}", program, args.join(" ")));
        Ok(String::new())
    }

    fn run_with_stdin(&self, program: &str, args: &[String], _input: &[u8]) -> Result<String> {
        self.run(program, args)
    }
}

fn fake_host(root: &Path, bootloader: Bootloader) -> Config {
    let etc = root.join("host/etc");
    fs::create_dir_all(etc.join("modprobe.d")).unwrap();
    fs::create_dir_all(etc.join("dracut.conf.d")).unwrap();

    Config {
        paths: ConfigPaths::new(root.join("config"), root.join("utils")),
        system: SystemPaths {
            modprobe_dir: etc.join("modprobe.d"),
            dracut_dir: etc.join("dracut.conf.d"),
            mkinitcpio: etc.join("mkinitcpio.conf"),
            initramfs_tools: etc.join("initramfs-tools"),
        },
        bootloader,
        cpu_vendor: CpuVendor::AMD,
    }
}

fn run_to_install(wizard: &mut Wizard<FakeHost, Recorder>, disable_video: bool) {
    wizard.advance(Confirmation::Acknowledge).unwrap();
    let gpu = wizard.list().selected_item().cloned();
    wizard.advance(Confirmation::Selection(gpu)).unwrap();
    wizard.advance(Confirmation::Acknowledge).unwrap();
    let usb = wizard.list().selected_item().cloned();
    wizard.advance(Confirmation::Selection(usb)).unwrap();
    wizard.advance(Confirmation::Acknowledge).unwrap();
    wizard.advance(Confirmation::Acknowledge).unwrap();
    assert!(wizard.advance(Confirmation::Choice(disable_video)).unwrap());
    assert_eq!(wizard.stage(), Stage::Install);
}

#[test]
fn full_run_with_grubby() {
    let temp = TempDir::new().unwrap();
    let mut wizard = Wizard::new(fake_host(temp.path(), Bootloader::Grubby), FakeHost, Recorder::default());

    run_to_install(&mut wizard, true);

    let paths = wizard.config().paths.clone();
    let expected_args = "amd_iommu=on iommu=pt vfio_pci.ids=1002:73bf,1002:ab28 vfio_pci.disable_vga=1 \
                         video=efifb:off rd.driver.pre=vfio_pci";
    assert_eq!(fs::read_to_string(&paths.cmdline).unwrap(), expected_args);
    assert!(fs::read_to_string(paths.modprobe_file()).unwrap().contains("1002:73bf,1002:ab28"));
    assert!(paths.dracut_file().is_file());
    assert!(paths.vbios_script.is_file());
    assert_eq!(wizard.facts().chosen_gpu_group().map(|g| g.as_str()), Some("07"));

    let auth = SecretString::from("correct horse".to_string());
    assert!(!wizard.advance(Confirmation::Authenticate(auth)).unwrap());
    assert_eq!(wizard.stage(), Stage::Done);
    assert!(matches!(
        wizard.install_outcome(),
        Some(InstallOutcome::Configured { bootloader: Bootloader::Grubby, .. })
    ));
    assert!(wizard.advance(Confirmation::Acknowledge).unwrap());
}

#[test]
fn unsupported_bootloader_reports_arguments() {
    let temp = TempDir::new().unwrap();
    let mut wizard = Wizard::new(fake_host(temp.path(), Bootloader::Unsupported), FakeHost, Recorder::default());

    run_to_install(&mut wizard, false);
    wizard
        .advance(Confirmation::Authenticate(SecretString::from("pw".to_string())))
        .unwrap();

    let written = fs::read_to_string(&wizard.config().paths.cmdline).unwrap();
    assert_eq!(
        wizard.install_outcome(),
        Some(&InstallOutcome::Manual { kernel_args: written })
    );
}

#[test]
fn rerunning_the_video_stage_is_byte_identical() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    let mut a = Wizard::new(fake_host(first.path(), Bootloader::Grubby), FakeHost, Recorder::default());
    let mut b = Wizard::new(fake_host(second.path(), Bootloader::Grubby), FakeHost, Recorder::default());
    run_to_install(&mut a, true);
    run_to_install(&mut b, true);

    assert_eq!(
        fs::read(&a.config().paths.cmdline).unwrap(),
        fs::read(&b.config().paths.cmdline).unwrap()
    );
    assert_eq!(
        fs::read(a.config().paths.modprobe_file()).unwrap(),
        fs::read(b.config().paths.modprobe_file()).unwrap()
    );
}

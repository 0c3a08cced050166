use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use exliar_quickpass::core::config::{Config, ConfigPaths, SystemPaths};
use exliar_quickpass::core::system::SystemInfo;
use exliar_quickpass::iommu::ls_iommu::LsIommu;
use exliar_quickpass::iommu::{query_devices, DeviceRecord, TopologyFilter, TopologyRequest};
use exliar_quickpass::logging::{init_logging, DEFAULT_LOG_FILE};
use exliar_quickpass::ui::colors::{PastelColor, StyledText};
use exliar_quickpass::ui::{self, AppExit};
use exliar_quickpass::utils::SystemRunner;
use exliar_quickpass::wizard::Wizard;

#[derive(Parser)]
#[command(name = "exliar-quickpass")]
#[command(about = "Guided VFIO GPU passthrough setup", version, long_about = None)]
struct Args {
    /// Directory the generated configuration is staged in
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Directory for helper binaries and generated scripts
    #[arg(long, default_value = "utils")]
    utils_dir: PathBuf,

    /// Path to the ls-iommu binary
    #[arg(long, default_value = "utils/ls-iommu")]
    ls_iommu: PathBuf,

    /// Directory the log file is written to
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Print a system and device summary instead of running the wizard
    #[arg(long)]
    cli: bool,
}

fn main() {
    let args = Args::parse();

    let _logging = match init_logging(&args.log_dir, DEFAULT_LOG_FILE) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {}", e);
            process::exit(1);
        }
    };
    tracing::info!(version = exliar_quickpass::VERSION, "starting");

    let system_info = SystemInfo::detect();
    tracing::info!(bootloader = %system_info.bootloader, cpu = ?system_info.cpu_vendor, "system detected");

    let query = LsIommu::new(&args.ls_iommu);

    if args.cli {
        run_cli_mode(&system_info, &query);
        return;
    }

    let config = Config::new(
        ConfigPaths::new(&args.config_dir, &args.utils_dir),
        SystemPaths::default(),
        &system_info,
    );
    let wizard = Wizard::new(config, query, SystemRunner);

    match ui::run_tui(wizard, system_info) {
        Ok(AppExit::Completed { manual_kernel_args }) => {
            tracing::info!("wizard completed");
            if let Some(kernel_args) = manual_kernel_args {
                println!("No supported bootloader tooling was found.");
                println!("Add these kernel arguments to your bootloader manually:");
                println!("{}", kernel_args);
            }
        }
        Ok(AppExit::Quit) => tracing::info!("wizard exited before completion"),
        Ok(AppExit::Failed(message)) => {
            tracing::error!(%message, "wizard failed");
            eprintln!("Error: {}", message);
            process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "terminal error");
            eprintln!("Terminal error: {}", e);
            process::exit(1);
        }
    }
}

/// Prints the host summary and the passthrough candidates grouped by IOMMU group
fn run_cli_mode(system_info: &SystemInfo, query: &LsIommu) {
    println!("{}", StyledText::bold("Exliar Quickpass (CLI Mode)", PastelColor::Lavender));
    println!("Version: {}\n", exliar_quickpass::VERSION);
    println!("{}", system_info.summary());

    print_devices(query, "GPUs", TopologyFilter::Gpus);
    print_devices(query, "USB controllers", TopologyFilter::UsbControllers);
}

fn print_devices(query: &LsIommu, heading: &str, filter: TopologyFilter) {
    println!("{}", StyledText::bold(heading, PastelColor::Pink));

    let records = match query_devices(query, &TopologyRequest::devices(filter, None)) {
        Ok(records) => records,
        Err(e) => {
            println!("  {}", StyledText::new(&e.to_string(), PastelColor::Peach));
            return;
        }
    };
    if records.is_empty() {
        println!("  None found\n");
        return;
    }

    let mut groups: BTreeMap<u32, Vec<&DeviceRecord>> = BTreeMap::new();
    for record in &records {
        let group = record
            .iommu_group()
            .and_then(|g| g.as_str().parse().ok())
            .unwrap_or(u32::MAX);
        groups.entry(group).or_default().push(record);
    }

    for (group, members) in groups {
        let label = if group == u32::MAX {
            "Unknown group".to_string()
        } else {
            format!("IOMMU Group {}", group)
        };
        println!("  {}", StyledText::new(&label, PastelColor::SkyBlue));
        for record in members {
            println!("    {} {} {}", record.vendor, record.product, record.device_id);
        }
    }
    println!();
}

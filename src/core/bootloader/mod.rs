// src/core/bootloader/mod.rs

pub mod grubby;
pub mod kernelstub;

pub use grubby::GrubbyConfig;
pub use kernelstub::KernelstubConfig;

/// Splits the cmdline fragment into individual kernel parameters
pub fn split_parameters(kernel_args: &str) -> Vec<String> {
    kernel_args.split_whitespace().map(String::from).collect()
}

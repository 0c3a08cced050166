// Core module definitions for Exliar Quickpass

pub mod bootloader;
pub mod cmdline;
pub mod config;
pub mod initramfs;
pub mod install;
pub mod modprobe;
pub mod system;
pub mod vbios;

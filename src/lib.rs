// Exliar Quickpass
//
// A guided wizard that isolates a GPU's IOMMU group for VFIO passthrough and
// writes the host configuration needed to make the isolation take effect at boot

// Host detection, configuration writers and the privileged installer
pub mod core;

// IOMMU topology queries
pub mod iommu;

// Stage state machine
pub mod wizard;

// User interface
pub mod ui;

// Utility functions
pub mod utils;

pub mod error;
pub mod logging;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// VBIOS dumper script generation
//
// Some GPUs only work in a guest when their ROM is supplied manually. Once
// the ROM path of the chosen GPU is known, a small script is written that
// dumps it next to itself.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Error, Result};

/// Renders the dump script for the ROM at `rom_path`
pub fn render_dumper(rom_path: &Path, output_dir: &Path) -> String {
    let rom = rom_path.display();
    let output = output_dir.join(rom_file_name(rom_path));
    let output = output.display();

    format!(
        r#"#!/bin/bash
# Generated by exliar-quickpass
# Dumps the VBIOS of the GPU selected for passthrough.
# Run it while the GPU is not in use by a display server or a VM.

set -e

echo "Enabling reads from {rom}"
echo 1 | sudo tee "{rom}" > /dev/null

echo "Dumping VBIOS to {output}"
if ! sudo cat "{rom}" > "{output}"; then
    echo "Failed to dump the VBIOS, the GPU may be in use or the ROM is shadowed"
fi

echo "Disabling reads from {rom}"
echo 0 | sudo tee "{rom}" > /dev/null
"#
    )
}

/// File name used for the dumped ROM, e.g. `0000:01:00.0.rom`
fn rom_file_name(rom_path: &Path) -> String {
    // The ROM file itself is always called "rom"; its directory names the device
    let device = rom_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "vbios".to_string());
    format!("{}.rom", device)
}

/// Writes the script as an executable file
pub fn write_dumper(script_path: &Path, rom_path: &Path) -> Result<()> {
    let output_dir = script_path.parent().unwrap_or_else(|| Path::new("."));
    tracing::info!(script = %script_path.display(), rom = %rom_path.display(), "generating VBIOS dumper");

    fs::write(script_path, render_dumper(rom_path, output_dir)).map_err(|e| Error::io(script_path, e))?;
    fs::set_permissions(script_path, fs::Permissions::from_mode(0o755)).map_err(|e| Error::io(script_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROM: &str = "/sys/devices/pci0000:00/0000:00:03.1/0000:01:00.0/rom";

    #[test]
    fn script_toggles_rom_reads_around_the_dump() {
        let script = render_dumper(Path::new(ROM), Path::new("utils"));
        let enable = script.find(&format!("echo 1 | sudo tee \"{ROM}\"")).unwrap();
        let dump = script.find("sudo cat").unwrap();
        let disable = script.find(&format!("echo 0 | sudo tee \"{ROM}\"")).unwrap();
        assert!(enable < dump && dump < disable);
        assert!(script.contains("utils/0000:01:00.0.rom"));
    }

    #[test]
    fn written_script_is_executable() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("dump_vbios.sh");

        write_dumper(&script, Path::new(ROM)).unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(fs::read_to_string(&script).unwrap().starts_with("#!/bin/bash\n"));
    }
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Baseboard, BIOS and platform security facts from sysfs.
//!
//! - `/sys/class/dmi/id/{board_*,bios_*}`: SMBIOS strings. `board_serial`
//!   is root-only and is left empty when unreadable.
//! - `/sys/firmware/efi/efivars/SecureBoot-*`: last byte `1` when enabled.
//! - `/sys/class/tpm/tpm0`: present when a TPM is exposed.

use crate::thermal::read_sysfs_file;
use snapshot_layout::BoardInfo;
use std::path::Path;

/// Reads whatever platform facts are available under `sys_root`.
/// Missing files leave the corresponding field empty.
pub fn read_board(sys_root: &Path) -> BoardInfo {
    let dmi = sys_root.join("class/dmi/id");
    let field = |name: &str| read_sysfs_file(&dmi.join(name)).unwrap_or_default();

    BoardInfo {
        manufacturer: field("board_vendor"),
        product: field("board_name"),
        version: field("board_version"),
        serial: field("board_serial"),
        bios_vendor: field("bios_vendor"),
        bios_version: field("bios_version"),
        bios_date: field("bios_date"),
        secure_boot_enabled: secure_boot_enabled(&sys_root.join("firmware/efi/efivars")),
        tpm_present: sys_root.join("class/tpm/tpm0").exists(),
        ..BoardInfo::default()
    }
}

fn secure_boot_enabled(efivars: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(efivars) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("SecureBoot-"))
        .and_then(|e| std::fs::read(e.path()).ok())
        .and_then(|bytes| bytes.last().copied())
        == Some(1)
}

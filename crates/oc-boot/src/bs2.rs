//! Boot ROM stage two: the real IPL, or an emulation of what it leaves behind
//!
//! `load_bs2` runs a user-supplied GameCube IPL dump. `emulated_bs2` skips the ROM entirely
//! and puts a disc's executable in memory the way BS2 and the disc's apploader would.

use crate::machine::BootContext;
use crate::memory_setup::{copy_default_exception_handlers, globals, setup_gc_memory, setup_wii_memory};
use oc_core::config::ConsoleType;
use oc_core::error::BootError;
use oc_core::{AlertLevel, Host, Platform, Region};
use oc_cpu::spr::{SPR_DBAT3L, SPR_DBAT3U, SPR_HID0, SPR_IBAT3L, SPR_IBAT3U};
use oc_cpu::{setup_bat, setup_msr, Msr};
use oc_disc::dvd::{dvd_read, read_disc_id};
use oc_disc::volume::header;
use oc_disc::{apply_memory_patches, Partition, Patch, VolumeDisc};
use oc_ios::update_state_flags;
use oc_loader::ipl::{self, IplFamily};
use oc_loader::{descramble, identify_ipl, ipl_crc32, BootExecutableReader, DolHeader, DolReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// HID0 value the boot ROM leaves behind
pub const BOOT_HID0: u32 = 0x0011_C464;

/// Where the HLE apploader places bi2.bin
pub const BI2_ADDRESS: u32 = 0x817F_E000;

/// Largest FST the HLE apploader accepts
const MAX_FST_SIZE: u64 = 0x0100_0000;

/// Load and start a GameCube IPL dump
///
/// An unknown checksum, or a dump made for another video family than the configured region,
/// only raises a warning.
pub fn load_bs2(ctx: BootContext<'_>, boot_rom: &Path) -> Result<(), BootError> {
    let mut data = std::fs::read(boot_rom).map_err(|e| BootError::Bs2Failed {
        path: boot_rom.to_path_buf(),
        reason: e.to_string(),
    })?;

    check_ipl(ctx.host, ctx.config.region, ipl_crc32(&data));

    if data.len() < ipl::IPL_SIZE {
        warn!(
            "IPL dump is 0x{:x} bytes, padding to 0x{:x}",
            data.len(),
            ipl::IPL_SIZE
        );
        data.resize(ipl::IPL_SIZE, 0);
    }

    descramble(&mut data[ipl::SCRAMBLED_OFFSET..ipl::SCRAMBLED_OFFSET + ipl::SCRAMBLED_SIZE]);

    // Execution really starts at 0xFFF00000; the first BS1 instructions are done here
    ctx.memory.write_bytes(
        ipl::BS1_LOAD_ADDRESS,
        &data[ipl::BS1_OFFSET..ipl::BS1_OFFSET + ipl::BS1_SIZE],
    )?;
    ctx.memory.write_bytes(
        ipl::BS2_LOAD_ADDRESS,
        &data[ipl::BS2_OFFSET..ipl::BS2_OFFSET + ipl::BS2_SIZE],
    )?;

    let cpu = ctx.cpu;
    cpu.gpr[3] = 0xFFF0_001F;
    cpu.gpr[4] = 0x0000_2030;
    cpu.gpr[5] = 0x0000_009C;
    cpu.msr |= Msr::FP | Msr::DR | Msr::IR;
    cpu.set_spr(SPR_HID0, BOOT_HID0);
    cpu.set_spr(SPR_IBAT3U, 0xFFF0_001F);
    cpu.set_spr(SPR_IBAT3L, 0xFFF0_0001);
    cpu.set_spr(SPR_DBAT3U, 0xFFF0_001F);
    cpu.set_spr(SPR_DBAT3L, 0xFFF0_0001);
    setup_bat(cpu, false);
    cpu.pc = ipl::BS1_ENTRY;

    info!("IPL loaded, starting at 0x{:08x}", cpu.pc);
    Ok(())
}

/// Video family a boot region expects its IPL to be built for
fn boot_family(region: Region) -> IplFamily {
    if region == Region::Pal {
        IplFamily::Pal
    } else {
        IplFamily::Ntsc
    }
}

/// Warn about an unknown dump, or a known one made for another video family
fn check_ipl(host: &dyn Host, region: Region, crc: u32) {
    let Some(dump) = identify_ipl(crc) else {
        host.alert(
            AlertLevel::Warning,
            &format!("The IPL file is not a known good dump. (CRC32: {:x})", crc),
        );
        return;
    };

    info!("IPL dump {:?} (CRC32 {:08x})", dump, crc);
    if dump.family() != boot_family(region) {
        host.alert(
            AlertLevel::Warning,
            &format!(
                "{} IPL found in {} directory. The disc might not be recognized",
                dump.family(),
                region.directory_name()
            ),
        );
    }
}

/// Bring up a disc without the boot ROM
pub fn emulated_bs2(
    ctx: BootContext<'_>,
    path: &Path,
    volume: &dyn VolumeDisc,
    patches: &[Patch],
) -> Result<(), BootError> {
    match volume.platform() {
        Platform::GameCube => emulated_bs2_gc(ctx, path, volume, patches),
        Platform::Wii => emulated_bs2_wii(ctx, path, volume, patches),
    }
}

fn emulated_bs2_gc(
    ctx: BootContext<'_>,
    path: &Path,
    volume: &dyn VolumeDisc,
    patches: &[Patch],
) -> Result<(), BootError> {
    info!("Faking GC BS2...");
    setup_msr(ctx.cpu);
    setup_bat(ctx.cpu, false);

    read_disc_id(volume, ctx.memory, 0x8000_0000)?;
    setup_gc_memory(ctx.memory, ctx.config)?;
    copy_default_exception_handlers(ctx.memory)?;

    let ntsc = ctx.config.region.is_ntsc();
    // Stack pointer, then the small data area bases
    ctx.cpu.gpr[1] = if ntsc { 0x8156_6550 } else { 0x815E_DCA8 };
    ctx.cpu.gpr[2] = if ntsc { 0x8146_5CC0 } else { 0x814B_5B20 };
    ctx.cpu.gpr[13] = if ntsc { 0x8146_5320 } else { 0x814B_4FC0 };

    run_apploader(ctx, path, volume, Partition::NONE, patches)
}

fn emulated_bs2_wii(
    ctx: BootContext<'_>,
    path: &Path,
    volume: &dyn VolumeDisc,
    patches: &[Patch],
) -> Result<(), BootError> {
    info!("Faking Wii BS2...");
    let failed = |reason: &str| BootError::Bs2Failed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let partition = volume.game_partition();
    if partition.is_none() {
        return Err(failed("the disc has no game partition"));
    }
    let tmd = volume
        .tmd(partition)
        .filter(|tmd| tmd.is_valid())
        .ok_or_else(|| failed("the game partition has no valid TMD"))?;

    setup_wii_memory(ctx.memory, ctx.ios, ctx.config, ConsoleType::Retail)?;
    ctx.ios.boot_ios(tmd.ios_id(), ctx.memory)?;

    read_disc_id(volume, ctx.memory, 0x8000_0000)?;
    let game_id = ctx.memory.read_be32(0x8000_0000)?;
    ctx.memory.write_be32(globals::WII_GAME_ID, game_id)?;

    setup_msr(ctx.cpu);
    setup_bat(ctx.cpu, true);
    ctx.cpu.gpr[1] = 0x816F_FFF0;

    update_state_flags(ctx.ios, |state| {
        state.flags = 0xC1;
        state.r#type = 0xFF;
        state.discstate = 0x01;
    })?;

    run_apploader(ctx, path, volume, partition, patches)
}

/// Do what a disc's apploader does: load bi2, the FST and the main DOL
fn run_apploader(
    ctx: BootContext<'_>,
    path: &Path,
    volume: &dyn VolumeDisc,
    partition: Partition,
    patches: &[Patch],
) -> Result<(), BootError> {
    let failed = |reason: String| BootError::Bs2Failed {
        path: path.to_path_buf(),
        reason,
    };

    dvd_read(volume, header::BI2, ctx.memory, BI2_ADDRESS, header::BI2_SIZE, partition)?;
    ctx.memory.write_be32(globals::BI2_ADDRESS, BI2_ADDRESS)?;

    let fst_offset = volume.read_offset(header::FST_OFFSET, partition)?;
    let fst_size = volume.read_offset(header::FST_SIZE, partition)?;
    let fst_max_size = volume.read_offset(header::FST_MAX_SIZE, partition)?.max(fst_size);
    if fst_max_size > MAX_FST_SIZE {
        return Err(failed(format!("FST size 0x{:x} is too large", fst_max_size)));
    }
    let fst_address = (BI2_ADDRESS - fst_max_size as u32) & !0x1F;
    dvd_read(volume, fst_offset, ctx.memory, fst_address, fst_size as usize, partition)?;
    ctx.memory.write_be32(globals::ARENA_HIGH, fst_address)?;
    ctx.memory.write_be32(globals::FST_ADDRESS, fst_address)?;
    ctx.memory.write_be32(globals::FST_MAX_SIZE, fst_max_size as u32)?;
    debug!("FST: 0x{:x} bytes at 0x{:08x}", fst_size, fst_address);

    let dol_offset = volume.read_offset(header::DOL_OFFSET, partition)?;
    let mut dol_header = vec![0u8; oc_loader::dol::DOL_HEADER_SIZE];
    volume.read(dol_offset, &mut dol_header, partition)?;
    let dol_size = DolHeader::parse(&dol_header)
        .map_err(|e| failed(e.to_string()))?
        .file_size();
    if dol_offset + dol_size as u64 > volume.size() {
        return Err(failed(format!(
            "main DOL (0x{:x} bytes at 0x{:x}) extends past the end of the disc",
            dol_size, dol_offset
        )));
    }
    let mut dol = vec![0u8; dol_size as usize];
    volume.read(dol_offset, &mut dol, partition)?;

    let reader = DolReader::new(dol);
    if !reader.is_valid() {
        return Err(failed("the main DOL is invalid".to_string()));
    }
    reader
        .load_into_memory(ctx.memory)
        .map_err(|e| failed(e.to_string()))?;
    apply_memory_patches(patches, ctx.memory);

    ctx.cpu.pc = reader.entry_point();
    info!(
        "Main DOL (0x{:x} bytes at 0x{:x}) loaded, entry 0x{:08x}",
        dol_size, dol_offset, ctx.cpu.pc
    );
    Ok(())
}

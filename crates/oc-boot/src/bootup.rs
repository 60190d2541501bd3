//! Putting a classified boot request on the machine

use crate::bs2::{emulated_bs2, load_bs2, BOOT_HID0};
use crate::machine::Machine;
use crate::memory_setup::{copy_default_exception_handlers, setup_gc_memory, setup_wii_memory};
use crate::nand;
use crate::params::{BootDescriptor, BootParameters, Disc, Executable, Ipl};
use oc_core::config::ConsoleType;
use oc_core::error::BootError;
use oc_cpu::spr::{SPR_HID0, SPR_HID4};
use oc_cpu::{setup_bat, setup_msr, Hid4};
use oc_disc::{apply_memory_patches, create_disc, DriveState, Patch};
use oc_ios::titles;
use tracing::{debug, info};

/// Stack pointer a standalone Wii executable starts with
const WII_EXECUTABLE_STACK: u32 = 0x8004_D4BC;

/// IOS a standalone Wii executable runs under
const WII_EXECUTABLE_IOS: u32 = 58;

/// Bring the machine up for `params`
///
/// On success the CPU sits at the entry point of whatever was booted, or for a FIFO log the
/// player holds the opened file. Mod memory patches are applied last whatever the variant.
pub fn boot_up(machine: &mut Machine, params: BootParameters) -> Result<(), BootError> {
    if !machine.symbols.is_empty() {
        machine.symbols.clear();
        machine.hle.clear();
        machine.host().notify_map_loaded();
    }

    let ntsc = machine.config.use_ntsc_timing();
    machine.video.preset(ntsc);

    let BootParameters {
        parameters,
        session,
        patches,
    } = params;
    info!("Booting {}", parameters.kind());
    if let Some(savestate) = session.savestate_path() {
        debug!("Savestate {} requested for this session", savestate.display());
    }

    match parameters {
        BootDescriptor::Disc(disc) => boot_disc(machine, disc, &patches)?,
        BootDescriptor::Executable(exe) => boot_executable(machine, exe)?,
        BootDescriptor::Wad(wad) => {
            machine.set_default_disc();
            nand::boot_wad(machine.context(), &wad)?;
            machine.on_new_title_load();
        }
        BootDescriptor::NandTitle(title) => {
            machine.set_default_disc();
            nand::boot_nand_title(machine.context(), title.id)?;
            machine.on_new_title_load();
        }
        BootDescriptor::Ipl(ipl) => boot_ipl(machine, ipl)?,
        BootDescriptor::Dff(dff) => machine.fifo.open(&dff.path)?,
    }

    apply_memory_patches(&patches, &machine.memory);
    Ok(())
}

fn boot_disc(machine: &mut Machine, disc: Disc, patches: &[Patch]) -> Result<(), BootError> {
    let Disc {
        path,
        volume,
        auto_disc_change_paths,
    } = disc;

    let (ctx, dvd) = machine.split();
    let volume = dvd.set_disc(volume, auto_disc_change_paths);
    emulated_bs2(ctx, &path, volume, patches)?;
    // BS2 already read the disc id
    machine.dvd.set_drive_state(DriveState::ReadyNoReadsMade);

    machine.on_new_title_load();
    Ok(())
}

fn boot_executable(machine: &mut Machine, exe: Executable) -> Result<(), BootError> {
    let Executable { path, reader } = exe;
    if !reader.is_valid() {
        return Err(BootError::InvalidExecutable(path));
    }
    reader
        .load_into_memory(&machine.memory)
        .map_err(|source| BootError::LoadIntoMemoryFailed {
            path: path.clone(),
            source,
        })?;

    machine.set_default_disc();

    let is_wii = machine.config.is_wii();
    {
        let ctx = machine.context();
        setup_msr(ctx.cpu);
        setup_bat(ctx.cpu, is_wii);
        copy_default_exception_handlers(ctx.memory)?;

        if is_wii {
            ctx.cpu.set_spr(SPR_HID0, BOOT_HID0);
            ctx.cpu.set_spr(SPR_HID4, (Hid4::H4A | Hid4::SBE).bits());
            ctx.cpu.gpr[1] = WII_EXECUTABLE_STACK;
            setup_wii_memory(ctx.memory, ctx.ios, ctx.config, ConsoleType::Retail)?;
            ctx.ios
                .boot_ios(titles::ios(WII_EXECUTABLE_IOS), ctx.memory)?;
        } else {
            setup_gc_memory(ctx.memory, ctx.config)?;
        }
    }

    machine.on_new_title_load();

    machine.cpu.pc = reader.entry_point();
    info!("{} loaded, entry 0x{:08x}", path.display(), machine.cpu.pc);

    if reader.load_symbols(&mut machine.symbols) {
        machine.host().notify_map_loaded();
        let hooks = machine.hle.patch_functions(&machine.symbols);
        debug!("{} symbols from {}, {} HLE hooks", machine.symbols.len(), path.display(), hooks);
    }
    Ok(())
}

fn boot_ipl(machine: &mut Machine, ipl: Ipl) -> Result<(), BootError> {
    let Ipl { path, disc, .. } = ipl;
    if !path.exists() {
        return Err(BootError::InvalidFirmwareRom {
            path,
            disc_requested: disc.is_some(),
        });
    }

    load_bs2(machine.context(), &path)?;

    if let Some(disc) = disc {
        // The classified volume was only used to identify the game; the drive gets its own
        let volume = create_disc(&disc.path).ok_or_else(|| BootError::DiscMountFailed(disc.path.clone()))?;
        machine.dvd.set_disc(volume, disc.auto_disc_change_paths);
        info!("Inserted {} behind the IPL", disc.path.display());
    }

    machine.on_new_title_load();
    Ok(())
}

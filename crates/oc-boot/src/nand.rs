//! Booting titles from the emulated NAND

use crate::machine::BootContext;
use crate::memory_setup::setup_wii_memory;
use crate::params::Wad;
use oc_core::error::{BootError, IosError};
use oc_cpu::{setup_bat, setup_msr};
use oc_disc::VolumeWad;
use oc_ios::titles::{self, format_title_id};
use oc_ios::update_state_flags;
use oc_loader::{BootExecutableReader, DolReader};
use tracing::info;

/// State flags type a title launched from the System Menu returns with
const TYPE_RETURN: u8 = 0x03;

/// Import every part of a WAD into the NAND title store
pub fn install_wad(ctx: &BootContext<'_>, wad: &VolumeWad) -> Result<(), IosError> {
    let contents = wad
        .contents()
        .map_err(|e| IosError::InvalidTmd(format!("could not read WAD contents: {}", e)))?;
    ctx.ios.es().import_title(wad.ticket(), wad.tmd(), &contents)?;
    info!("Installed {} from WAD", format_title_id(wad.title_id()));
    Ok(())
}

/// Install a WAD and launch the title it contains
pub fn boot_wad(ctx: BootContext<'_>, wad: &Wad) -> Result<(), BootError> {
    let title_id = wad.volume.title_id();
    install_wad(&ctx, &wad.volume).map_err(|e| BootError::InstallPackageBootFailed {
        path: wad.path.clone(),
        reason: e.to_string(),
    })?;
    boot_nand_title(ctx, title_id)
}

/// Launch an installed title
pub fn boot_nand_title(ctx: BootContext<'_>, title_id: u64) -> Result<(), BootError> {
    update_state_flags(ctx.ios, |state| state.r#type = TYPE_RETURN)?;
    launch_title(ctx, title_id)
}

/// Put an installed title's boot content in memory and point the CPU at it
///
/// Launching an IOS only reloads IOS.
pub fn launch_title(ctx: BootContext<'_>, title_id: u64) -> Result<(), BootError> {
    let failed = |reason: String| BootError::TitleBootFailed { title_id, reason };

    if titles::is_ios(title_id) {
        return ctx.ios.boot_ios(title_id, ctx.memory).map_err(|e| failed(e.to_string()));
    }

    let tmd = ctx
        .ios
        .es()
        .find_installed_tmd(title_id)
        .map_err(|e| failed(e.to_string()))?;
    let content = tmd
        .boot_content()
        .ok_or_else(|| failed("the TMD has no boot content".to_string()))?;
    let data = ctx
        .ios
        .es()
        .read_content(title_id, &content)
        .map_err(|e| failed(format!("boot content {:08x}: {}", content.id, e)))?;

    setup_wii_memory(ctx.memory, ctx.ios, ctx.config, ctx.config.console_type)?;
    ctx.ios
        .boot_ios(tmd.ios_id(), ctx.memory)
        .map_err(|e| failed(e.to_string()))?;

    let reader = DolReader::new(data);
    if !reader.is_valid() {
        return Err(failed(format!("boot content {:08x} is not a DOL", content.id)));
    }
    reader
        .load_into_memory(ctx.memory)
        .map_err(|e| failed(e.to_string()))?;

    setup_msr(ctx.cpu);
    setup_bat(ctx.cpu, true);
    ctx.cpu.pc = reader.entry_point();
    info!(
        "Launched {} at 0x{:08x}",
        format_title_id(title_id),
        ctx.cpu.pc
    );
    Ok(())
}

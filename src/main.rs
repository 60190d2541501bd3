//! oxidized-cube - GameCube/Wii boot orchestrator
//!
//! Boots an artifact headlessly and prints the state the CPU was left in.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use oc_boot::{
    BootDescriptor, BootManager, BootParameters, BootSessionData, DeleteSavestateAfterBoot, Ipl,
    Machine, NandTitle,
};
use oc_core::{Config, LogHost, Region};
use oc_cpu::spr::{SPR_HID0, SPR_HID4};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IplRegion {
    Jap,
    Usa,
    Eur,
}

impl From<IplRegion> for Region {
    fn from(region: IplRegion) -> Self {
        match region {
            IplRegion::Jap => Region::NtscJ,
            IplRegion::Usa => Region::NtscU,
            IplRegion::Eur => Region::Pal,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "oxidized-cube", version, about = "Boot a GameCube or Wii artifact headlessly")]
struct Args {
    /// Disc image, playlist, executable, WAD, FIFO log or mod descriptor; several disc
    /// images form a multi-disc set
    paths: Vec<PathBuf>,

    /// Boot the GameCube IPL of this region (inserting the given disc, if any)
    #[arg(long, value_enum)]
    ipl: Option<IplRegion>,

    /// Launch an installed NAND title, e.g. 0001000152414245
    #[arg(long, value_parser = parse_title_id, conflicts_with_all = ["ipl", "paths"])]
    nand_title: Option<u64>,

    /// Savestate to load once the title runs
    #[arg(long)]
    savestate: Option<PathBuf>,

    /// Delete the savestate after loading it
    #[arg(long, requires = "savestate")]
    delete_savestate: bool,

    /// Configuration file (created with defaults when missing)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_title_id(text: &str) -> Result<u64, String> {
    let digits = text.trim_start_matches("0x").replace('/', "");
    u64::from_str_radix(&digits, 16).map_err(|e| format!("invalid title id \"{}\": {}", text, e))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow!("could not load the configuration: {}", e))?;
    oc_core::logging::init(config.debug.log_level);

    tracing::info!("Starting oxidized-cube");

    let session = BootSessionData::new(
        args.savestate.clone(),
        if args.delete_savestate {
            DeleteSavestateAfterBoot::Yes
        } else {
            DeleteSavestateAfterBoot::No
        },
    );
    let manager = BootManager::new(config.clone(), Arc::new(LogHost));

    let machine = if let Some(id) = args.nand_title {
        let params = BootParameters::new(BootDescriptor::NandTitle(NandTitle { id }), session);
        manager.boot_core(params)?
    } else if let Some(region) = args.ipl {
        let region = Region::from(region);
        let ipl = if args.paths.is_empty() {
            Ipl::new(region, &config.paths)
        } else {
            let params = manager.classify(args.paths.clone(), BootSessionData::default())?;
            let kind = params.parameters.kind();
            let BootDescriptor::Disc(disc) = params.parameters else {
                anyhow::bail!("--ipl needs a disc image, got a {}", kind);
            };
            Ipl::with_disc(region, &config.paths, disc)
        };
        manager.boot_core(BootParameters::new(BootDescriptor::Ipl(ipl), session))?
    } else {
        if args.paths.is_empty() {
            anyhow::bail!("nothing to boot: pass a file, --ipl or --nand-title");
        }
        manager
            .boot_files(args.paths.clone(), session)
            .with_context(|| format!("booting {}", args.paths[0].display()))?
    };

    print_state(&machine);
    Ok(())
}

fn print_state(machine: &Machine) {
    let config = &machine.config;
    println!("platform   {:?} ({})", config.platform, config.region);
    println!("game id    {}", config.game_id);
    if let Some(file) = machine.fifo.file() {
        println!("fifo log   {} ({} frames)", file.path.display(), file.frame_count);
        return;
    }

    let cpu = &machine.cpu;
    println!("pc         0x{:08x}", cpu.pc);
    println!("msr        0x{:08x}", cpu.msr.bits());
    println!("hid0       0x{:08x}", cpu.get_spr(SPR_HID0));
    if config.is_wii() {
        println!("hid4       0x{:08x}", cpu.get_spr(SPR_HID4));
    }
    for (i, gpr) in cpu.gpr.iter().enumerate().filter(|(_, v)| **v != 0) {
        println!("r{:<9} 0x{:08x}", i, gpr);
    }
    if let Some(ios) = machine.ios.active_ios() {
        println!("ios        IOS{}", ios as u32);
    }
    if machine.dvd.is_disc_inside() {
        println!("disc       inserted ({} swap paths)", machine.dvd.auto_disc_change_paths().len());
    }
    println!("symbols    {} ({} HLE hooks)", machine.symbols.len(), machine.hle.len());
}

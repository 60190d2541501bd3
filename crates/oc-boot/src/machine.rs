//! The emulated console a boot request is brought up on

use crate::config::BootConfig;
use crate::hle::HleHooks;
use crate::replay::FifoPlayer;
use crate::video::VideoInterface;
use oc_core::error::BootError;
use oc_core::config::PathConfig;
use oc_core::Host;
use oc_cpu::PowerPcState;
use oc_disc::{create_disc, DvdInterface};
use oc_ios::{Ios, KeyStore};
use oc_loader::SymbolDb;
use oc_memory::Memory;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a title's symbol map is, or would be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFileLocation {
    /// Existing map, user directory first
    pub existing: Option<PathBuf>,
    /// Path a new map for the title should be saved to
    pub writable: PathBuf,
}

/// Look for `<game_id>.map` in the user maps directory, then in the system one
pub fn find_map_file(paths: &PathConfig, game_id: &str) -> MapFileLocation {
    let file_name = format!("{}.map", game_id);
    let writable = paths.maps.join(&file_name);
    let existing = [writable.clone(), paths.sys_maps().join(&file_name)]
        .into_iter()
        .find(|candidate| candidate.is_file());
    MapFileLocation { existing, writable }
}

/// Everything bring-up touches
pub struct Machine {
    pub memory: Arc<Memory>,
    pub cpu: PowerPcState,
    pub dvd: DvdInterface,
    pub ios: Ios,
    pub video: VideoInterface,
    pub symbols: SymbolDb,
    pub hle: HleHooks,
    pub fifo: FifoPlayer,
    pub config: BootConfig,
    host: Arc<dyn Host>,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("cpu", &self.cpu)
            .field("video", &self.video)
            .field("symbols", &self.symbols)
            .field("hle", &self.hle)
            .field("fifo", &self.fifo)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Borrowed view of the machine for the bring-up steps that run while the DVD interface
/// holds a borrowed disc
pub struct BootContext<'a> {
    pub memory: &'a Memory,
    pub cpu: &'a mut PowerPcState,
    pub ios: &'a Ios,
    pub config: &'a BootConfig,
    pub host: &'a dyn Host,
}

impl Machine {
    /// Power on a machine for `config`
    pub fn new(config: BootConfig, host: Arc<dyn Host>) -> Result<Self, BootError> {
        let memory = Memory::new();
        memory.set_wii(config.is_wii());

        let keys = KeyStore::load(&config.paths.keys)?;
        let ios = Ios::new(&config.paths.nand_root, config.console_type, keys)?;

        info!(
            "Machine powered on: {:?}, region {}",
            config.platform, config.region
        );
        Ok(Self {
            memory,
            cpu: PowerPcState::new(),
            dvd: DvdInterface::new(),
            ios,
            video: VideoInterface::new(),
            symbols: SymbolDb::new(),
            hle: HleHooks::new(),
            fifo: FifoPlayer::new(),
            config,
            host,
        })
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Split off the DVD interface from the rest of the machine
    pub fn split(&mut self) -> (BootContext<'_>, &mut DvdInterface) {
        (
            BootContext {
                memory: &self.memory,
                cpu: &mut self.cpu,
                ios: &self.ios,
                config: &self.config,
                host: self.host.as_ref(),
            },
            &mut self.dvd,
        )
    }

    /// View of the machine without the DVD interface
    pub fn context(&mut self) -> BootContext<'_> {
        self.split().0
    }

    /// Insert the configured default disc, for titles that probe the drive
    pub fn set_default_disc(&mut self) {
        let Some(path) = self.config.default_iso.clone() else {
            return;
        };
        match create_disc(&path) {
            Some(disc) => {
                info!("Inserting default disc {}", path.display());
                self.dvd.set_disc(disc, Vec::new());
            }
            None => warn!("Default disc {} could not be opened", path.display()),
        }
    }

    /// Load the symbol map of the running title, if one exists
    pub fn load_map_from_filename(&mut self) -> bool {
        let location = find_map_file(&self.config.paths, &self.config.game_id);
        let Some(path) = location.existing else {
            debug!("No symbol map for {}", self.config.game_id);
            return false;
        };

        match self.symbols.load_map(&path) {
            Ok(_) => {
                self.host.notify_map_loaded();
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// Per-title setup once a title has been placed in memory
    pub fn on_new_title_load(&mut self) {
        info!("New title loaded: {}", self.config.game_id);
        self.host.notify_title_changed(&self.config.game_id);
        if self.load_map_from_filename() {
            self.hle.patch_functions(&self.symbols);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oc_core::{Config, Platform, RecordingHost};
    use oc_loader::SymbolKind;

    fn test_machine(dir: &std::path::Path, platform: Platform) -> (Arc<RecordingHost>, Machine) {
        let mut config = Config::default();
        config.paths = PathConfig::with_user_dir(dir.to_path_buf());
        let host = Arc::new(RecordingHost::new());
        let machine = Machine::new(BootConfig::from_config(&config, platform), host.clone()).unwrap();
        (host, machine)
    }

    #[test]
    fn test_find_map_file_prefers_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathConfig::with_user_dir(dir.path().to_path_buf());
        std::fs::create_dir_all(paths.sys_maps()).unwrap();
        std::fs::write(paths.sys_maps().join("GALE01.map"), "").unwrap();

        let found = find_map_file(&paths, "GALE01");
        assert_eq!(found.existing, Some(paths.sys_maps().join("GALE01.map")));
        assert_eq!(found.writable, paths.maps.join("GALE01.map"));

        std::fs::create_dir_all(&paths.maps).unwrap();
        std::fs::write(paths.maps.join("GALE01.map"), "").unwrap();
        assert_eq!(find_map_file(&paths, "GALE01").existing, Some(paths.maps.join("GALE01.map")));
        assert!(find_map_file(&paths, "RSPE01").existing.is_none());
    }

    #[test]
    fn test_machine_platform() {
        let dir = tempfile::tempdir().unwrap();
        let (_, gc) = test_machine(dir.path(), Platform::GameCube);
        assert!(!gc.memory.is_wii());
        let (_, wii) = test_machine(dir.path(), Platform::Wii);
        assert!(wii.memory.is_wii());
    }

    #[test]
    fn test_new_title_loads_map_and_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let (host, mut machine) = test_machine(dir.path(), Platform::GameCube);
        machine.config.game_id = "GALE01".to_string();
        std::fs::create_dir_all(&machine.config.paths.maps).unwrap();
        std::fs::write(
            machine.config.paths.maps.join("GALE01.map"),
            "80004000 000040 OSReport\n80005000 000020 main\n",
        )
        .unwrap();

        machine.on_new_title_load();
        assert_eq!(host.titles(), vec!["GALE01".to_string()]);
        assert_eq!(host.map_loaded_count(), 1);
        assert_eq!(
            machine.symbols.get_symbol_from_name("OSReport").unwrap().kind,
            SymbolKind::Function
        );
        assert_eq!(machine.hle.len(), 1);
    }

    #[test]
    fn test_missing_default_disc_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut machine) = test_machine(dir.path(), Platform::GameCube);
        machine.set_default_disc();
        assert!(!machine.dvd.is_disc_inside());

        machine.config.default_iso = Some(dir.path().join("absent.iso"));
        machine.set_default_disc();
        assert!(!machine.dvd.is_disc_inside());
    }
}

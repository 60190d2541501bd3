//! Entry point frontends use to boot something

use crate::bootup::boot_up;
use crate::config::BootConfig;
use crate::machine::Machine;
use crate::params::{BootDescriptor, BootParameters, BootSessionData, Ipl};
use oc_core::error::BootError;
use oc_core::{AlertLevel, Config, Host, Platform};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Owns the user configuration and turns boot requests into running machines
pub struct BootManager {
    config: RwLock<Config>,
    host: Arc<dyn Host>,
}

impl BootManager {
    pub fn new(config: Config, host: Arc<dyn Host>) -> Self {
        Self {
            config: RwLock::new(config),
            host,
        }
    }

    /// Current user configuration
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Replace the user configuration; boots already started keep their snapshot
    pub fn set_config(&self, config: Config) {
        *self.config.write() = config;
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Classify `paths`, reporting failures to the host
    pub fn classify(&self, paths: Vec<PathBuf>, session: BootSessionData) -> Result<BootParameters, BootError> {
        BootParameters::generate_from_files(paths, session).map_err(|e| self.report(e))
    }

    /// Classify `paths` and boot the result
    pub fn boot_files(&self, paths: Vec<PathBuf>, session: BootSessionData) -> Result<Machine, BootError> {
        let params = self.classify(paths, session)?;
        self.boot_core(params)
    }

    /// Boot a classified request on a freshly powered machine
    ///
    /// A GameCube disc goes through the real IPL unless the configuration skips it. Failures
    /// are reported to the host before being returned.
    pub fn boot_core(&self, params: BootParameters) -> Result<Machine, BootError> {
        let config = self.config();
        let params = route_through_ipl(&config, params);
        let snapshot = BootConfig::new(&config, &params);
        info!(
            "Boot core: {} on {:?} ({}), game id \"{}\"",
            params.parameters.kind(),
            snapshot.platform,
            snapshot.region,
            snapshot.game_id
        );

        let mut machine = Machine::new(snapshot, self.host.clone()).map_err(|e| self.report(e))?;
        boot_up(&mut machine, params).map_err(|e| self.report(e))?;
        Ok(machine)
    }

    fn report(&self, err: BootError) -> BootError {
        error!("Boot failed: {}", err);
        self.host.alert(AlertLevel::Error, &err.to_string());
        err
    }
}

fn route_through_ipl(config: &Config, params: BootParameters) -> BootParameters {
    if config.general.skip_ipl {
        return params;
    }

    let region = params.region().unwrap_or(config.general.region);
    match params.parameters {
        BootDescriptor::Disc(disc) if disc.volume.platform() == Platform::GameCube => {
            info!("Starting {} through the {} IPL", disc.path.display(), region);
            BootParameters {
                parameters: BootDescriptor::Ipl(Ipl::with_disc(region, &config.paths, disc)),
                ..params
            }
        }
        parameters => BootParameters { parameters, ..params },
    }
}

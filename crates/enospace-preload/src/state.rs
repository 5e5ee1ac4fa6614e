//! Process-wide shim state, installed exactly once by the load-time
//! constructor and read lock-free by every entry point afterwards.

use enospace_config::{ConfigError, QuotaConfig, ENV_DEBUG};
use enospace_quota::{QuotaEngine, SysProbe};
use once_cell::sync::OnceCell;

use crate::reals::Originals;

static SHIM_STATE: OnceCell<ShimState> = OnceCell::new();

pub struct ShimState {
    pub engine: QuotaEngine<SysProbe>,
    pub originals: Originals,
}

impl ShimState {
    /// `None` until the constructor has finished.
    #[inline(always)]
    pub fn get() -> Option<&'static ShimState> {
        SHIM_STATE.get()
    }

    #[inline(always)]
    pub fn debug(&self) -> bool {
        self.engine.config().debug
    }

    /// Load settings, resolve the originals and publish the state.
    ///
    /// Bad numeric settings end the process with
    /// [`ConfigError::EXIT_STATUS`] before any user code runs.
    #[cold]
    #[inline(never)]
    pub(crate) unsafe fn install() {
        let (config, warnings) = match QuotaConfig::from_env() {
            Ok(loaded) => loaded,
            Err(err) => {
                shim_debug!(std::env::var_os(ENV_DEBUG).is_some(), "{}", err);
                libc::_exit(ConfigError::EXIT_STATUS);
            }
        };
        for warning in &warnings {
            shim_log!("{}", warning);
        }

        let state = ShimState {
            engine: QuotaEngine::new(config, SysProbe),
            originals: Originals::resolve(config.debug),
        };
        if SHIM_STATE.set(state).is_err() {
            shim_debug!(config.debug, "libenospace:init:state already installed");
        }
    }
}

//! Checker configuration.
//!
//! Loaded from defaults, an optional `driftwatch.toml`, and
//! `DRIFTWATCH__`-prefixed environment variables (double underscore as the
//! nesting separator), in that order of precedence.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Configuration for the periodic consistency checker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Enable the checker loop.
    ///
    /// Env: DRIFTWATCH__CHECKER__ENABLED
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Wall-clock period between check cycles. The timer is armed after a
    /// cycle completes, so cycles never overlap.
    ///
    /// Env: DRIFTWATCH__CHECKER__PERIOD (e.g. "60s", "5m")
    #[serde(with = "humantime_serde", default = "default_period")]
    pub period: Duration,
}

fn default_enabled() -> bool {
    true
}

fn default_period() -> Duration {
    Duration::from_secs(60)
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            period: default_period(),
        }
    }
}

impl CheckerConfig {
    /// Validate the checker configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.period.is_zero() {
            anyhow::bail!("checker period must be positive, got {:?}", self.period);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    pub checker: CheckerConfig,
}

impl Configuration {
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DRIFTWATCH__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}

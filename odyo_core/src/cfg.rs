use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Conduction, Db};

/// Tunable constants of the response model, plateau detector and scorer.
///
/// Every field has a default, so a TOML file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdyoCfg {
    /// Interaural attenuation for air-conducted signals.
    pub ia_air_db: Db,
    /// Interaural attenuation for bone-conducted signals.
    pub ia_bone_db: Db,
    /// Added to the leaked masker level once overmasking starts.
    pub overmask_margin_db: Db,
    /// White noise overmasking effect, as a percentage of the narrowband one.
    pub white_noise_leak_pct: i32,

    pub plateau_window: usize,
    pub plateau_min_span_db: Db,
    /// How many recent trials the plateau status summary looks at.
    pub status_window: usize,

    /// Marked-vs-true difference that costs nothing.
    pub tolerance_db: Db,
    pub hint_penalty: i32,
    pub mask_penalty_per_item: i32,
    pub missing_mask_cap: i32,
    pub wrong_ear_cap: i32,
    pub overmask_cap: i32,

    pub max_mask_db: Db,
}

impl Default for OdyoCfg {
    fn default() -> Self {
        Self {
            ia_air_db: 40,
            ia_bone_db: 0,
            overmask_margin_db: 5,
            white_noise_leak_pct: 120,
            plateau_window: 3,
            plateau_min_span_db: 10,
            status_window: 10,
            tolerance_db: 5,
            hint_penalty: 10,
            mask_penalty_per_item: 5,
            missing_mask_cap: 15,
            wrong_ear_cap: 10,
            overmask_cap: 10,
            max_mask_db: 120,
        }
    }
}

impl OdyoCfg {
    #[inline]
    pub fn interaural_attenuation(&self, mode: Conduction) -> Db {
        match mode {
            Conduction::Air => self.ia_air_db,
            Conduction::Bone => self.ia_bone_db,
        }
    }

    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: OdyoCfg = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded audiometry config");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ia_air_db < 0 || self.ia_bone_db < 0 {
            return Err(Error::Config("interaural attenuation must be >= 0".into()));
        }
        if self.white_noise_leak_pct < 100 {
            return Err(Error::Config(format!(
                "white_noise_leak_pct must be >= 100, got {}",
                self.white_noise_leak_pct
            )));
        }
        if self.plateau_window < 2 {
            return Err(Error::Config("plateau_window must be at least 2".into()));
        }
        if self.status_window == 0 {
            return Err(Error::Config("status_window must be > 0".into()));
        }
        if self.tolerance_db < 0 {
            return Err(Error::Config("tolerance_db must be >= 0".into()));
        }
        if !(0..=120).contains(&self.max_mask_db) {
            return Err(Error::Config(format!("max_mask_db out of range: {}", self.max_mask_db)));
        }
        Ok(())
    }
}

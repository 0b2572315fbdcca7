use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Conduction, Db, Ear, Frequency, MAX_LEVEL_DB, MIN_LEVEL_DB};

// ---------------------------------------------------------------------
// Threshold source: raw table access plus the shared fallback policy.
// ---------------------------------------------------------------------

/// Anything that can answer raw true-threshold lookups.
///
/// Implementors only provide the raw tables; the fallback chain
/// (bone -> air -> 0) lives in the provided methods so every caller
/// resolves missing data the same way.
pub trait ThresholdSource {
    fn air(&self, ear: Ear, freq: Frequency) -> Option<Db>;
    fn bone(&self, ear: Ear, freq: Frequency) -> Option<Db>;

    /// Threshold for the given pathway. Never fails; 0 when nothing is known.
    fn threshold(&self, ear: Ear, mode: Conduction, freq: Frequency) -> Db {
        match mode {
            Conduction::Bone => self.bone_only(ear, freq),
            Conduction::Air => self.air(ear, freq).unwrap_or(0),
        }
    }

    /// Bone threshold regardless of the session's conduction mode,
    /// falling back to air and then 0.
    fn bone_only(&self, ear: Ear, freq: Frequency) -> Db {
        self.bone(ear, freq)
            .or_else(|| self.air(ear, freq))
            .unwrap_or(0)
    }
}

/// True thresholds for one ear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarThresholds {
    #[serde(default)]
    pub air: BTreeMap<Frequency, Db>,
    #[serde(default)]
    pub bone: BTreeMap<Frequency, Db>,
}

impl EarThresholds {
    fn table(&self, mode: Conduction) -> &BTreeMap<Frequency, Db> {
        match mode {
            Conduction::Air => &self.air,
            Conduction::Bone => &self.bone,
        }
    }
}

/// A simulated patient's true audiogram. Immutable for the life of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientCase {
    pub right: EarThresholds,
    pub left: EarThresholds,
}

impl PatientCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a case from air and bone rows ordered like `Frequency::ALL`
    /// and `Frequency::BONE`.
    pub fn from_rows(
        right_air: [Db; 7],
        left_air: [Db; 7],
        right_bone: [Db; 4],
        left_bone: [Db; 4],
    ) -> Self {
        let mut case = Self::new();
        for (i, f) in Frequency::ALL.iter().enumerate() {
            case.set(Ear::Right, Conduction::Air, *f, right_air[i]);
            case.set(Ear::Left, Conduction::Air, *f, left_air[i]);
        }
        for (i, f) in Frequency::BONE.iter().enumerate() {
            case.set(Ear::Right, Conduction::Bone, *f, right_bone[i]);
            case.set(Ear::Left, Conduction::Bone, *f, left_bone[i]);
        }
        case
    }

    pub fn ear(&self, ear: Ear) -> &EarThresholds {
        match ear {
            Ear::Right => &self.right,
            Ear::Left => &self.left,
        }
    }

    fn ear_mut(&mut self, ear: Ear) -> &mut EarThresholds {
        match ear {
            Ear::Right => &mut self.right,
            Ear::Left => &mut self.left,
        }
    }

    pub fn set(&mut self, ear: Ear, mode: Conduction, freq: Frequency, db: Db) {
        let e = self.ear_mut(ear);
        match mode {
            Conduction::Air => e.air.insert(freq, db),
            Conduction::Bone => e.bone.insert(freq, db),
        };
    }

    pub fn with(mut self, ear: Ear, mode: Conduction, freq: Frequency, db: Db) -> Self {
        self.set(ear, mode, freq, db);
        self
    }

    pub fn remove(&mut self, ear: Ear, mode: Conduction, freq: Frequency) -> Option<Db> {
        let e = self.ear_mut(ear);
        match mode {
            Conduction::Air => e.air.remove(&freq),
            Conduction::Bone => e.bone.remove(&freq),
        }
    }

    /// Check the case invariants: every value a multiple of 5 within
    /// [-10, 120], air present at all frequencies, bone only at bone
    /// frequencies.
    pub fn validate(&self) -> Result<()> {
        for ear in Ear::BOTH {
            let e = self.ear(ear);
            for mode in Conduction::BOTH {
                for (freq, db) in e.table(mode) {
                    if !(MIN_LEVEL_DB..=MAX_LEVEL_DB).contains(db) || db % 5 != 0 {
                        return Err(Error::InvalidCase(format!(
                            "{} {} {}: {db} dB is not a multiple of 5 within [{MIN_LEVEL_DB}, {MAX_LEVEL_DB}]",
                            ear.label(),
                            mode.label(),
                            freq
                        )));
                    }
                    if mode == Conduction::Bone && !freq.has_bone() {
                        return Err(Error::InvalidCase(format!(
                            "{} bone threshold at {freq}: bone is only tested at 500-4000Hz",
                            ear.label()
                        )));
                    }
                }
            }
            if let Some(freq) = Frequency::ALL.iter().find(|f| !e.air.contains_key(f)) {
                return Err(Error::InvalidCase(format!(
                    "{} air threshold missing at {freq}",
                    ear.label()
                )));
            }
        }
        Ok(())
    }

    /// True when every bone threshold is at or below the air threshold of
    /// the same ear and frequency. Generated cases always satisfy this.
    pub fn bone_within_air(&self) -> bool {
        Ear::BOTH.iter().all(|&ear| {
            let e = self.ear(ear);
            e.bone
                .iter()
                .all(|(f, b)| e.air.get(f).map_or(true, |a| b <= a))
        })
    }
}

impl ThresholdSource for PatientCase {
    fn air(&self, ear: Ear, freq: Frequency) -> Option<Db> {
        self.ear(ear).air.get(&freq).copied()
    }

    fn bone(&self, ear: Ear, freq: Frequency) -> Option<Db> {
        self.ear(ear).bone.get(&freq).copied()
    }
}

use serde::{Deserialize, Serialize};

use crate::types::{clamp_level, Conduction, Db, Ear, Frequency, MaskType};

/// Audiometer settings chosen by the operator.
///
/// The control methods keep every field inside its valid range; the engine
/// clamps again on read so a hand-built state cannot push it out of range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestState {
    pub frequency: Frequency,
    pub level: Db,
    pub test_ear: Ear,
    pub conduction: Conduction,
    pub masking_enabled: bool,
    pub mask_level: Db,
    pub mask_type: MaskType,
    pub mask_ear: Ear,
}

impl Default for TestState {
    fn default() -> Self {
        Self {
            frequency: Frequency::Hz1000,
            level: 30,
            test_ear: Ear::Right,
            conduction: Conduction::Air,
            masking_enabled: false,
            mask_level: 0,
            mask_type: MaskType::NarrowbandNoise,
            mask_ear: Ear::Left,
        }
    }
}

impl TestState {
    pub fn step_frequency(&mut self, steps: i32) {
        self.frequency = self.frequency.step(steps);
    }

    pub fn step_level(&mut self, delta: Db) {
        self.level = clamp_level(self.level.saturating_add(delta));
    }

    pub fn set_level(&mut self, db: Db) {
        self.level = clamp_level(db);
    }

    pub fn set_ear(&mut self, ear: Ear) {
        self.test_ear = ear;
    }

    pub fn set_conduction(&mut self, mode: Conduction) {
        self.conduction = mode;
    }

    /// Turning masking on routes the noise to the non-test ear.
    pub fn set_masking(&mut self, enabled: bool) {
        self.masking_enabled = enabled;
        if enabled {
            self.mask_ear = self.test_ear.opposite();
        }
    }

    pub fn step_mask_level(&mut self, delta: Db, max_mask_db: Db) {
        self.mask_level = self.mask_level.saturating_add(delta).clamp(0, max_mask_db);
    }

    pub fn set_mask_ear(&mut self, ear: Ear) {
        self.mask_ear = ear;
    }

    pub fn set_mask_type(&mut self, mask_type: MaskType) {
        self.mask_type = mask_type;
    }

    /// Masking noise actually reaches an ear.
    #[inline]
    pub fn masking_active(&self) -> bool {
        self.masking_enabled && self.mask_level > 0
    }
}

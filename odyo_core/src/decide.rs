//odyo_core/decide.rs

use serde::{Deserialize, Serialize};

use crate::cfg::OdyoCfg;
use crate::state::TestState;
use crate::thresholds::ThresholdSource;
use crate::trial::TrialRecord;
use crate::types::{clamp_level, Db, MaskType};

/// Intermediate values of one presentation, exposed for the log view and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub interaural_attenuation: Db,
    pub crossover_level: Db,
    pub effective_masking: Db,
    pub overmasking_effect: Db,
    pub effective_test_threshold: Db,
    pub effective_non_test_bone: Db,
}

/// Patient response to one tone presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneResponse {
    pub heard: bool,
    /// Masker leaked back to the test ear on this presentation.
    pub overmasking: bool,
    /// Present whenever masking was switched on and the trial was valid.
    pub trial: Option<TrialRecord>,
    pub detail: ResponseDetail,
}

impl ToneResponse {
    fn no_response() -> Self {
        Self {
            heard: false,
            overmasking: false,
            trial: None,
            detail: ResponseDetail::default(),
        }
    }
}

/// Overmasking effect after the white-noise surcharge, rounded up.
#[inline]
fn leak_effect(effect: Db, mask_type: MaskType, cfg: &OdyoCfg) -> Db {
    match mask_type {
        MaskType::NarrowbandNoise => effect,
        MaskType::WhiteNoise if effect > 0 => {
            let scaled = effect * cfg.white_noise_leak_pct;
            (scaled + 99) / 100
        }
        MaskType::WhiteNoise => effect,
    }
}

/// Decide whether the simulated patient responds to the tone described by
/// `state`. Pure: the caller owns the trial log and appends `trial`.
pub fn present_tone<S: ThresholdSource + ?Sized>(
    state: &TestState,
    case: &S,
    cfg: &OdyoCfg,
) -> ToneResponse {
    let freq = state.frequency;
    let mode = state.conduction;
    let test_ear = state.test_ear;
    let non_test_ear = test_ear.opposite();
    let signal = clamp_level(state.level);
    let mask_level = state.mask_level.clamp(0, cfg.max_mask_db);

    let test_threshold = case.threshold(test_ear, mode, freq);
    let test_bone = case.bone_only(test_ear, freq);
    let non_test_bone = case.bone_only(non_test_ear, freq);

    let ia = cfg.interaural_attenuation(mode);
    let crossover = signal - ia;

    let mut effective_masking = 0;
    let mut overmasking_effect = 0;
    let mut overmasking = false;

    if state.masking_enabled && mask_level > 0 {
        let Some(mask_ear_air) = case.air(state.mask_ear, freq) else {
            tracing::debug!(
                mask_ear = ?state.mask_ear,
                %freq,
                "mask ear has no air threshold; treating as no response"
            );
            return ToneResponse::no_response();
        };

        effective_masking = (mask_level - mask_ear_air).max(0);

        let mask_crossover = mask_level - ia;
        if mask_crossover >= test_bone {
            overmasking = true;
            overmasking_effect = mask_crossover - test_bone + cfg.overmask_margin_db;
        }
        overmasking_effect = leak_effect(overmasking_effect, state.mask_type, cfg);
    }

    let mut effective_test = test_threshold;
    let mut effective_non_test_bone = non_test_bone;

    if state.masking_enabled {
        if state.mask_ear == non_test_ear {
            effective_non_test_bone = non_test_bone + effective_masking;
            if overmasking {
                effective_test = test_threshold + overmasking_effect;
            }
        } else {
            effective_test = test_threshold + effective_masking;
        }
    }

    let heard = signal >= effective_test || crossover >= effective_non_test_bone;

    let detail = ResponseDetail {
        interaural_attenuation: ia,
        crossover_level: crossover,
        effective_masking,
        overmasking_effect,
        effective_test_threshold: effective_test,
        effective_non_test_bone,
    };

    tracing::trace!(
        %freq,
        ear = ?test_ear,
        ?mode,
        signal,
        mask_level,
        heard,
        overmasking,
        ?detail,
        "tone presented"
    );

    let trial = state.masking_enabled.then(|| TrialRecord {
        frequency: freq,
        test_ear,
        conduction: mode,
        signal_level: signal,
        mask_level,
        mask_ear: state.mask_ear,
        mask_type: state.mask_type,
        heard,
        is_overmasking: overmasking,
    });

    ToneResponse {
        heard,
        overmasking,
        trial,
        detail,
    }
}

use serde::{Deserialize, Serialize};

use crate::cfg::OdyoCfg;
use crate::thresholds::ThresholdSource;
use crate::trial::TrialLog;
use crate::types::{Conduction, Ear, Frequency, PointKey};

/// Masking is required when the test ear's threshold, after crossing the
/// skull, could reach the non-test ear's bone pathway.
pub fn is_masking_required<S: ThresholdSource + ?Sized>(
    case: &S,
    ear: Ear,
    freq: Frequency,
    mode: Conduction,
    cfg: &OdyoCfg,
) -> bool {
    let test = case.threshold(ear, mode, freq);
    let non_test_bone = case.bone_only(ear.opposite(), freq);
    test - non_test_bone >= cfg.interaural_attenuation(mode)
}

/// Positions of a complete audiogram that need masking for this case.
pub fn required_points<'a, S: ThresholdSource + ?Sized>(
    case: &'a S,
    cfg: &'a OdyoCfg,
) -> impl Iterator<Item = PointKey> + 'a {
    PointKey::all()
        .filter(move |k| is_masking_required(case, k.ear, k.frequency, k.conduction, cfg))
}

/// How masking was handled at one required position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMasking {
    pub key: PointKey,
    pub performed: bool,
    pub wrong_ear: bool,
    pub overmasked: bool,
    pub correctly_masked: bool,
}

/// Technique grade over the whole trial log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingAssessment {
    /// Always <= 0; added to the session score.
    pub score: i32,
    pub feedback: Vec<String>,
    pub required_count: usize,
    pub correctly_masked: usize,
    pub wrong_ear_count: usize,
    pub overmask_count: usize,
    pub points: Vec<PointMasking>,
}

impl MaskingAssessment {
    pub fn missing_count(&self) -> usize {
        self.required_count - self.correctly_masked
    }
}

pub fn evaluate_masking<S: ThresholdSource + ?Sized>(
    case: &S,
    log: &TrialLog,
    cfg: &OdyoCfg,
) -> MaskingAssessment {
    let mut out = MaskingAssessment::default();

    for key in required_points(case, cfg) {
        out.required_count += 1;

        let mut point = PointMasking {
            key,
            performed: false,
            wrong_ear: false,
            overmasked: false,
            correctly_masked: false,
        };

        for t in log.for_point(key) {
            point.performed = true;
            point.wrong_ear |= t.wrong_ear();
            point.overmasked |= t.is_overmasking;
            point.correctly_masked |= t.mask_ear == key.ear.opposite() && !t.is_overmasking;
        }

        if !point.performed {
            out.feedback.push(format!("{key}: masking required but not performed"));
            out.points.push(point);
            continue;
        }
        if point.wrong_ear {
            out.wrong_ear_count += 1;
            out.feedback.push(format!("{key}: masking noise was sent to the test ear"));
        }
        if point.overmasked {
            out.overmask_count += 1;
            out.feedback.push(format!("{key}: overmasking occurred"));
        }
        if point.correctly_masked {
            out.correctly_masked += 1;
        }
        out.points.push(point);
    }

    if out.required_count == 0 {
        return out;
    }

    let per = cfg.mask_penalty_per_item;

    let missing = (out.missing_count() as i32 * per).min(cfg.missing_mask_cap);
    out.score -= missing;
    if missing > 0 {
        out.feedback.push(format!("Missing or ineffective masking: -{missing} points"));
    }

    if out.wrong_ear_count > 0 {
        let p = (out.wrong_ear_count as i32 * per).min(cfg.wrong_ear_cap);
        out.score -= p;
        out.feedback.push(format!("Masking the wrong ear: -{p} points"));
    }

    if out.overmask_count > 0 {
        let p = (out.overmask_count as i32 * per).min(cfg.overmask_cap);
        out.score -= p;
        out.feedback.push(format!("Overmasking detected: -{p} points"));
    }

    out
}

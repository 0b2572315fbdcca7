use serde::{Deserialize, Serialize};

use crate::cfg::OdyoCfg;
use crate::error::{Error, Result};
use crate::masking::{evaluate_masking, MaskingAssessment};
use crate::thresholds::PatientCase;
use crate::thresholds::ThresholdSource;
use crate::trial::{MarkedPoints, TrialLog};
use crate::types::{clamp_level, Conduction, PointKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Excellent,
    Fair,
    NeedsPractice,
}

impl Verdict {
    pub fn from_score(score: i32) -> Self {
        if score > 80 {
            Verdict::Excellent
        } else if score > 50 {
            Verdict::Fair
        } else {
            Verdict::NeedsPractice
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "Great work: the audiogram is very close to the true thresholds.",
            Verdict::Fair => "A good start, but some thresholds or masking steps need work.",
            Verdict::NeedsPractice => "Keep practising: thresholds and masking are off in several places.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScore {
    /// Final score in [0, 100].
    pub score: i32,
    /// Sum of per-point errors beyond the tolerance band.
    pub total_error: i32,
    pub hint_used: bool,
    pub masking: MaskingAssessment,
    pub verdict: Verdict,
}

/// Positions that must be marked before a submission can be scored: air at
/// every frequency, and bone wherever the case defines a bone threshold.
pub fn required_marks(case: &PatientCase) -> impl Iterator<Item = PointKey> + '_ {
    PointKey::all().filter(move |k| match k.conduction {
        Conduction::Air => true,
        Conduction::Bone => case.bone(k.ear, k.frequency).is_some(),
    })
}

/// Score a finished audiogram.
///
/// Fails with [`Error::Incomplete`] when a required point is unmarked; no
/// partial score is produced.
pub fn finish_session(
    marks: &MarkedPoints,
    case: &PatientCase,
    log: &TrialLog,
    used_hint: bool,
    cfg: &OdyoCfg,
) -> Result<SessionScore> {
    let mut total_error = 0;
    let mut missing = Vec::new();

    for key in required_marks(case) {
        let Some(marked) = marks.get(key) else {
            missing.push(key);
            continue;
        };
        // Both sides clamped: a restored snapshot may carry arbitrary levels.
        let marked = clamp_level(marked);
        let truth = clamp_level(case.threshold(key.ear, key.conduction, key.frequency));
        total_error += ((marked - truth).abs() - cfg.tolerance_db).max(0);
    }

    if !missing.is_empty() {
        tracing::warn!(missing = missing.len(), "submission rejected: unmarked required points");
        return Err(Error::Incomplete { missing });
    }

    let masking = evaluate_masking(case, log, cfg);

    let mut score = 100;
    if used_hint {
        score -= cfg.hint_penalty;
    }
    score -= total_error;
    score += masking.score;
    let score = score.clamp(0, 100);

    tracing::info!(
        score,
        total_error,
        masking = masking.score,
        used_hint,
        "session scored"
    );

    Ok(SessionScore {
        score,
        total_error,
        hint_used: used_hint,
        masking,
        verdict: Verdict::from_score(score),
    })
}

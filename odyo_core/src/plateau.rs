use serde::{Deserialize, Serialize};

use crate::cfg::OdyoCfg;
use crate::trial::{TrialLog, TrialRecord};
use crate::types::{Conduction, Db, Ear, Frequency};

/// A stable response across rising masker levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plateau {
    pub threshold_db: Db,
    pub frequency: Frequency,
    pub ear: Ear,
    pub conduction: Conduction,
    /// Whether the tone was heard across the plateau.
    pub heard: bool,
}

/// Look for a plateau at the position and level of the latest trial.
///
/// The last `plateau_window` matching trials must agree on `heard`, have
/// strictly rising mask levels, and cover at least `plateau_min_span_db`.
pub fn detect_plateau(log: &TrialLog, cfg: &OdyoCfg) -> Option<Plateau> {
    let last = log.last()?;
    let same = |t: &&TrialRecord| {
        t.frequency == last.frequency
            && t.test_ear == last.test_ear
            && t.conduction == last.conduction
            && t.signal_level == last.signal_level
    };

    let relevant: Vec<&TrialRecord> = log.entries().iter().filter(same).collect();
    let n = cfg.plateau_window;
    if relevant.len() < n {
        return None;
    }
    let window = &relevant[relevant.len() - n..];

    let heard = window[0].heard;
    let same_heard = window.iter().all(|t| t.heard == heard);
    let increasing = window.windows(2).all(|w| w[0].mask_level < w[1].mask_level);
    let span = window[n - 1].mask_level - window[0].mask_level;

    if same_heard && increasing && span >= cfg.plateau_min_span_db {
        tracing::debug!(
            freq = %last.frequency,
            ear = ?last.test_ear,
            threshold = last.signal_level,
            span,
            "masking plateau reached"
        );
        Some(Plateau {
            threshold_db: window[0].signal_level,
            frequency: last.frequency,
            ear: last.test_ear,
            conduction: last.conduction,
            heard,
        })
    } else {
        None
    }
}

/// Summary line for a plateau log view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlateauStatus {
    Empty,
    Found(Plateau),
    /// An overmasked trial sits in the recent window.
    Overmasking,
    /// Number of recent trials shown.
    Collecting(usize),
}

pub fn plateau_status(log: &TrialLog, cfg: &OdyoCfg) -> PlateauStatus {
    let recent = log.recent(cfg.status_window);
    if recent.is_empty() {
        return PlateauStatus::Empty;
    }
    if let Some(p) = detect_plateau(log, cfg) {
        return PlateauStatus::Found(p);
    }
    if recent.iter().any(|t| t.is_overmasking) {
        PlateauStatus::Overmasking
    } else {
        PlateauStatus::Collecting(recent.len())
    }
}

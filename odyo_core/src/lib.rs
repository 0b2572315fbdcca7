//! Patient-response model for simulated pure-tone audiometry with masking.
//!
//! Everything here is synchronous and side-effect free apart from logging;
//! session ownership lives in `odyo_supervisor`.

pub mod types;
pub mod error;
pub mod cfg;
pub mod thresholds;
pub mod state;
pub mod trial;
pub mod decide;
pub mod masking;
pub mod plateau;
pub mod score;
pub mod case_gen;

pub use types::{Db, Ear, Conduction, Frequency, MaskType, PointKey, MIN_LEVEL_DB, MAX_LEVEL_DB, clamp_level};
pub use error::{Error, Result};
pub use cfg::OdyoCfg;
pub use thresholds::{ThresholdSource, EarThresholds, PatientCase};
pub use state::TestState;
pub use trial::{TrialRecord, TrialLog, MarkedPoint, MarkedPoints};
pub use decide::{ToneResponse, ResponseDetail, present_tone};
pub use masking::{is_masking_required, required_points, evaluate_masking, MaskingAssessment, PointMasking};
pub use plateau::{Plateau, PlateauStatus, detect_plateau, plateau_status};
pub use score::{SessionScore, Verdict, finish_session, required_marks};
pub use case_gen::{CaseCategory, PatientGroup, PatientProfile, GeneratedCase, generate_case, generate_case_of};

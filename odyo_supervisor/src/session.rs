//! One operator working one patient case.
//!
//! A `Session` owns the case, the audiometer settings, the trial log and the
//! marked points. Every handler runs to completion; nothing here spawns or
//! blocks.

use odyo_core::{
    detect_plateau, finish_session, Db, generate_case, is_masking_required, plateau_status,
    present_tone, OdyoCfg, PatientCase, PatientProfile, Plateau, PlateauStatus, PointKey,
    SessionScore, TestState, ToneResponse, TrialLog, MarkedPoints,
};
use rand::Rng;

const GENERIC_HINT: &str = "The patient seems to struggle with high-pitched sounds.";

/// What a tone presentation reports back to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToneOutcome {
    pub response: ToneResponse,
    /// A trial was appended to the log.
    pub logged: bool,
    pub plateau: Option<Plateau>,
}

impl ToneOutcome {
    #[inline]
    pub fn heard(&self) -> bool {
        self.response.heard
    }

    #[inline]
    pub fn overmasking(&self) -> bool {
        self.response.overmasking
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub case: PatientCase,
    /// Only present for generated cases.
    pub profile: Option<PatientProfile>,
    pub state: TestState,
    pub log: TrialLog,
    pub marks: MarkedPoints,
    pub used_hint: bool,
}

impl Session {
    /// Start a session on a hand-authored case.
    ///
    /// The case is taken as-is; callers holding untrusted data should run
    /// `PatientCase::validate` first (`SessionSupervisor::open` does).
    pub fn new(case: PatientCase) -> Self {
        Self {
            case,
            profile: None,
            state: TestState::default(),
            log: TrialLog::new(),
            marks: MarkedPoints::new(),
            used_hint: false,
        }
    }

    pub fn generated<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let g = generate_case(rng);
        let mut s = Self::new(g.case);
        s.profile = Some(g.profile);
        s
    }

    /// Replace the case and reset everything tied to the previous one.
    pub fn new_case(&mut self, case: PatientCase, profile: Option<PatientProfile>) {
        self.case = case;
        self.profile = profile;
        self.state = TestState::default();
        self.log.clear();
        self.marks.clear();
        self.used_hint = false;
        tracing::info!(
            category = self.profile.as_ref().map(|p| p.category.name()),
            "new case started"
        );
    }

    pub fn new_generated_case<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let g = generate_case(rng);
        self.new_case(g.case, Some(g.profile));
    }

    /// Audiogram position the controls currently point at.
    pub fn current_point(&self) -> PointKey {
        PointKey::new(self.state.test_ear, self.state.conduction, self.state.frequency)
    }

    /// Present the current tone, logging the trial when masking is on.
    pub fn present_tone(&mut self, cfg: &OdyoCfg) -> ToneOutcome {
        let response = present_tone(&self.state, &self.case, cfg);

        let logged = match response.trial {
            Some(trial) => {
                self.log.push(trial);
                true
            }
            None => false,
        };
        if response.overmasking {
            tracing::warn!(
                freq = %self.state.frequency,
                mask_level = self.state.mask_level,
                "overmasking: masker is reaching the test ear"
            );
        }

        let plateau = if logged { detect_plateau(&self.log, cfg) } else { None };
        ToneOutcome { response, logged, plateau }
    }

    /// Mark the current level at the current position. Returns the level
    /// it replaced, if any.
    pub fn mark_threshold(&mut self) -> Option<Db> {
        let key = self.current_point();
        let prev = self.marks.mark(key, self.state.level);
        tracing::debug!(%key, level = self.state.level, "threshold marked");
        prev
    }

    pub fn delete_point(&mut self) -> Option<Db> {
        self.marks.remove(self.current_point())
    }

    /// First call returns the hint text; later calls return `None`.
    pub fn use_hint(&mut self) -> Option<&'static str> {
        if self.used_hint {
            return None;
        }
        self.used_hint = true;
        Some(
            self.profile
                .as_ref()
                .map(|p| p.category.hint())
                .unwrap_or(GENERIC_HINT),
        )
    }

    /// Whether the current position needs masking for an unambiguous result.
    pub fn masking_required_here(&self, cfg: &OdyoCfg) -> bool {
        is_masking_required(
            &self.case,
            self.state.test_ear,
            self.state.frequency,
            self.state.conduction,
            cfg,
        )
    }

    pub fn plateau_status(&self, cfg: &OdyoCfg) -> PlateauStatus {
        plateau_status(&self.log, cfg)
    }

    pub fn finish(&self, cfg: &OdyoCfg) -> odyo_core::Result<SessionScore> {
        finish_session(&self.marks, &self.case, &self.log, self.used_hint, cfg)
    }
}

//! Operator-control adapter: discrete audiometer actions applied to a `Session`.
//!
//! No IO, no rendering. Hosts translate their own input (buttons, keys, FFI
//! codes) into `OperatorAction`s and render the returned `ActionOutcome`.

use odyo_core::{Conduction, Db, Ear, MaskType, OdyoCfg, TestState};

use crate::session::{Session, ToneOutcome};

/// One discrete operator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OperatorAction {
    /// Move along the frequency table; clamped at either end.
    StepFrequency(i32),
    StepLevel(Db),
    SetEar(Ear),
    SetConduction(Conduction),
    SetMasking(bool),
    StepMaskLevel(Db),
    SetMaskEar(Ear),
    SetMaskType(MaskType),
    PresentTone,
    MarkThreshold,
    DeletePoint,
    UseHint,
}

/// Result of applying an `OperatorAction`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActionOutcome {
    /// A control changed; carries the new settings.
    State(TestState),
    Tone(ToneOutcome),
    /// Level previously marked at that position, if any.
    Marked { replaced: Option<Db> },
    Deleted { removed: Option<Db> },
    /// `None` once the hint has been used.
    Hint(Option<String>),
}

impl Session {
    /// Apply one operator action.
    pub fn apply(&mut self, action: OperatorAction, cfg: &OdyoCfg) -> ActionOutcome {
        let st = &mut self.state;
        match action {
            OperatorAction::StepFrequency(steps) => st.step_frequency(steps),
            OperatorAction::StepLevel(delta) => st.step_level(delta),
            OperatorAction::SetEar(ear) => st.set_ear(ear),
            OperatorAction::SetConduction(mode) => st.set_conduction(mode),
            OperatorAction::SetMasking(on) => st.set_masking(on),
            OperatorAction::StepMaskLevel(delta) => st.step_mask_level(delta, cfg.max_mask_db),
            OperatorAction::SetMaskEar(ear) => st.set_mask_ear(ear),
            OperatorAction::SetMaskType(t) => st.set_mask_type(t),
            OperatorAction::PresentTone => return ActionOutcome::Tone(self.present_tone(cfg)),
            OperatorAction::MarkThreshold => {
                return ActionOutcome::Marked { replaced: self.mark_threshold() }
            }
            OperatorAction::DeletePoint => {
                return ActionOutcome::Deleted { removed: self.delete_point() }
            }
            OperatorAction::UseHint => {
                return ActionOutcome::Hint(self.use_hint().map(str::to_string))
            }
        }
        tracing::debug!(?action, "control changed");
        ActionOutcome::State(self.state.clone())
    }
}

/// Helper: apply a batch of actions in order, returning every outcome.
pub fn apply_batch(session: &mut Session, actions: &[OperatorAction], cfg: &OdyoCfg) -> Vec<ActionOutcome> {
    actions.iter().map(|a| session.apply(*a, cfg)).collect()
}

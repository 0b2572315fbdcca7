use odyo_core::*;
use odyo_supervisor::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn asym_case() -> PatientCase {
    PatientCase::from_rows([60; 7], [10; 7], [55; 4], [5; 4])
}

fn tone(outcome: ActionOutcome) -> ToneOutcome {
    match outcome {
        ActionOutcome::Tone(t) => t,
        other => panic!("expected tone outcome, got {other:?}"),
    }
}

#[test]
fn unmasked_tone_is_not_logged() {
    let cfg = OdyoCfg::default();
    let mut s = Session::new(asym_case());

    // right 1000 Hz at 45: heard through the left ear (5 + 40)
    s.apply(OperatorAction::StepLevel(15), &cfg);
    let t = tone(s.apply(OperatorAction::PresentTone, &cfg));
    assert!(t.heard());
    assert!(!t.logged);
    assert!(s.log.is_empty());
    assert!(s.masking_required_here(&cfg));
}

#[test]
fn rising_masker_reaches_plateau() {
    let cfg = OdyoCfg::default();
    let mut s = Session::new(asym_case());

    let setup = [
        OperatorAction::StepLevel(30),
        OperatorAction::SetMasking(true),
        OperatorAction::StepMaskLevel(30),
    ];
    apply_batch(&mut s, &setup, &cfg);
    assert_eq!(s.state.mask_ear, Ear::Left);
    assert_eq!(s.plateau_status(&cfg), PlateauStatus::Empty);

    let first = tone(s.apply(OperatorAction::PresentTone, &cfg));
    assert!(first.heard() && first.logged);
    assert_eq!(first.plateau, None);

    s.apply(OperatorAction::StepMaskLevel(10), &cfg);
    let second = tone(s.apply(OperatorAction::PresentTone, &cfg));
    assert_eq!(second.plateau, None);
    assert_eq!(s.plateau_status(&cfg), PlateauStatus::Collecting(2));

    s.apply(OperatorAction::StepMaskLevel(10), &cfg);
    let third = tone(s.apply(OperatorAction::PresentTone, &cfg));
    let p = third.plateau.expect("plateau after three rising trials");
    assert_eq!(p.threshold_db, 60);
    assert_eq!(p.ear, Ear::Right);
    assert!(p.heard);
    assert!(matches!(s.plateau_status(&cfg), PlateauStatus::Found(_)));
}

#[test]
fn loud_masker_reports_overmasking() {
    let cfg = OdyoCfg::default();
    let mut s = Session::new(asym_case());
    apply_batch(
        &mut s,
        &[
            OperatorAction::StepLevel(30),
            OperatorAction::SetMasking(true),
            OperatorAction::StepMaskLevel(95),
        ],
        &cfg,
    );

    let t = tone(s.apply(OperatorAction::PresentTone, &cfg));
    assert!(t.overmasking());
    assert!(!t.heard());
    assert_eq!(s.plateau_status(&cfg), PlateauStatus::Overmasking);
}

#[test]
fn marks_replace_and_delete_at_current_point() {
    let cfg = OdyoCfg::default();
    let mut s = Session::new(asym_case());

    assert_eq!(s.apply(OperatorAction::MarkThreshold, &cfg), ActionOutcome::Marked { replaced: None });
    s.apply(OperatorAction::StepLevel(5), &cfg);
    assert_eq!(s.apply(OperatorAction::MarkThreshold, &cfg), ActionOutcome::Marked { replaced: Some(30) });
    assert_eq!(s.marks.len(), 1);

    s.apply(OperatorAction::StepFrequency(1), &cfg);
    assert_eq!(s.apply(OperatorAction::DeletePoint, &cfg), ActionOutcome::Deleted { removed: None });
    s.apply(OperatorAction::StepFrequency(-1), &cfg);
    assert_eq!(s.apply(OperatorAction::DeletePoint, &cfg), ActionOutcome::Deleted { removed: Some(35) });
    assert!(s.marks.is_empty());
}

#[test]
fn hint_is_given_once() {
    let cfg = OdyoCfg::default();
    let mut s = Session::new(asym_case());

    match s.apply(OperatorAction::UseHint, &cfg) {
        ActionOutcome::Hint(Some(text)) => assert!(!text.is_empty()),
        other => panic!("expected hint text, got {other:?}"),
    }
    assert_eq!(s.apply(OperatorAction::UseHint, &cfg), ActionOutcome::Hint(None));
    assert!(s.used_hint);
}

#[test]
fn finish_needs_every_point_then_scores() {
    let cfg = OdyoCfg::default();
    let case = asym_case();
    let mut s = Session::new(case.clone());

    match s.finish(&cfg) {
        Err(Error::Incomplete { missing }) => assert_eq!(missing.len(), 22),
        other => panic!("expected incomplete, got {other:?}"),
    }

    for key in required_marks(&case) {
        s.marks.mark(key, case.threshold(key.ear, key.conduction, key.frequency));
    }
    let score = s.finish(&cfg).expect("complete");
    assert_eq!(score.score, 85);
    assert_eq!(score.verdict, Verdict::Excellent);
}

#[test]
fn new_case_resets_session() {
    let cfg = OdyoCfg::default();
    let mut rng = StdRng::seed_from_u64(7);
    let mut s = Session::new(asym_case());
    apply_batch(
        &mut s,
        &[
            OperatorAction::SetMasking(true),
            OperatorAction::StepMaskLevel(40),
            OperatorAction::SetMaskType(MaskType::WhiteNoise),
            OperatorAction::PresentTone,
            OperatorAction::MarkThreshold,
            OperatorAction::UseHint,
        ],
        &cfg,
    );
    assert!(!s.log.is_empty());

    s.new_generated_case(&mut rng);
    assert!(s.profile.is_some());
    assert_eq!(s.state, TestState::default());
    assert!(s.log.is_empty());
    assert!(s.marks.is_empty());
    assert!(!s.used_hint);
}

#[test]
fn supervisor_keeps_sessions_apart() {
    let sup = SessionSupervisor::new(4, OdyoCfg::default());
    assert!(!sup.open("a", asym_case()).expect("valid case"));
    assert!(!sup.open("b", asym_case()).expect("valid case"));
    assert_eq!(sup.len(), 2);

    sup.dispatch("a", OperatorAction::StepLevel(20));
    let level_a = sup.with_session("a", |s, _| s.state.level);
    let level_b = sup.with_session("b", |s, _| s.state.level);
    assert_eq!(level_a, Some(50));
    assert_eq!(level_b, Some(30));

    assert!(sup.dispatch("missing", OperatorAction::PresentTone).is_none());
    assert!(sup.finish("missing").is_none());
    assert!(matches!(sup.finish("a"), Some(Err(Error::Incomplete { .. }))));

    assert!(sup.close("a").is_some());
    assert!(!sup.contains("a"));
    assert_eq!(sup.len(), 1);
}

#[test]
fn snapshot_survives_json_and_restore() {
    let mut rng = StdRng::seed_from_u64(42);
    let sup = SessionSupervisor::new(2, OdyoCfg::default());
    sup.open("x", asym_case()).expect("valid case");
    sup.open_generated("y", &mut rng);
    for action in [
        OperatorAction::SetMasking(true),
        OperatorAction::StepMaskLevel(30),
        OperatorAction::PresentTone,
        OperatorAction::MarkThreshold,
    ] {
        sup.dispatch("x", action);
    }

    let snap = sup.snapshot();
    assert_eq!(snap.sessions.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>(), ["x", "y"]);

    let json = serde_json::to_string(&snap).expect("serialize");
    let back: SupervisorSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, snap);

    let other = SessionSupervisor::new(3, OdyoCfg::default());
    other.open("z", asym_case()).expect("valid case");
    let stats = other.restore(back.clone());
    assert_eq!(stats, RestoreStats { applied: 2, overwritten: 0, rejected: 0 });
    assert!(!other.contains("z"));
    assert_eq!(other.snapshot(), snap);

    let stats = other.restore_merge(sup.snapshot_sessions(&["x"]));
    assert_eq!(stats, RestoreStats { applied: 1, overwritten: 1, rejected: 0 });
    assert_eq!(other.len(), 2);
}

#[test]
fn supervisor_new_case_uses_generator() {
    let mut rng = StdRng::seed_from_u64(3);
    let sup = SessionSupervisor::new(1, OdyoCfg::default());
    sup.open("s", asym_case()).expect("valid case");
    assert!(sup.new_case("s", &mut rng));
    assert!(!sup.new_case("nope", &mut rng));
    let generated = sup.with_session("s", |s, _| s.profile.is_some());
    assert_eq!(generated, Some(true));
}

/// Snapshot of one fully marked asym session, as JSON for editing.
fn marked_snapshot_json() -> serde_json::Value {
    let case = asym_case();
    let sup = SessionSupervisor::new(1, OdyoCfg::default());
    sup.open("a", case.clone()).expect("valid case");
    sup.with_session("a", |s, _| {
        for key in required_marks(&case) {
            s.marks.mark(key, case.threshold(key.ear, key.conduction, key.frequency));
        }
    });
    serde_json::to_value(sup.snapshot()).expect("serialize")
}

#[test]
fn restored_out_of_range_marks_are_clamped_before_scoring() {
    let mut json = marked_snapshot_json();
    let marks = json["sessions"][0][1]["marks"].as_array_mut().expect("marks array");
    for m in marks.iter_mut() {
        if m["ear"] == "right" && m["conduction"] == "air" && m["frequency"] == 1000 {
            m["level"] = serde_json::json!(i32::MIN);
        }
    }
    let snap: SupervisorSnapshot = serde_json::from_value(json).expect("deserialize");

    let sup = SessionSupervisor::new(2, OdyoCfg::default());
    assert_eq!(sup.restore(snap), RestoreStats { applied: 1, overwritten: 0, rejected: 0 });

    let key = PointKey::new(Ear::Right, Conduction::Air, Frequency::Hz1000);
    assert_eq!(sup.with_session("a", |s, _| s.marks.get(key)), Some(Some(MIN_LEVEL_DB)));

    // |-10 - 60| - 5 = 65 error, minus 15 for unperformed masking
    let score = sup.finish("a").expect("known session").expect("complete");
    assert_eq!(score.total_error, 65);
    assert_eq!(score.score, 20);
}

#[test]
fn restore_skips_sessions_with_invalid_cases() {
    let mut json = marked_snapshot_json();
    json["sessions"][0][1]["case"]["right"]["air"]["1000"] = serde_json::json!(i32::MAX);
    let bad: SupervisorSnapshot = serde_json::from_value(json).expect("deserialize");

    let sup = SessionSupervisor::new(2, OdyoCfg::default());
    sup.open("keep", asym_case()).expect("valid case");

    let mut snap = bad.clone();
    snap.sessions.push(("good".to_string(), Session::new(asym_case())));
    let stats = sup.restore_merge(snap);
    assert_eq!(stats, RestoreStats { applied: 1, overwritten: 0, rejected: 1 });
    assert!(!sup.contains("a"));
    assert!(sup.contains("good"));
    assert!(sup.contains("keep"));

    let stats = sup.restore(bad);
    assert_eq!(stats, RestoreStats { applied: 0, overwritten: 0, rejected: 1 });
    assert!(sup.is_empty());
}

#[test]
fn open_rejects_invalid_case() {
    let sup = SessionSupervisor::new(1, OdyoCfg::default());
    let odd = asym_case().with(Ear::Left, Conduction::Air, Frequency::Hz500, 12);
    assert!(matches!(sup.open("x", odd), Err(Error::InvalidCase(_))));
    assert!(!sup.contains("x"));
}

use odyo_core::*;
use pretty_assertions::assert_eq;

fn asym_case() -> PatientCase {
    PatientCase::from_rows([60; 7], [10; 7], [55; 4], [5; 4])
}

/// Marks every required point at its true threshold.
fn perfect_marks(case: &PatientCase) -> MarkedPoints {
    required_marks(case)
        .map(|k| (k, case.threshold(k.ear, k.conduction, k.frequency)))
        .collect()
}

#[test]
fn perfect_audiogram_only_loses_masking_points() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let marks = perfect_marks(&case);
    assert_eq!(marks.len(), 22);

    let s = finish_session(&marks, &case, &TrialLog::new(), false, &cfg).expect("complete");
    assert_eq!(s.total_error, 0);
    assert_eq!(s.masking.score, -15);
    assert_eq!(s.score, 85);
    assert_eq!(s.verdict, Verdict::Excellent);
    assert!(!s.hint_used);
}

#[test]
fn hint_and_threshold_errors_are_subtracted() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let mut marks = perfect_marks(&case);

    // 5 dB off is free, 15 dB off costs 10
    marks.mark(PointKey::new(Ear::Left, Conduction::Air, Frequency::Hz250), 15);
    marks.mark(PointKey::new(Ear::Right, Conduction::Air, Frequency::Hz1000), 45);

    let s = finish_session(&marks, &case, &TrialLog::new(), true, &cfg).expect("complete");
    assert_eq!(s.total_error, 10);
    assert_eq!(s.score, 100 - 10 - 10 - 15);
    assert_eq!(s.verdict, Verdict::Fair);
}

#[test]
fn score_is_clamped_at_zero() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let marks: MarkedPoints = required_marks(&case).map(|k| (k, 120)).collect();
    let s = finish_session(&marks, &case, &TrialLog::new(), true, &cfg).expect("complete");
    assert_eq!(s.score, 0);
    assert_eq!(s.verdict, Verdict::NeedsPractice);
}

#[test]
fn missing_air_point_blocks_scoring() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let mut marks = perfect_marks(&case);
    let gone = PointKey::new(Ear::Right, Conduction::Air, Frequency::Hz8000);
    marks.remove(gone);

    match finish_session(&marks, &case, &TrialLog::new(), false, &cfg) {
        Err(Error::Incomplete { missing }) => assert_eq!(missing, vec![gone]),
        other => panic!("expected incomplete, got {other:?}"),
    }
}

#[test]
fn bone_is_required_only_where_the_case_defines_it() {
    let mut case = asym_case();
    case.remove(Ear::Left, Conduction::Bone, Frequency::Hz4000);
    let cfg = OdyoCfg::default();

    let marks = perfect_marks(&case);
    assert_eq!(marks.len(), 21);
    assert!(finish_session(&marks, &case, &TrialLog::new(), false, &cfg).is_ok());
}

#[test]
fn scoring_is_idempotent() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let marks = perfect_marks(&case);
    let log: TrialLog = [TrialRecord {
        frequency: Frequency::Hz1000,
        test_ear: Ear::Right,
        conduction: Conduction::Air,
        signal_level: 60,
        mask_level: 50,
        mask_ear: Ear::Left,
        mask_type: MaskType::NarrowbandNoise,
        heard: true,
        is_overmasking: false,
    }]
    .into_iter()
    .collect();

    let a = finish_session(&marks, &case, &log, false, &cfg).expect("complete");
    let b = finish_session(&marks, &case, &log, false, &cfg).expect("complete");
    assert_eq!(a, b);
}

#[test]
fn extreme_marked_levels_are_clamped_before_scoring() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let mut marks = perfect_marks(&case);
    let low = PointKey::new(Ear::Right, Conduction::Air, Frequency::Hz1000);
    let high = PointKey::new(Ear::Left, Conduction::Air, Frequency::Hz1000);
    marks.mark(low, i32::MIN);
    marks.mark(high, i32::MAX);
    assert_eq!(marks.get(low), Some(MIN_LEVEL_DB));
    assert_eq!(marks.get(high), Some(MAX_LEVEL_DB));

    // |-10 - 60| - 5 = 65 and |120 - 10| - 5 = 105
    let s = finish_session(&marks, &case, &TrialLog::new(), false, &cfg).expect("complete");
    assert_eq!(s.total_error, 170);
    assert_eq!(s.score, 0);
}

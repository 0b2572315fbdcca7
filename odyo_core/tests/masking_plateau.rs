use odyo_core::*;
use pretty_assertions::assert_eq;

fn asym_case() -> PatientCase {
    PatientCase::from_rows([60; 7], [10; 7], [55; 4], [5; 4])
}

fn trial(freq: Frequency, signal: Db, mask: Db, heard: bool) -> TrialRecord {
    TrialRecord {
        frequency: freq,
        test_ear: Ear::Right,
        conduction: Conduction::Air,
        signal_level: signal,
        mask_level: mask,
        mask_ear: Ear::Left,
        mask_type: MaskType::NarrowbandNoise,
        heard,
        is_overmasking: false,
    }
}

#[test]
fn masking_required_follows_interaural_attenuation() {
    let case = asym_case();
    let cfg = OdyoCfg::default();

    assert!(is_masking_required(&case, Ear::Right, Frequency::Hz1000, Conduction::Air, &cfg));
    assert!(is_masking_required(&case, Ear::Right, Frequency::Hz1000, Conduction::Bone, &cfg));
    assert!(!is_masking_required(&case, Ear::Left, Frequency::Hz1000, Conduction::Air, &cfg));
    assert!(!is_masking_required(&case, Ear::Left, Frequency::Hz1000, Conduction::Bone, &cfg));

    // 45 - 5 = 40: exactly at the air IA
    let edge = asym_case().with(Ear::Right, Conduction::Air, Frequency::Hz500, 45);
    assert!(is_masking_required(&edge, Ear::Right, Frequency::Hz500, Conduction::Air, &cfg));
    let edge = asym_case().with(Ear::Right, Conduction::Air, Frequency::Hz500, 40);
    assert!(!is_masking_required(&edge, Ear::Right, Frequency::Hz500, Conduction::Air, &cfg));

    // right air at all 7 plus right bone at 4
    assert_eq!(required_points(&case, &cfg).count(), 11);
}

#[test]
fn unperformed_masking_is_capped() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let a = evaluate_masking(&case, &TrialLog::new(), &cfg);

    assert_eq!(a.required_count, 11);
    assert_eq!(a.correctly_masked, 0);
    assert_eq!(a.score, -15);
    assert_eq!(
        a.feedback.iter().filter(|f| f.contains("required but not performed")).count(),
        11
    );
}

#[test]
fn wrong_ear_and_overmasking_are_penalised() {
    let case = asym_case();
    let cfg = OdyoCfg::default();

    let correct = trial(Frequency::Hz1000, 60, 50, true);
    let wrong = TrialRecord {
        mask_ear: Ear::Right,
        ..trial(Frequency::Hz2000, 60, 50, true)
    };
    let over = TrialRecord {
        conduction: Conduction::Bone,
        is_overmasking: true,
        ..trial(Frequency::Hz500, 55, 60, false)
    };
    let log: TrialLog = [correct, wrong, over].into_iter().collect();

    let a = evaluate_masking(&case, &log, &cfg);
    assert_eq!(a.required_count, 11);
    assert_eq!(a.correctly_masked, 1);
    assert_eq!(a.wrong_ear_count, 1);
    assert_eq!(a.overmask_count, 1);
    assert_eq!(a.missing_count(), 10);
    // missing 50 -> 15, wrong ear 5, overmasking 5
    assert_eq!(a.score, -25);
    assert!(a.feedback.iter().any(|f| f.contains("sent to the test ear")));
    assert!(a.feedback.iter().any(|f| f == "Overmasking detected: -5 points"));
}

#[test]
fn fully_masked_case_costs_nothing() {
    let case = asym_case();
    let cfg = OdyoCfg::default();
    let log: TrialLog = required_points(&case, &cfg)
        .map(|k| TrialRecord {
            test_ear: k.ear,
            conduction: k.conduction,
            mask_ear: k.ear.opposite(),
            ..trial(k.frequency, 60, 50, true)
        })
        .collect();

    let a = evaluate_masking(&case, &log, &cfg);
    assert_eq!(a.correctly_masked, a.required_count);
    assert_eq!(a.score, 0);
    assert!(a.feedback.is_empty());
}

#[test]
fn plateau_found_over_three_rising_masks() {
    let cfg = OdyoCfg::default();
    let log: TrialLog = [20, 30, 40]
        .into_iter()
        .map(|m| trial(Frequency::Hz1000, 40, m, true))
        .collect();

    let p = detect_plateau(&log, &cfg).expect("plateau");
    assert_eq!(p.threshold_db, 40);
    assert_eq!(p.frequency, Frequency::Hz1000);
    assert_eq!(p.ear, Ear::Right);
    assert!(p.heard);
}

#[test]
fn plateau_broken_by_changed_response() {
    let cfg = OdyoCfg::default();
    let log: TrialLog = [
        trial(Frequency::Hz1000, 40, 20, true),
        trial(Frequency::Hz1000, 40, 30, true),
        trial(Frequency::Hz1000, 40, 40, false),
    ]
    .into_iter()
    .collect();
    assert_eq!(detect_plateau(&log, &cfg), None);
}

#[test]
fn plateau_needs_rising_masks_and_span() {
    let cfg = OdyoCfg::default();

    let not_rising: TrialLog = [20, 40, 30]
        .into_iter()
        .map(|m| trial(Frequency::Hz1000, 40, m, true))
        .collect();
    assert_eq!(detect_plateau(&not_rising, &cfg), None);

    let narrow: TrialLog = [20, 22, 29]
        .into_iter()
        .map(|m| trial(Frequency::Hz1000, 40, m, true))
        .collect();
    assert_eq!(detect_plateau(&narrow, &cfg), None);

    let just_wide: TrialLog = [20, 25, 30]
        .into_iter()
        .map(|m| trial(Frequency::Hz1000, 40, m, false))
        .collect();
    let p = detect_plateau(&just_wide, &cfg).expect("10 dB span is enough");
    assert!(!p.heard);

    let two: TrialLog = [20, 40]
        .into_iter()
        .map(|m| trial(Frequency::Hz1000, 40, m, true))
        .collect();
    assert_eq!(detect_plateau(&two, &cfg), None);
}

#[test]
fn plateau_uses_latest_position_and_level() {
    let cfg = OdyoCfg::default();
    let mut log: TrialLog = [
        trial(Frequency::Hz1000, 40, 20, true),
        trial(Frequency::Hz1000, 40, 30, true),
        trial(Frequency::Hz1000, 45, 35, true),
        trial(Frequency::Hz2000, 40, 35, true),
        trial(Frequency::Hz1000, 40, 40, true),
    ]
    .into_iter()
    .collect();
    assert_eq!(detect_plateau(&log, &cfg).map(|p| p.threshold_db), Some(40));

    log.push(trial(Frequency::Hz1000, 45, 50, true));
    assert_eq!(detect_plateau(&log, &cfg), None);
}

#[test]
fn plateau_status_summarises_recent_log() {
    let cfg = OdyoCfg::default();
    let mut log = TrialLog::new();
    assert_eq!(plateau_status(&log, &cfg), PlateauStatus::Empty);

    log.push(trial(Frequency::Hz1000, 40, 20, true));
    assert_eq!(plateau_status(&log, &cfg), PlateauStatus::Collecting(1));

    log.push(TrialRecord {
        is_overmasking: true,
        ..trial(Frequency::Hz1000, 40, 100, false)
    });
    assert_eq!(plateau_status(&log, &cfg), PlateauStatus::Overmasking);

    for m in [20, 30, 40] {
        log.push(trial(Frequency::Hz500, 35, m, true));
    }
    assert!(matches!(plateau_status(&log, &cfg), PlateauStatus::Found(p) if p.frequency == Frequency::Hz500));
}

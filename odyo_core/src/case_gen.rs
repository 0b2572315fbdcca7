//! Procedural patient cases.
//!
//! Each category shapes an air-conduction curve from a random base plus
//! per-frequency jitter. Bone thresholds at 500-4000Hz follow the air curve
//! minus the category's air-bone gap. Everything ends up on the 5 dB grid
//! within [-10, 120], with bone never above air.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::thresholds::PatientCase;
use crate::types::{clamp_level, Conduction, Db, Ear, Frequency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseCategory {
    Presbycusis,
    Conductive,
    Mixed,
    SuddenUnilateral,
    NoiseInduced,
    Normal,
}

impl CaseCategory {
    pub const ALL: [CaseCategory; 6] = [
        CaseCategory::Presbycusis,
        CaseCategory::Conductive,
        CaseCategory::Mixed,
        CaseCategory::SuddenUnilateral,
        CaseCategory::NoiseInduced,
        CaseCategory::Normal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CaseCategory::Presbycusis => "Presbycusis",
            CaseCategory::Conductive => "Conductive loss",
            CaseCategory::Mixed => "Mixed loss",
            CaseCategory::SuddenUnilateral => "Sudden unilateral sensorineural loss",
            CaseCategory::NoiseInduced => "Noise-induced loss",
            CaseCategory::Normal => "Normal hearing",
        }
    }

    fn age_range(self) -> (u32, u32) {
        match self {
            CaseCategory::Presbycusis => (55, 85),
            CaseCategory::Conductive => (15, 55),
            CaseCategory::Mixed => (30, 70),
            CaseCategory::SuddenUnilateral => (25, 60),
            CaseCategory::NoiseInduced => (30, 55),
            CaseCategory::Normal => (18, 35),
        }
    }

    fn groups(self) -> &'static [PatientGroup] {
        match self {
            CaseCategory::Conductive => &[PatientGroup::Male, PatientGroup::Female, PatientGroup::Child],
            CaseCategory::NoiseInduced => &[PatientGroup::Male],
            _ => &[PatientGroup::Male, PatientGroup::Female],
        }
    }

    fn histories(self) -> &'static [&'static str] {
        match self {
            CaseCategory::Presbycusis => &[
                "Slowly progressive hearing loss in both ears over several years. Turns the TV up. Reports tinnitus.",
                "Family says they do not hear well. Struggles to follow conversation in crowded places.",
                "Long-standing bilateral loss. Has trouble hearing high-pitched sounds such as birdsong and doorbells.",
                "Retired. People around them have to raise their voice. Right ear slightly worse than the left.",
            ],
            CaseCategory::Conductive => &[
                "Aural fullness and blockage. Hears own voice from inside. Recent upper respiratory infection.",
                "Ear pain and discharge with reduced hearing. Otoscopy suggests a tympanic membrane perforation.",
                "History of recurrent middle ear infections, diagnosed with chronic otitis media. Ongoing fullness.",
                "Water trapped in the ear after swimming, hearing dropped afterwards. No pain, feels blocked.",
            ],
            CaseCategory::Mixed => &[
                "Loss with both conductive and sensorineural components: chronic middle ear disease plus inner ear damage.",
                "Had otosclerosis surgery but hearing did not fully recover.",
                "Chronic otitis with age-related inner ear loss on top. Uses a hearing aid but finds it insufficient.",
                "Previous ear surgery. Hearing partly improved but high-frequency loss persists.",
            ],
            CaseCategory::SuddenUnilateral => &[
                "Woke up with sudden hearing loss in one ear. Severe tinnitus and dizziness.",
                "Hearing in one ear dropped suddenly yesterday. Fullness and ringing, no recent infection.",
                "Lost hearing in one ear abruptly while working under stress. Severe tinnitus; went to the emergency room.",
                "Noticed no sound at all in one ear during a phone call. Dizziness and nausea.",
            ],
            CaseCategory::NoiseInduced => &[
                "Fifteen years in a factory without hearing protection. Constant ringing and difficulty following speech.",
                "Hearing loss began after gunfire exposure in military service. Bilateral tinnitus.",
                "Construction worker, years on heavy machinery without protection. Ringing and trouble with high pitches.",
                "DJ for ten years with loud music exposure. Constant humming and difficulty understanding speech.",
            ],
            CaseCategory::Normal => &[
                "Presents with tinnitus. No clear hearing complaint but the ringing is bothersome.",
                "Struggles with speech in noise but fine in quiet. Auditory processing disorder suspected.",
                "Occasional fullness and humming, worse under stress. No clear hearing loss described.",
                "Routine check-up referred from ENT. No specific hearing complaint.",
            ],
        }
    }

    /// Short clinical hint shown when the operator asks for help.
    pub fn hint(self) -> &'static str {
        match self {
            CaseCategory::Presbycusis | CaseCategory::NoiseInduced => {
                "The patient seems to struggle with high-pitched sounds."
            }
            CaseCategory::Conductive | CaseCategory::Mixed => {
                "Compare air and bone results carefully: there may be an air-bone gap."
            }
            CaseCategory::SuddenUnilateral => {
                "The ears differ a lot; watch for cross-hearing and mask the better ear."
            }
            CaseCategory::Normal => "Listen to the history; the thresholds may be unremarkable.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientGroup {
    Male,
    Female,
    Child,
}

impl PatientGroup {
    /// Display names a generated patient of this group may carry.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            PatientGroup::Male => &[
                "Ahmet Y.", "Mehmet K.", "Ali D.", "Hasan T.", "Mustafa B.",
                "İbrahim S.", "Kemal Ö.", "Osman A.", "Yusuf E.", "Emre G.",
            ],
            PatientGroup::Female => &[
                "Ayşe K.", "Fatma D.", "Zeynep B.", "Elif S.", "Merve T.",
                "Hatice Y.", "Esra A.", "Büşra E.", "Selin M.", "Derya Ö.",
            ],
            PatientGroup::Child => &["Efe Y.", "Yağız K.", "Beren S.", "Defne A.", "Mert T.", "Ada B."],
        }
    }
}

/// Non-audiometric details of a generated patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub category: CaseCategory,
    pub age: u32,
    pub group: PatientGroup,
    pub history: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCase {
    pub case: PatientCase,
    pub profile: PatientProfile,
}

/// Raw (unrounded) air curves plus per-ear air-bone gap.
struct Curves {
    right: [Db; 7],
    left: [Db; 7],
    gap_right: Db,
    gap_left: Db,
}

#[inline]
fn r<R: Rng + ?Sized>(rng: &mut R, lo: Db, hi: Db) -> Db {
    rng.gen_range(lo..=hi)
}

#[inline]
fn pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

/// Nearest multiple of 5.
#[inline]
fn round5(db: Db) -> Db {
    (db + 2).div_euclid(5) * 5
}

fn presbycusis<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let b = r(rng, 5, 15);
    Curves {
        right: [
            b,
            b,
            b + r(rng, 0, 5),
            b + r(rng, 5, 15),
            b + r(rng, 15, 25),
            b + r(rng, 30, 50),
            b + r(rng, 40, 60),
        ],
        left: [
            b,
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 5, 15),
            b + r(rng, 15, 30),
            b + r(rng, 35, 55),
            b + r(rng, 45, 65),
        ],
        gap_right: 0,
        gap_left: 0,
    }
}

fn conductive<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let gap = r(rng, 20, 40);
    let bone_base = r(rng, 0, 10);
    // 0 = right, 1 = left, 2 = both
    let side = rng.gen_range(0..3);

    let affected = |rng: &mut R| -> [Db; 7] {
        let base = bone_base + gap;
        [
            base + r(rng, -5, 5),
            base + r(rng, -5, 5),
            base + r(rng, -5, 5),
            base + r(rng, -5, 10),
            base + r(rng, -5, 10),
            base + r(rng, -5, 5),
            base + r(rng, -5, 10),
        ]
    };
    let normal = |rng: &mut R| -> [Db; 7] {
        [
            bone_base + r(rng, 0, 5),
            bone_base + r(rng, 0, 5),
            bone_base + r(rng, 0, 10),
            bone_base + r(rng, 0, 10),
            bone_base + r(rng, 0, 10),
            bone_base + r(rng, 0, 15),
            bone_base + r(rng, 0, 15),
        ]
    };

    let right_hit = side == 0 || side == 2;
    let left_hit = side == 1 || side == 2;
    let right = if right_hit { affected(rng) } else { normal(rng) };
    let left = if left_hit { affected(rng) } else { normal(rng) };

    Curves {
        right,
        left,
        gap_right: if right_hit { gap } else { 0 },
        gap_left: if left_hit { gap } else { 0 },
    }
}

fn mixed<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let bone_base = r(rng, 15, 35);
    let gap = r(rng, 15, 25);
    let b = bone_base + gap;
    Curves {
        right: [
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 0, 10),
            b + r(rng, 5, 15),
            b + r(rng, 10, 20),
            b + r(rng, 10, 25),
        ],
        left: [
            b + r(rng, -5, 5),
            b + r(rng, -5, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 5, 10),
            b + r(rng, 5, 15),
            b + r(rng, 10, 20),
        ],
        gap_right: gap,
        gap_left: gap,
    }
}

fn sudden_unilateral<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let b = r(rng, 0, 10);
    let loss = r(rng, 30, 70);
    let right_bad = rng.gen_bool(0.5);
    let normal = [
        b,
        b + r(rng, 0, 5),
        b + r(rng, 0, 5),
        b + r(rng, 0, 5),
        b + r(rng, 0, 10),
        b + r(rng, 0, 10),
        b + r(rng, 0, 15),
    ];
    let bad = [
        loss + r(rng, -10, 0),
        loss + r(rng, -10, 5),
        loss + r(rng, -5, 10),
        loss + r(rng, -5, 10),
        loss + r(rng, 0, 15),
        loss + r(rng, 5, 20),
        loss + r(rng, 5, 25),
    ];
    let (right, left) = if right_bad { (bad, normal) } else { (normal, bad) };
    Curves { right, left, gap_right: 0, gap_left: 0 }
}

fn noise_induced<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let b = r(rng, 5, 15);
    let notch = r(rng, 45, 70);
    Curves {
        right: [
            b,
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 5, 15),
            notch,
            notch - r(rng, 10, 20),
        ],
        left: [
            b,
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 5, 15),
            notch + r(rng, -5, 5),
            notch - r(rng, 10, 20),
        ],
        gap_right: 0,
        gap_left: 0,
    }
}

fn normal<R: Rng + ?Sized>(rng: &mut R) -> Curves {
    let b = r(rng, 0, 10);
    let ear = |rng: &mut R| -> [Db; 7] {
        [
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 5),
            b + r(rng, 0, 10),
            b + r(rng, 0, 10),
            b + r(rng, 0, 15),
        ]
    };
    let right = ear(rng);
    let left = ear(rng);
    Curves { right, left, gap_right: 0, gap_left: 0 }
}

/// Generate a case of the given category.
pub fn generate_case_of<R: Rng + ?Sized>(rng: &mut R, category: CaseCategory) -> GeneratedCase {
    let curves = match category {
        CaseCategory::Presbycusis => presbycusis(rng),
        CaseCategory::Conductive => conductive(rng),
        CaseCategory::Mixed => mixed(rng),
        CaseCategory::SuddenUnilateral => sudden_unilateral(rng),
        CaseCategory::NoiseInduced => noise_induced(rng),
        CaseCategory::Normal => normal(rng),
    };

    let mut case = PatientCase::new();
    for (ear, air, gap) in [
        (Ear::Right, &curves.right, curves.gap_right),
        (Ear::Left, &curves.left, curves.gap_left),
    ] {
        for (i, &freq) in Frequency::ALL.iter().enumerate() {
            let a = air[i];
            case.set(ear, Conduction::Air, freq, clamp_level(round5(a)));
            if freq.has_bone() {
                let bone = (a - gap - r(rng, 0, 5)).max(0);
                case.set(ear, Conduction::Bone, freq, clamp_level(round5(bone)));
            }
        }
    }

    let (lo, hi) = category.age_range();
    let age = rng.gen_range(lo..=hi);
    let group = pick(rng, category.groups());
    let profile = PatientProfile {
        name: pick(rng, group.names()).to_string(),
        category,
        age,
        group,
        history: pick(rng, category.histories()).to_string(),
    };

    tracing::debug!(category = category.name(), age = profile.age, "generated patient case");

    GeneratedCase { case, profile }
}

/// Generate a case from a uniformly chosen category.
pub fn generate_case<R: Rng + ?Sized>(rng: &mut R) -> GeneratedCase {
    let category = pick(rng, &CaseCategory::ALL);
    generate_case_of(rng, category)
}

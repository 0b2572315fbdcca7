use serde::{Deserialize, Serialize};

/// Hearing level in dB HL. Every value the model handles is an integer.
pub type Db = i32;

pub const MIN_LEVEL_DB: Db = -10;
pub const MAX_LEVEL_DB: Db = 120;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Right,
    Left,
}

impl Ear {
    pub const BOTH: [Ear; 2] = [Ear::Right, Ear::Left];

    #[inline]
    pub fn opposite(self) -> Ear {
        match self {
            Ear::Right => Ear::Left,
            Ear::Left => Ear::Right,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Ear::Right => "Right",
            Ear::Left => "Left",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conduction {
    Air,
    Bone,
}

impl Conduction {
    pub const BOTH: [Conduction; 2] = [Conduction::Air, Conduction::Bone];

    /// Frequencies at which this pathway is tested.
    pub fn frequencies(self) -> &'static [Frequency] {
        match self {
            Conduction::Air => &Frequency::ALL,
            Conduction::Bone => &Frequency::BONE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Conduction::Air => "Air",
            Conduction::Bone => "Bone",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskType {
    #[default]
    #[serde(rename = "NBN")]
    NarrowbandNoise,
    #[serde(rename = "WN")]
    WhiteNoise,
}

/// Audiometric test frequency. Ordered low to high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Frequency {
    Hz125,
    Hz250,
    Hz500,
    Hz1000,
    Hz2000,
    Hz4000,
    Hz8000,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Hz125,
        Frequency::Hz250,
        Frequency::Hz500,
        Frequency::Hz1000,
        Frequency::Hz2000,
        Frequency::Hz4000,
        Frequency::Hz8000,
    ];

    pub const BONE: [Frequency; 4] = [
        Frequency::Hz500,
        Frequency::Hz1000,
        Frequency::Hz2000,
        Frequency::Hz4000,
    ];

    pub fn hz(self) -> u32 {
        match self {
            Frequency::Hz125 => 125,
            Frequency::Hz250 => 250,
            Frequency::Hz500 => 500,
            Frequency::Hz1000 => 1000,
            Frequency::Hz2000 => 2000,
            Frequency::Hz4000 => 4000,
            Frequency::Hz8000 => 8000,
        }
    }

    pub fn from_hz(hz: u32) -> Option<Frequency> {
        Self::ALL.iter().copied().find(|f| f.hz() == hz)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Move `steps` entries along the table, clamped to its ends.
    pub fn step(self, steps: i32) -> Frequency {
        let max = (Self::ALL.len() - 1) as i64;
        let idx = (self.index() as i64 + steps as i64).clamp(0, max);
        Self::ALL[idx as usize]
    }

    pub fn has_bone(self) -> bool {
        Self::BONE.contains(&self)
    }
}

impl From<Frequency> for u32 {
    fn from(f: Frequency) -> u32 {
        f.hz()
    }
}

impl TryFrom<u32> for Frequency {
    type Error = String;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Frequency::from_hz(hz).ok_or_else(|| format!("unsupported test frequency: {hz} Hz"))
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

/// One audiogram position: which ear, which pathway, which frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointKey {
    pub ear: Ear,
    pub conduction: Conduction,
    pub frequency: Frequency,
}

impl PointKey {
    pub fn new(ear: Ear, conduction: Conduction, frequency: Frequency) -> Self {
        Self { ear, conduction, frequency }
    }

    /// Every position a complete audiogram covers: air at all seven
    /// frequencies and bone at the four bone frequencies, both ears.
    pub fn all() -> impl Iterator<Item = PointKey> {
        Ear::BOTH.into_iter().flat_map(|ear| {
            Conduction::BOTH.into_iter().flat_map(move |conduction| {
                conduction
                    .frequencies()
                    .iter()
                    .map(move |&frequency| PointKey::new(ear, conduction, frequency))
            })
        })
    }
}

impl std::fmt::Display for PointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.ear.label(), self.frequency, self.conduction.label())
    }
}

#[inline]
pub fn clamp_level(db: Db) -> Db {
    db.clamp(MIN_LEVEL_DB, MAX_LEVEL_DB)
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{clamp_level, Conduction, Db, Ear, Frequency, MaskType, PointKey};

/// One tone presentation made while masking was switched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub frequency: Frequency,
    pub test_ear: Ear,
    pub conduction: Conduction,
    pub signal_level: Db,
    pub mask_level: Db,
    pub mask_ear: Ear,
    pub mask_type: MaskType,
    pub heard: bool,
    pub is_overmasking: bool,
}

impl TrialRecord {
    /// Audiogram position this trial belongs to.
    pub fn key(&self) -> PointKey {
        PointKey::new(self.test_ear, self.conduction, self.frequency)
    }

    /// Noise went to the ear under test.
    #[inline]
    pub fn wrong_ear(&self) -> bool {
        self.mask_ear == self.test_ear
    }
}

/// Append-only trial log for one case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialLog {
    entries: Vec<TrialRecord>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trial: TrialRecord) {
        self.entries.push(trial);
    }

    pub fn entries(&self) -> &[TrialRecord] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TrialRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `n` trials, oldest first.
    pub fn recent(&self, n: usize) -> &[TrialRecord] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn for_point(&self, key: PointKey) -> impl Iterator<Item = &TrialRecord> + '_ {
        self.entries.iter().filter(move |t| t.key() == key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<TrialRecord> for TrialLog {
    fn from_iter<I: IntoIterator<Item = TrialRecord>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Serialized form of one marked threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedPoint {
    pub ear: Ear,
    pub conduction: Conduction,
    pub frequency: Frequency,
    pub level: Db,
}

/// Thresholds the operator has marked on the audiogram.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MarkedPoint>", into = "Vec<MarkedPoint>")]
pub struct MarkedPoints {
    points: BTreeMap<PointKey, Db>,
}

impl MarkedPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `db` at `key`, returning the value it replaced. Levels are
    /// clamped to the audiometer range.
    pub fn mark(&mut self, key: PointKey, db: Db) -> Option<Db> {
        self.points.insert(key, clamp_level(db))
    }

    pub fn remove(&mut self, key: PointKey) -> Option<Db> {
        self.points.remove(&key)
    }

    pub fn get(&self, key: PointKey) -> Option<Db> {
        self.points.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointKey, Db)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl FromIterator<(PointKey, Db)> for MarkedPoints {
    fn from_iter<I: IntoIterator<Item = (PointKey, Db)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(|(k, db)| (k, clamp_level(db))).collect(),
        }
    }
}

impl From<Vec<MarkedPoint>> for MarkedPoints {
    fn from(v: Vec<MarkedPoint>) -> Self {
        v.into_iter()
            .map(|p| (PointKey::new(p.ear, p.conduction, p.frequency), p.level))
            .collect()
    }
}

impl From<MarkedPoints> for Vec<MarkedPoint> {
    fn from(m: MarkedPoints) -> Self {
        m.iter()
            .map(|(key, level)| MarkedPoint {
                ear: key.ear,
                conduction: key.conduction,
                frequency: key.frequency,
                level,
            })
            .collect()
    }
}

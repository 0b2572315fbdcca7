//! Sharded session supervisor.
//!
//! Holds many independent audiometry sessions keyed by `session_id`:
//! - one `Session` per id, never shared between ids
//! - sharded by a stable hash of the id
//! - every call locks exactly one shard and runs to completion
//!
//! No IO. No threads are spawned here.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use odyo_core::{OdyoCfg, PatientCase, SessionScore};
use rand::Rng;

use crate::adapter::{ActionOutcome, OperatorAction};
use crate::session::Session;

/// Snapshot of supervisor state for storage-agnostic persistence.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SupervisorSnapshot {
    pub sessions: Vec<(String, Session)>,
}

/// Counters returned by restore/import operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RestoreStats {
    pub applied: usize,
    pub overwritten: usize,
    /// Entries skipped because their case failed validation.
    pub rejected: usize,
}

#[derive(Default, Debug)]
struct Shard {
    sessions: HashMap<String, Session>,
}

/// Deterministic FNV-1a hash (stable across runs).
fn fnv1a_u64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn shard_index(session_id: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    (fnv1a_u64(session_id) as usize) % shard_count
}

#[derive(Debug)]
pub struct SessionSupervisor {
    cfg: OdyoCfg,
    shards: usize,
    state_shards: Vec<Mutex<Shard>>,
}

impl SessionSupervisor {
    /// Create a supervisor with `shards` lock partitions (at least 1).
    pub fn new(shards: usize, cfg: OdyoCfg) -> Self {
        let shards = shards.max(1);
        let state_shards = (0..shards).map(|_| Mutex::new(Shard::default())).collect();
        Self { cfg, shards, state_shards }
    }

    pub fn cfg(&self) -> &OdyoCfg {
        &self.cfg
    }

    fn shard(&self, session_id: &str) -> MutexGuard<'_, Shard> {
        let idx = shard_index(session_id, self.shards);
        // A poisoned shard still holds consistent sessions: handlers never
        // leave a session half-updated across a panic point.
        self.state_shards[idx]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open (or replace) a session on a hand-authored case. The case is
    /// validated first; `Ok(true)` means an existing session was replaced.
    pub fn open(&self, session_id: impl Into<String>, case: PatientCase) -> odyo_core::Result<bool> {
        case.validate()?;
        Ok(self.insert(session_id.into(), Session::new(case)))
    }

    /// Open (or replace) a session on a generated case.
    pub fn open_generated<R: Rng + ?Sized>(&self, session_id: impl Into<String>, rng: &mut R) -> bool {
        self.insert(session_id.into(), Session::generated(rng))
    }

    /// Returns true when an existing session was replaced.
    fn insert(&self, session_id: String, session: Session) -> bool {
        tracing::info!(session_id = %session_id, "session opened");
        self.shard(&session_id).sessions.insert(session_id, session).is_some()
    }

    pub fn close(&self, session_id: &str) -> Option<Session> {
        let s = self.shard(session_id).sessions.remove(session_id);
        if s.is_some() {
            tracing::info!(session_id, "session closed");
        }
        s
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.shard(session_id).sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.state_shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|p| p.into_inner()).sessions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against one session. `None` when the id is unknown.
    pub fn with_session<T>(&self, session_id: &str, f: impl FnOnce(&mut Session, &OdyoCfg) -> T) -> Option<T> {
        let mut guard = self.shard(session_id);
        guard.sessions.get_mut(session_id).map(|s| f(s, &self.cfg))
    }

    pub fn dispatch(&self, session_id: &str, action: OperatorAction) -> Option<ActionOutcome> {
        self.with_session(session_id, |s, cfg| s.apply(action, cfg))
    }

    /// Score a session. Outer `None`: unknown id; inner error: incomplete.
    pub fn finish(&self, session_id: &str) -> Option<odyo_core::Result<SessionScore>> {
        self.with_session(session_id, |s, cfg| s.finish(cfg))
    }

    /// Start a fresh generated case in an existing session.
    pub fn new_case<R: Rng + ?Sized>(&self, session_id: &str, rng: &mut R) -> bool {
        self.with_session(session_id, |s, _| s.new_generated_case(rng)).is_some()
    }

    /// Export every session. Sorted by id.
    pub fn snapshot(&self) -> SupervisorSnapshot {
        self.snapshot_filtered(|_, _| true)
    }

    /// Export sessions accepted by `predicate`. Sorted by id.
    pub fn snapshot_filtered<F>(&self, mut predicate: F) -> SupervisorSnapshot
    where
        F: FnMut(&str, &Session) -> bool,
    {
        let mut out: Vec<(String, Session)> = Vec::new();
        for shard in &self.state_shards {
            let guard = shard.lock().unwrap_or_else(|p| p.into_inner());
            for (k, v) in guard.sessions.iter() {
                if predicate(k.as_str(), v) {
                    out.push((k.clone(), v.clone()));
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        SupervisorSnapshot { sessions: out }
    }

    pub fn snapshot_sessions(&self, session_ids: &[&str]) -> SupervisorSnapshot {
        let want: HashSet<&str> = session_ids.iter().copied().collect();
        self.snapshot_filtered(|id, _| want.contains(id))
    }

    /// Replace all sessions with the snapshot's.
    pub fn restore(&self, snap: SupervisorSnapshot) -> RestoreStats {
        for shard in &self.state_shards {
            shard.lock().unwrap_or_else(|p| p.into_inner()).sessions.clear();
        }
        self.import(snap.sessions)
    }

    /// Merge the snapshot into current state; snapshot entries win.
    ///
    /// Both restore paths skip sessions whose case fails validation.
    pub fn restore_merge(&self, snap: SupervisorSnapshot) -> RestoreStats {
        self.import(snap.sessions)
    }

    fn import<I>(&self, iter: I) -> RestoreStats
    where
        I: IntoIterator<Item = (String, Session)>,
    {
        let mut stats = RestoreStats::default();
        for (id, session) in iter {
            if let Err(e) = session.case.validate() {
                tracing::warn!(session_id = %id, error = %e, "snapshot entry rejected");
                stats.rejected += 1;
                continue;
            }
            if self.shard(&id).sessions.insert(id, session).is_some() {
                stats.overwritten += 1;
            }
            stats.applied += 1;
        }
        tracing::debug!(
            applied = stats.applied,
            overwritten = stats.overwritten,
            rejected = stats.rejected,
            "sessions restored"
        );
        stats
    }
}

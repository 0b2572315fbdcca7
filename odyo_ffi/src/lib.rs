#![allow(clippy::missing_safety_doc)]

use std::ptr;

use odyo_core::{Conduction, Ear, Error, Frequency, MaskType, OdyoCfg, PatientCase, Verdict};
use odyo_supervisor::{ActionOutcome, OperatorAction, SessionSupervisor, SupervisorSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// FFI ABI version for odyo_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const ODYO_FFI_VERSION: u32 = 2;

#[no_mangle]
pub extern "C" fn odyo_ffi_version() -> u32 {
    ODYO_FFI_VERSION
}

// Snapshot wire format identification.
const SNAP_MAGIC: u32 = 0x3159_444f; // "ODY1" little-endian
const SNAP_VERSION: u32 = 1;
const SNAP_HEADER_LEN: usize = 8;

pub const ODYO_RC_OK: i32 = 0;
pub const ODYO_RC_BAD_ARGS: i32 = -1;
pub const ODYO_RC_UNKNOWN_SESSION: i32 = -2;
pub const ODYO_RC_BAD_CASE: i32 = -3;
pub const ODYO_RC_BAD_ACTION: i32 = -4;
pub const ODYO_RC_BAD_MAGIC: i32 = -8;
pub const ODYO_RC_BAD_VERSION: i32 = -9;
/// Scoring refused: not every required point is marked.
pub const ODYO_RC_INCOMPLETE: i32 = -10;
pub const ODYO_RC_BAD_PAYLOAD: i32 = -11;
pub const ODYO_RC_BAD_CFG: i32 = -12;

/// Bone row entry meaning "no bone threshold": lookups fall back to air and
/// the point is not required at scoring.
pub const ODYO_BONE_UNDEFINED: i32 = i32::MIN;

// Operator action codes for `odyo_session_action`.
pub const ODYO_ACT_STEP_FREQUENCY: u32 = 0;
pub const ODYO_ACT_STEP_LEVEL: u32 = 1;
/// arg: 0 right, 1 left
pub const ODYO_ACT_SET_EAR: u32 = 2;
/// arg: 0 air, 1 bone
pub const ODYO_ACT_SET_CONDUCTION: u32 = 3;
pub const ODYO_ACT_SET_MASKING: u32 = 4;
pub const ODYO_ACT_STEP_MASK_LEVEL: u32 = 5;
/// arg: 0 right, 1 left
pub const ODYO_ACT_SET_MASK_EAR: u32 = 6;
/// arg: 0 narrowband, 1 white
pub const ODYO_ACT_SET_MASK_TYPE: u32 = 7;
pub const ODYO_ACT_PRESENT_TONE: u32 = 8;
pub const ODYO_ACT_MARK_THRESHOLD: u32 = 9;
pub const ODYO_ACT_DELETE_POINT: u32 = 10;
pub const ODYO_ACT_USE_HINT: u32 = 11;

/// Opaque handle exposed over FFI.
#[repr(C)]
pub struct OdyoSupervisor {
    inner: SessionSupervisor,
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OdyoStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl OdyoStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Owned byte buffer (snapshots, hint text).
#[repr(C)]
pub struct OdyoBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

impl OdyoBytes {
    fn empty() -> Self {
        OdyoBytes { ptr: ptr::null_mut(), len: 0 }
    }

    fn from_vec(buf: Vec<u8>) -> Self {
        let mut boxed = buf.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);
        OdyoBytes { ptr, len }
    }
}

/// Result of one operator action.
///
/// `heard`, `overmasking`, `logged` and the plateau fields are only set for
/// `ODYO_ACT_PRESENT_TONE`. `has_prev`/`prev_level` report the level replaced
/// by a mark or removed by a delete.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OdyoActionResult {
    pub rc: i32,
    pub heard: u8,
    pub overmasking: u8,
    pub logged: u8,
    pub plateau_found: u8,
    pub plateau_db: i32,
    pub has_prev: u8,
    pub prev_level: i32,
    /// 1 when `ODYO_ACT_USE_HINT` produced text (first use only).
    pub hint_given: u8,
    /// Settings after the action.
    pub level: i32,
    pub mask_level: i32,
    pub frequency_hz: u32,
}

/// Verdict as a C-friendly enum.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OdyoVerdict {
    Excellent = 0,
    Fair = 1,
    NeedsPractice = 2,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OdyoScoreResult {
    pub rc: i32,
    pub score: i32,
    pub total_error: i32,
    pub masking_score: i32,
    pub hint_used: u8,
    pub verdict: OdyoVerdict,
    /// Unmarked required points when `rc == ODYO_RC_INCOMPLETE`.
    pub missing: u32,
}

impl OdyoScoreResult {
    fn err(rc: i32) -> Self {
        OdyoScoreResult {
            rc,
            score: 0,
            total_error: 0,
            masking_score: 0,
            hint_used: 0,
            verdict: OdyoVerdict::NeedsPractice,
            missing: 0,
        }
    }
}

/// Restore result statistics (FFI-safe).
#[repr(C)]
pub struct OdyoRestoreStats {
    pub applied: u32,
    pub overwritten: u32,
    /// Snapshot entries skipped because their case failed validation.
    pub rejected: u32,
    pub rc: i32,
}

impl OdyoRestoreStats {
    fn err(rc: i32) -> Self {
        OdyoRestoreStats { applied: 0, overwritten: 0, rejected: 0, rc }
    }
}

/// Model constants for FFI.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OdyoCfgC {
    pub ia_air_db: i32,
    pub ia_bone_db: i32,
    pub overmask_margin_db: i32,
    pub white_noise_leak_pct: i32,
    pub plateau_window: u32,
    pub plateau_min_span_db: i32,
    pub status_window: u32,
    pub tolerance_db: i32,
    pub hint_penalty: i32,
    pub mask_penalty_per_item: i32,
    pub missing_mask_cap: i32,
    pub wrong_ear_cap: i32,
    pub overmask_cap: i32,
    pub max_mask_db: i32,
}

fn cfg_to_ffi(d: &OdyoCfg) -> OdyoCfgC {
    OdyoCfgC {
        ia_air_db: d.ia_air_db,
        ia_bone_db: d.ia_bone_db,
        overmask_margin_db: d.overmask_margin_db,
        white_noise_leak_pct: d.white_noise_leak_pct,
        plateau_window: d.plateau_window as u32,
        plateau_min_span_db: d.plateau_min_span_db,
        status_window: d.status_window as u32,
        tolerance_db: d.tolerance_db,
        hint_penalty: d.hint_penalty,
        mask_penalty_per_item: d.mask_penalty_per_item,
        missing_mask_cap: d.missing_mask_cap,
        wrong_ear_cap: d.wrong_ear_cap,
        overmask_cap: d.overmask_cap,
        max_mask_db: d.max_mask_db,
    }
}

fn cfg_from_ffi(c: OdyoCfgC) -> OdyoCfg {
    OdyoCfg {
        ia_air_db: c.ia_air_db,
        ia_bone_db: c.ia_bone_db,
        overmask_margin_db: c.overmask_margin_db,
        white_noise_leak_pct: c.white_noise_leak_pct,
        plateau_window: c.plateau_window as usize,
        plateau_min_span_db: c.plateau_min_span_db,
        status_window: c.status_window as usize,
        tolerance_db: c.tolerance_db,
        hint_penalty: c.hint_penalty,
        mask_penalty_per_item: c.mask_penalty_per_item,
        missing_mask_cap: c.missing_mask_cap,
        wrong_ear_cap: c.wrong_ear_cap,
        overmask_cap: c.overmask_cap,
        max_mask_db: c.max_mask_db,
    }
}

#[no_mangle]
pub extern "C" fn odyo_cfg_default() -> OdyoCfgC {
    cfg_to_ffi(&OdyoCfg::default())
}

/// Load a TOML config file into `out`. Keys missing from the file keep
/// their defaults.
#[no_mangle]
pub unsafe extern "C" fn odyo_cfg_load(path: OdyoStr, out: *mut OdyoCfgC) -> i32 {
    let Some(path) = path.as_str() else { return ODYO_RC_BAD_ARGS };
    if out.is_null() {
        return ODYO_RC_BAD_ARGS;
    }
    match OdyoCfg::load(path) {
        Ok(cfg) => {
            *out = cfg_to_ffi(&cfg);
            ODYO_RC_OK
        }
        Err(e) => {
            tracing::warn!(error = %e, path, "config load failed");
            ODYO_RC_BAD_CFG
        }
    }
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns 0 when installed, 1 when a global subscriber already exists.
#[no_mangle]
pub extern "C" fn odyo_ffi_init_logging() -> i32 {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Create a new supervisor handle. Returns null when `cfg` fails validation.
///
/// Notes:
/// - `shards` controls internal state sharding (session_id -> shard).
/// - This library does not spawn threads. Concurrent calls on one handle
///   serialize per-shard via internal mutexes.
#[no_mangle]
pub extern "C" fn odyo_supervisor_new(shards: usize, cfg: OdyoCfgC) -> *mut OdyoSupervisor {
    let cfg = cfg_from_ffi(cfg);
    if let Err(e) = cfg.validate() {
        tracing::warn!(error = %e, "rejected supervisor cfg");
        return ptr::null_mut();
    }
    let handle = OdyoSupervisor {
        inner: SessionSupervisor::new(shards.max(1), cfg),
    };
    Box::into_raw(Box::new(handle))
}

#[no_mangle]
pub unsafe extern "C" fn odyo_supervisor_free(h: *mut OdyoSupervisor) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

unsafe fn handle_and_id<'a>(h: *mut OdyoSupervisor, id: &'a OdyoStr) -> Option<(&'a OdyoSupervisor, &'a str)> {
    if h.is_null() {
        return None;
    }
    Some((&*h, id.as_str()?))
}

/// Open (or replace) a session on a case generated from `seed`.
///
/// Returns 0 for a new session, 1 when an existing one was replaced.
#[no_mangle]
pub unsafe extern "C" fn odyo_session_open_generated(h: *mut OdyoSupervisor, id: OdyoStr, seed: u64) -> i32 {
    let Some((handle, id)) = handle_and_id(h, &id) else { return ODYO_RC_BAD_ARGS };
    let mut rng = StdRng::seed_from_u64(seed);
    handle.inner.open_generated(id, &mut rng) as i32
}

/// Open (or replace) a session on an explicit case.
///
/// Air rows hold 7 values (125..8000 Hz); bone rows hold 4 (500..4000 Hz).
/// A bone entry of `ODYO_BONE_UNDEFINED` leaves that threshold unset.
#[no_mangle]
pub unsafe extern "C" fn odyo_session_open_case(
    h: *mut OdyoSupervisor,
    id: OdyoStr,
    right_air: *const i32,
    left_air: *const i32,
    right_bone: *const i32,
    left_bone: *const i32,
) -> i32 {
    let Some((handle, id)) = handle_and_id(h, &id) else { return ODYO_RC_BAD_ARGS };
    if right_air.is_null() || left_air.is_null() || right_bone.is_null() || left_bone.is_null() {
        return ODYO_RC_BAD_ARGS;
    }
    let row7 = |p: *const i32| -> [i32; 7] { *(p as *const [i32; 7]) };
    let row4 = |p: *const i32| -> [i32; 4] { *(p as *const [i32; 4]) };

    let (right_bone, left_bone) = (row4(right_bone), row4(left_bone));
    let mut case = PatientCase::from_rows(row7(right_air), row7(left_air), right_bone, left_bone);
    for (ear, row) in [(Ear::Right, right_bone), (Ear::Left, left_bone)] {
        for (freq, db) in Frequency::BONE.into_iter().zip(row) {
            if db == ODYO_BONE_UNDEFINED {
                case.remove(ear, Conduction::Bone, freq);
            }
        }
    }

    match handle.inner.open(id, case) {
        Ok(replaced) => replaced as i32,
        Err(e) => {
            tracing::warn!(error = %e, session_id = id, "rejected case");
            ODYO_RC_BAD_CASE
        }
    }
}

/// Reset a session onto a new case generated from `seed`.
#[no_mangle]
pub unsafe extern "C" fn odyo_session_new_case(h: *mut OdyoSupervisor, id: OdyoStr, seed: u64) -> i32 {
    let Some((handle, id)) = handle_and_id(h, &id) else { return ODYO_RC_BAD_ARGS };
    let mut rng = StdRng::seed_from_u64(seed);
    if handle.inner.new_case(id, &mut rng) {
        ODYO_RC_OK
    } else {
        ODYO_RC_UNKNOWN_SESSION
    }
}

#[no_mangle]
pub unsafe extern "C" fn odyo_session_close(h: *mut OdyoSupervisor, id: OdyoStr) -> i32 {
    let Some((handle, id)) = handle_and_id(h, &id) else { return ODYO_RC_BAD_ARGS };
    match handle.inner.close(id) {
        Some(_) => ODYO_RC_OK,
        None => ODYO_RC_UNKNOWN_SESSION,
    }
}

fn ear_from_arg(arg: i32) -> Option<Ear> {
    match arg {
        0 => Some(Ear::Right),
        1 => Some(Ear::Left),
        _ => None,
    }
}

fn action_from_code(code: u32, arg: i32) -> Option<OperatorAction> {
    let action = match code {
        ODYO_ACT_STEP_FREQUENCY => OperatorAction::StepFrequency(arg),
        ODYO_ACT_STEP_LEVEL => OperatorAction::StepLevel(arg),
        ODYO_ACT_SET_EAR => OperatorAction::SetEar(ear_from_arg(arg)?),
        ODYO_ACT_SET_CONDUCTION => OperatorAction::SetConduction(match arg {
            0 => Conduction::Air,
            1 => Conduction::Bone,
            _ => return None,
        }),
        ODYO_ACT_SET_MASKING => OperatorAction::SetMasking(arg != 0),
        ODYO_ACT_STEP_MASK_LEVEL => OperatorAction::StepMaskLevel(arg),
        ODYO_ACT_SET_MASK_EAR => OperatorAction::SetMaskEar(ear_from_arg(arg)?),
        ODYO_ACT_SET_MASK_TYPE => OperatorAction::SetMaskType(match arg {
            0 => MaskType::NarrowbandNoise,
            1 => MaskType::WhiteNoise,
            _ => return None,
        }),
        ODYO_ACT_PRESENT_TONE => OperatorAction::PresentTone,
        ODYO_ACT_MARK_THRESHOLD => OperatorAction::MarkThreshold,
        ODYO_ACT_DELETE_POINT => OperatorAction::DeletePoint,
        ODYO_ACT_USE_HINT => OperatorAction::UseHint,
        _ => return None,
    };
    Some(action)
}

/// Apply one operator action (`ODYO_ACT_*`) to a session.
#[no_mangle]
pub unsafe extern "C" fn odyo_session_action(h: *mut OdyoSupervisor, id: OdyoStr, code: u32, arg: i32) -> OdyoActionResult {
    let Some((handle, id)) = handle_and_id(h, &id) else {
        return OdyoActionResult { rc: ODYO_RC_BAD_ARGS, ..Default::default() };
    };
    let Some(action) = action_from_code(code, arg) else {
        return OdyoActionResult { rc: ODYO_RC_BAD_ACTION, ..Default::default() };
    };

    let res = handle.inner.with_session(id, |s, cfg| {
        let outcome = s.apply(action, cfg);
        let mut out = OdyoActionResult {
            rc: ODYO_RC_OK,
            level: s.state.level,
            mask_level: s.state.mask_level,
            frequency_hz: s.state.frequency.hz(),
            ..Default::default()
        };
        match outcome {
            ActionOutcome::State(_) => {}
            ActionOutcome::Tone(t) => {
                out.heard = t.heard() as u8;
                out.overmasking = t.overmasking() as u8;
                out.logged = t.logged as u8;
                if let Some(p) = t.plateau {
                    out.plateau_found = 1;
                    out.plateau_db = p.threshold_db;
                }
            }
            ActionOutcome::Marked { replaced: prev } | ActionOutcome::Deleted { removed: prev } => {
                if let Some(level) = prev {
                    out.has_prev = 1;
                    out.prev_level = level;
                }
            }
            ActionOutcome::Hint(text) => out.hint_given = text.is_some() as u8,
        }
        out
    });

    res.unwrap_or(OdyoActionResult { rc: ODYO_RC_UNKNOWN_SESSION, ..Default::default() })
}

/// Take the session's hint. Returns the UTF-8 text on first use and an empty
/// buffer afterwards. Free with `odyo_bytes_free`.
#[no_mangle]
pub unsafe extern "C" fn odyo_session_hint(h: *mut OdyoSupervisor, id: OdyoStr) -> OdyoBytes {
    let Some((handle, id)) = handle_and_id(h, &id) else { return OdyoBytes::empty() };
    match handle.inner.with_session(id, |s, _| s.use_hint()).flatten() {
        Some(text) => OdyoBytes::from_vec(text.as_bytes().to_vec()),
        None => OdyoBytes::empty(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn odyo_session_finish(h: *mut OdyoSupervisor, id: OdyoStr) -> OdyoScoreResult {
    let Some((handle, id)) = handle_and_id(h, &id) else { return OdyoScoreResult::err(ODYO_RC_BAD_ARGS) };
    match handle.inner.finish(id) {
        None => OdyoScoreResult::err(ODYO_RC_UNKNOWN_SESSION),
        Some(Err(Error::Incomplete { missing })) => OdyoScoreResult {
            missing: missing.len() as u32,
            ..OdyoScoreResult::err(ODYO_RC_INCOMPLETE)
        },
        Some(Err(e)) => {
            tracing::error!(error = %e, session_id = id, "scoring failed");
            OdyoScoreResult::err(ODYO_RC_BAD_CASE)
        }
        Some(Ok(s)) => OdyoScoreResult {
            rc: ODYO_RC_OK,
            score: s.score,
            total_error: s.total_error,
            masking_score: s.masking.score,
            hint_used: s.hint_used as u8,
            verdict: match s.verdict {
                Verdict::Excellent => OdyoVerdict::Excellent,
                Verdict::Fair => OdyoVerdict::Fair,
                Verdict::NeedsPractice => OdyoVerdict::NeedsPractice,
            },
            missing: 0,
        },
    }
}

/// Snapshot format:
/// [u32 magic = "ODY1"][u32 version = 1][JSON-encoded SupervisorSnapshot]
#[no_mangle]
pub unsafe extern "C" fn odyo_snapshot(h: *mut OdyoSupervisor) -> OdyoBytes {
    if h.is_null() {
        return OdyoBytes::empty();
    }
    let handle = &*h;
    let snap = handle.inner.snapshot();

    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(&SNAP_MAGIC.to_le_bytes());
    buf.extend_from_slice(&SNAP_VERSION.to_le_bytes());
    if let Err(e) = serde_json::to_writer(&mut buf, &snap) {
        tracing::error!(error = %e, "snapshot encoding failed");
        return OdyoBytes::empty();
    }

    OdyoBytes::from_vec(buf)
}

#[no_mangle]
pub unsafe extern "C" fn odyo_bytes_free(b: OdyoBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}

fn decode_snapshot(data: &[u8]) -> Result<SupervisorSnapshot, i32> {
    if data.len() < SNAP_HEADER_LEN {
        return Err(ODYO_RC_BAD_ARGS);
    }
    let read_u32 = |at: usize| -> Option<u32> { Some(u32::from_le_bytes(data[at..at + 4].try_into().ok()?)) };

    if read_u32(0) != Some(SNAP_MAGIC) {
        return Err(ODYO_RC_BAD_MAGIC);
    }
    if read_u32(4) != Some(SNAP_VERSION) {
        return Err(ODYO_RC_BAD_VERSION);
    }
    serde_json::from_slice(&data[SNAP_HEADER_LEN..]).map_err(|e| {
        tracing::warn!(error = %e, "snapshot payload rejected");
        ODYO_RC_BAD_PAYLOAD
    })
}

#[no_mangle]
pub unsafe extern "C" fn odyo_restore_stats(h: *mut OdyoSupervisor, bytes: *const u8, len: usize, merge: u8) -> OdyoRestoreStats {
    if h.is_null() || bytes.is_null() {
        return OdyoRestoreStats::err(ODYO_RC_BAD_ARGS);
    }
    let handle = &*h;
    let data = std::slice::from_raw_parts(bytes, len);

    let snap = match decode_snapshot(data) {
        Ok(s) => s,
        Err(rc) => return OdyoRestoreStats::err(rc),
    };
    let stats = if merge != 0 {
        handle.inner.restore_merge(snap)
    } else {
        handle.inner.restore(snap)
    };

    OdyoRestoreStats {
        applied: stats.applied as u32,
        overwritten: stats.overwritten as u32,
        rejected: stats.rejected as u32,
        rc: ODYO_RC_OK,
    }
}

#[no_mangle]
pub unsafe extern "C" fn odyo_restore(h: *mut OdyoSupervisor, bytes: *const u8, len: usize, merge: u8) -> i32 {
    odyo_restore_stats(h, bytes, len, merge).rc
}

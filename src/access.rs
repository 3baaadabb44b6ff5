//! Trial and paid entitlement for launching campaigns

use crate::error::{OutreachError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Access state for one user, keyed by their email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRecord {
    pub user_id: String,
    pub paid: bool,
    pub trial_expires_at: Option<DateTime<Utc>>,
}

impl AccessRecord {
    #[must_use]
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: normalize_user(user_id),
            paid: false,
            trial_expires_at: None,
        }
    }

    /// Paid, or inside an unexpired trial
    #[must_use]
    pub fn is_entitled_at(&self, now: DateTime<Utc>) -> bool {
        self.paid || self.trial_expires_at.is_some_and(|expires| now < expires)
    }

    #[must_use]
    pub const fn trial_used(&self) -> bool {
        self.trial_expires_at.is_some()
    }
}

/// Result of a trial request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrialGrant {
    Granted { expires_at: DateTime<Utc> },
    AlreadyUsed,
}

/// Access-control collaborator consulted before any send loop
pub trait EntitlementStore: Send + Sync {
    fn is_entitled(&self, user_id: &str) -> bool;

    /// Start a one-time trial. Paid users and users who already had a trial
    /// get [`TrialGrant::AlreadyUsed`].
    fn grant_trial(&self, user_id: &str, duration: Duration) -> Result<TrialGrant>;

    /// Record a confirmed payment
    fn mark_paid(&self, user_id: &str) -> Result<()>;
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn normalize_user(user_id: &str) -> String {
    user_id.trim().to_lowercase()
}

fn grant_in(
    records: &mut HashMap<String, AccessRecord>,
    user_id: &str,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<TrialGrant> {
    let record = records
        .entry(normalize_user(user_id))
        .or_insert_with(|| AccessRecord::new(user_id));

    if record.paid || record.trial_used() {
        return Ok(TrialGrant::AlreadyUsed);
    }

    let expires_at = now.checked_add_signed(duration).ok_or_else(|| {
        OutreachError::Store(format!("trial of {duration} from {now} is out of range"))
    })?;
    record.trial_expires_at = Some(expires_at);
    info!("Granted trial to {} until {expires_at}", record.user_id);
    Ok(TrialGrant::Granted { expires_at })
}

fn mark_paid_in(records: &mut HashMap<String, AccessRecord>, user_id: &str) {
    let record = records
        .entry(normalize_user(user_id))
        .or_insert_with(|| AccessRecord::new(user_id));
    record.paid = true;
    info!("Marked {} as paid", record.user_id);
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> OutreachError {
    OutreachError::Store("access lock poisoned".into())
}

/// In-process store, mostly for tests and single-instance deployments
pub struct MemoryEntitlements {
    records: Mutex<HashMap<String, AccessRecord>>,
    clock: Clock,
}

impl MemoryEntitlements {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock: Box::new(clock),
        }
    }

    #[must_use]
    pub fn record(&self, user_id: &str) -> Option<AccessRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(&normalize_user(user_id)).cloned())
    }
}

impl Default for MemoryEntitlements {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryEntitlements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEntitlements").finish_non_exhaustive()
    }
}

impl EntitlementStore for MemoryEntitlements {
    fn is_entitled(&self, user_id: &str) -> bool {
        let now = (self.clock)();
        match self.records.lock() {
            Ok(records) => records
                .get(&normalize_user(user_id))
                .is_some_and(|r| r.is_entitled_at(now)),
            Err(_) => {
                warn!("Access lock poisoned, denying {user_id}");
                false
            }
        }
    }

    fn grant_trial(&self, user_id: &str, duration: Duration) -> Result<TrialGrant> {
        let now = (self.clock)();
        let mut records = self.records.lock().map_err(poisoned)?;
        grant_in(&mut records, user_id, duration, now)
    }

    fn mark_paid(&self, user_id: &str) -> Result<()> {
        let mut records = self.records.lock().map_err(poisoned)?;
        mark_paid_in(&mut records, user_id);
        Ok(())
    }
}

/// Single JSON file holding every record, read and rewritten per operation
pub struct JsonFileEntitlements {
    path: PathBuf,
    guard: Mutex<()>,
    clock: Clock,
}

impl JsonFileEntitlements {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Utc::now)
    }

    pub fn with_clock(
        path: impl Into<PathBuf>,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
            clock: Box::new(clock),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, AccessRecord>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let records: Vec<AccessRecord> = serde_json::from_str(&raw)?;
        Ok(records
            .into_iter()
            .map(|mut r| {
                r.user_id = normalize_user(&r.user_id);
                (r.user_id.clone(), r)
            })
            .collect())
    }

    fn save(&self, records: &HashMap<String, AccessRecord>) -> Result<()> {
        let mut list: Vec<&AccessRecord> = records.values().collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        std::fs::write(&self.path, serde_json::to_string_pretty(&list)?)?;
        Ok(())
    }

    /// Apply a change to the stored records under the file lock; nothing is
    /// written when the change fails
    fn update<T>(
        &self,
        change: impl FnOnce(&mut HashMap<String, AccessRecord>) -> Result<T>,
    ) -> Result<T> {
        let _held = self.guard.lock().map_err(poisoned)?;
        let mut records = self.load()?;
        let out = change(&mut records)?;
        self.save(&records)?;
        Ok(out)
    }
}

impl std::fmt::Debug for JsonFileEntitlements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileEntitlements")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EntitlementStore for JsonFileEntitlements {
    fn is_entitled(&self, user_id: &str) -> bool {
        let now = (self.clock)();
        let Ok(_held) = self.guard.lock() else {
            warn!("Access lock poisoned, denying {user_id}");
            return false;
        };
        match self.load() {
            Ok(records) => records
                .get(&normalize_user(user_id))
                .is_some_and(|r| r.is_entitled_at(now)),
            Err(e) => {
                warn!("Could not read access store {}: {e}", self.path.display());
                false
            }
        }
    }

    fn grant_trial(&self, user_id: &str, duration: Duration) -> Result<TrialGrant> {
        let now = (self.clock)();
        self.update(|records| grant_in(records, user_id, duration, now))
    }

    fn mark_paid(&self, user_id: &str) -> Result<()> {
        self.update(|records| {
            mark_paid_in(records, user_id);
            Ok(())
        })
    }
}

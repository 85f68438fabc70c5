//! Recommendation ledger
//!
//! Keeps delivered recommendations per user so they can be listed again,
//! saved or dismissed. Entries expire after a TTL (7 days by default).

use chrono::{DateTime, Duration, Utc};
use matchmate_core::{FactorGroup, RecommendationEntry, Result, Source, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

use crate::persistence::{read_json, write_json};

pub const DEFAULT_TTL_DAYS: i64 = 7;

/// What produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    #[default]
    Initial,
    Daily,
    Manual,
    Retrain,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationSource::Initial => "initial",
            RecommendationSource::Daily => "daily",
            RecommendationSource::Manual => "manual",
            RecommendationSource::Retrain => "retrain",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecommendation {
    pub id: Uuid,
    pub for_user: UserId,
    pub recommended_user: UserId,
    pub ai_for_user_id: String,
    pub ai_recommended_user_id: String,
    pub compatibility_score: f64,
    pub match_percentage: u8,
    #[serde(default)]
    pub compatibility_factors: BTreeMap<FactorGroup, u8>,
    #[serde(default)]
    pub cluster_id: Option<i64>,
    #[serde(default)]
    pub shared_traits: Vec<String>,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    pub source: RecommendationSource,
    /// Strategy that produced the scores
    pub origin: Source,
    pub is_active: bool,
    pub saved: bool,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredRecommendation {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.dismissed && self.expires_at > now
    }
}

type LedgerKey = (UserId, UserId, RecommendationSource);

#[derive(Default)]
struct LedgerState {
    records: HashMap<Uuid, StoredRecommendation>,
    keys: HashMap<LedgerKey, Uuid>,
}

impl LedgerState {
    fn from_records(records: Vec<StoredRecommendation>) -> Self {
        let mut state = Self::default();
        for record in records {
            state.keys.insert(
                (record.for_user.clone(), record.recommended_user.clone(), record.source),
                record.id,
            );
            state.records.insert(record.id, record);
        }
        state
    }

    fn remove(&mut self, id: &Uuid) {
        if let Some(record) = self.records.remove(id) {
            self.keys
                .remove(&(record.for_user, record.recommended_user, record.source));
        }
    }
}

/// Per-user store of delivered recommendations
pub struct RecommendationLedger {
    state: RwLock<LedgerState>,
    ttl: Duration,
    path: Option<PathBuf>,
    /// Set by every change not yet written to `path`
    dirty: AtomicBool,
}

impl Default for RecommendationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationLedger {
    /// Memory-only ledger
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            path: None,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Ledger persisted to `path`, loading existing entries
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<StoredRecommendation> = read_json(&path)?.unwrap_or_default();
        info!(path = %path.display(), entries = records.len(), "recommendation ledger opened");

        Ok(Self {
            state: RwLock::new(LedgerState::from_records(records)),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            path: Some(path),
            dirty: AtomicBool::new(false),
        })
    }

    /// Upsert `entries` for `for_user`, keyed by (user, candidate, source).
    ///
    /// Existing entries keep their id, creation time and saved/dismissed
    /// flags; scores, explanations and expiry are refreshed. Returns every
    /// entry of that user and source, best match first.
    pub fn record(
        &self,
        for_user: &UserId,
        entries: &[RecommendationEntry],
        source: RecommendationSource,
        origin: Source,
    ) -> Vec<StoredRecommendation> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let mut state = self.state.write();

        for entry in entries {
            let key = (for_user.clone(), entry.candidate_id.clone(), source);
            let existing = state.keys.get(&key).copied();
            let previous = existing.and_then(|id| state.records.get(&id));

            let record = StoredRecommendation {
                id: existing.unwrap_or_else(Uuid::new_v4),
                for_user: for_user.clone(),
                recommended_user: entry.candidate_id.clone(),
                ai_for_user_id: for_user.external_id(),
                ai_recommended_user_id: entry.candidate_id.external_id(),
                compatibility_score: entry.compatibility_score,
                match_percentage: entry.match_percentage,
                compatibility_factors: entry.compatibility_factors.clone(),
                cluster_id: entry.cluster_id,
                shared_traits: entry.shared_traits.clone(),
                match_reasons: entry.match_reasons.clone(),
                source,
                origin,
                is_active: previous.map_or(true, |p| p.is_active),
                saved: previous.is_some_and(|p| p.saved),
                dismissed: previous.is_some_and(|p| p.dismissed),
                created_at: previous.map_or(now, |p| p.created_at),
                updated_at: now,
                expires_at,
            };

            state.keys.insert(key, record.id);
            state.records.insert(record.id, record);
        }
        if !entries.is_empty() {
            self.dirty.store(true, Ordering::Release);
        }

        debug!(user_id = %for_user, %source, count = entries.len(), "recommendations recorded");

        let mut stored: Vec<StoredRecommendation> = state
            .records
            .values()
            .filter(|r| &r.for_user == for_user && r.source == source)
            .cloned()
            .collect();
        sort_best_first(&mut stored);
        stored
    }

    /// Live entries of a user, best match first
    pub fn active_for(&self, user: &UserId, limit: usize) -> Vec<StoredRecommendation> {
        let now = Utc::now();
        let mut active: Vec<StoredRecommendation> = self
            .state
            .read()
            .records
            .values()
            .filter(|r| &r.for_user == user && r.is_live(now))
            .cloned()
            .collect();
        sort_best_first(&mut active);
        active.truncate(limit);
        active
    }

    pub fn get(&self, id: &Uuid) -> Option<StoredRecommendation> {
        self.state.read().records.get(id).cloned()
    }

    /// Deactivate an entry. Returns false when the user owns no such entry.
    pub fn dismiss(&self, user: &UserId, id: &Uuid) -> bool {
        self.update(user, id, |record| {
            record.is_active = false;
            record.dismissed = true;
        })
    }

    /// Mark an entry as saved. Returns false when the user owns no such entry.
    pub fn save(&self, user: &UserId, id: &Uuid) -> bool {
        self.update(user, id, |record| record.saved = true)
    }

    fn update(&self, user: &UserId, id: &Uuid, apply: impl FnOnce(&mut StoredRecommendation)) -> bool {
        let mut state = self.state.write();
        match state.records.get_mut(id) {
            Some(record) if &record.for_user == user => {
                apply(record);
                record.updated_at = Utc::now();
                self.dirty.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut state = self.state.write();
        let expired: Vec<Uuid> = state
            .records
            .values()
            .filter(|r| r.expires_at <= now)
            .map(|r| r.id)
            .collect();
        for id in &expired {
            state.remove(id);
        }
        if !expired.is_empty() {
            self.dirty.store(true, Ordering::Release);
            debug!(purged = expired.len(), "expired recommendations purged");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// True when changes are waiting to be written
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Write the ledger only if it changed since the last write.
    /// Returns whether there were pending changes.
    pub fn flush_if_dirty(&self) -> Result<bool> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        if let Err(e) = self.write() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(true)
    }

    /// Write the ledger to its file. Memory-only ledgers do nothing.
    pub fn flush(&self) -> Result<()> {
        self.dirty.store(false, Ordering::Release);
        if let Err(e) = self.write() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut records: Vec<StoredRecommendation> =
            self.state.read().records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        write_json(path, &records)
    }
}

fn sort_best_first(records: &mut [StoredRecommendation]) {
    records.sort_by(|a, b| {
        b.match_percentage
            .cmp(&a.match_percentage)
            .then_with(|| a.recommended_user.cmp(&b.recommended_user))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchmate_core::DisplayFields;
    use tempfile::tempdir;

    fn entry(candidate: &str, score: f64) -> RecommendationEntry {
        let display = DisplayFields {
            id: UserId::from(candidate),
            name: candidate.to_uppercase(),
            ..Default::default()
        };
        RecommendationEntry::new(display, score)
    }

    #[test]
    fn test_record_and_list_best_first() {
        let ledger = RecommendationLedger::new();
        let me = UserId::from("1");
        let stored = ledger.record(
            &me,
            &[entry("2", 0.4), entry("3", 0.9), entry("4", 0.7)],
            RecommendationSource::Initial,
            Source::Primary,
        );
        let order: Vec<_> = stored.iter().map(|r| r.recommended_user.as_str()).collect();
        assert_eq!(order, vec!["3", "4", "2"]);
        assert_eq!(stored[0].ai_recommended_user_id, "user_3");
        assert_eq!(stored[0].ai_for_user_id, "user_1");

        let active = ledger.active_for(&me, 2);
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].match_percentage, 90);
        assert!(ledger.active_for(&UserId::from("2"), 10).is_empty());
    }

    #[test]
    fn test_upsert_keeps_identity_and_flags() {
        let ledger = RecommendationLedger::new();
        let me = UserId::from("1");
        let first = ledger.record(&me, &[entry("2", 0.5)], RecommendationSource::Daily, Source::Fallback);
        let id = first[0].id;
        assert!(ledger.save(&me, &id));

        let second = ledger.record(&me, &[entry("2", 0.8)], RecommendationSource::Daily, Source::Primary);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, id);
        assert!(second[0].saved);
        assert_eq!(second[0].match_percentage, 80);
        assert_eq!(second[0].origin, Source::Primary);

        // A different source is a separate entry
        ledger.record(&me, &[entry("2", 0.8)], RecommendationSource::Manual, Source::Primary);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_dismiss_hides_entry() {
        let ledger = RecommendationLedger::new();
        let me = UserId::from("1");
        let stored = ledger.record(
            &me,
            &[entry("2", 0.5), entry("3", 0.6)],
            RecommendationSource::Initial,
            Source::Primary,
        );
        let dismissed = stored[0].id;

        assert!(!ledger.dismiss(&UserId::from("other"), &dismissed));
        assert!(ledger.dismiss(&me, &dismissed));
        assert!(!ledger.dismiss(&me, &Uuid::new_v4()));

        let active = ledger.active_for(&me, 10);
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, dismissed);
        assert!(ledger.get(&dismissed).unwrap().dismissed);
    }

    #[test]
    fn test_expired_entries_hidden_and_purged() {
        let ledger = RecommendationLedger::new().with_ttl(Duration::seconds(-1));
        let me = UserId::from("1");
        ledger.record(&me, &[entry("2", 0.5)], RecommendationSource::Initial, Source::Primary);

        assert!(ledger.active_for(&me, 10).is_empty());
        assert_eq!(ledger.purge_expired(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let me = UserId::from("1");

        let ledger = RecommendationLedger::open(&path).unwrap();
        let stored = ledger.record(&me, &[entry("2", 0.5)], RecommendationSource::Retrain, Source::Primary);
        ledger.flush().unwrap();

        let reopened = RecommendationLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&stored[0].id).unwrap().source, RecommendationSource::Retrain);

        // Reopened entries upsert onto the same key
        let again = reopened.record(&me, &[entry("2", 0.6)], RecommendationSource::Retrain, Source::Primary);
        assert_eq!(again[0].id, stored[0].id);
    }

    #[test]
    fn test_flush_if_dirty_tracks_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let me = UserId::from("1");

        let ledger = RecommendationLedger::open(&path).unwrap();
        assert!(!ledger.flush_if_dirty().unwrap());
        assert!(!path.exists());

        let stored = ledger.record(&me, &[entry("2", 0.5)], RecommendationSource::Manual, Source::Fallback);
        assert!(ledger.is_dirty());
        assert!(ledger.flush_if_dirty().unwrap());
        assert!(!ledger.flush_if_dirty().unwrap());
        assert_eq!(RecommendationLedger::open(&path).unwrap().len(), 1);

        assert!(ledger.save(&me, &stored[0].id));
        assert!(ledger.flush_if_dirty().unwrap());
        assert!(RecommendationLedger::open(&path).unwrap().get(&stored[0].id).unwrap().saved);

        assert!(!ledger.save(&UserId::from("other"), &stored[0].id));
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn test_purge_marks_dirty() {
        let ledger = RecommendationLedger::new().with_ttl(Duration::seconds(-1));
        assert_eq!(ledger.purge_expired(), 0);
        assert!(!ledger.is_dirty());

        ledger.record(&UserId::from("1"), &[entry("2", 0.5)], RecommendationSource::Daily, Source::Primary);
        assert!(ledger.flush_if_dirty().unwrap());
        assert_eq!(ledger.purge_expired(), 1);
        assert!(ledger.is_dirty());
    }

    #[test]
    fn test_memory_ledger_flush_is_noop() {
        let ledger = RecommendationLedger::new();
        ledger.flush().unwrap();
    }
}

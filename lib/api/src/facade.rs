//! Recommendation façade
//!
//! Asks the AI service first and falls back to local scoring on any
//! upstream failure. Callers see one response shape either way; `source`
//! tells which path answered.

use chrono::Utc;
use matchmate_core::{
    Error, ExternalId, RecommendationEntry, Result, Source, UserId, UserRecord,
};
use matchmate_schema::{explain_entry, FeatureEncoder, ScoredPair, ScoringStats};
use matchmate_similarity::CandidateAggregator;
use matchmate_storage::{ProfileStore, RecommendationLedger, RecommendationSource};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ai_format::AiUserPayload;
use crate::client::RecommendationService;
use crate::config::FacadeConfig;
use crate::payload::UpstreamPayload;

/// What callers of the façade receive
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendationEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_metrics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_stats: Option<ScoringStats>,
    pub source: Source,
}

/// Counters exposed on the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FacadeStats {
    pub primary_responses: u64,
    pub fallback_responses: u64,
}

pub struct RecommendationFacade {
    store: Arc<dyn ProfileStore>,
    service: Option<Arc<dyn RecommendationService>>,
    ledger: Option<Arc<RecommendationLedger>>,
    aggregator: CandidateAggregator,
    config: FacadeConfig,
    primary_responses: AtomicU64,
    fallback_responses: AtomicU64,
}

impl RecommendationFacade {
    pub fn new(store: Arc<dyn ProfileStore>, encoder: FeatureEncoder, config: FacadeConfig) -> Self {
        Self {
            store,
            service: None,
            ledger: None,
            aggregator: CandidateAggregator::new(encoder),
            config,
            primary_responses: AtomicU64::new(0),
            fallback_responses: AtomicU64::new(0),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn RecommendationService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<RecommendationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn ledger(&self) -> Option<&Arc<RecommendationLedger>> {
        self.ledger.as_ref()
    }

    pub fn stats(&self) -> FacadeStats {
        FacadeStats {
            primary_responses: self.primary_responses.load(Ordering::Relaxed),
            fallback_responses: self.fallback_responses.load(Ordering::Relaxed),
        }
    }

    /// # Errors
    /// [`Error::UserNotFound`] when no such user is stored.
    pub async fn require_user(&self, user_id: &UserId) -> Result<UserRecord> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.clone()))
    }

    /// Recommendations for `user_id`, best match first.
    ///
    /// # Errors
    /// [`Error::UserNotFound`] for unknown users. Upstream failures are
    /// never returned; when the local path also fails (for example
    /// [`Error::PreferencesNotSet`]) that error is.
    pub async fn get_recommendations(&self, user_id: &UserId, limit: usize) -> Result<RecommendationResponse> {
        let limit = self.config.resolve_limit(limit);
        let requester = self.require_user(user_id).await?;

        match self.primary(&requester, limit).await {
            Ok(response) => {
                self.primary_responses.fetch_add(1, Ordering::Relaxed);
                info!(
                    user_id = %user_id,
                    results = response.recommendations.len(),
                    "recommendations served by AI service"
                );
                return Ok(response);
            }
            Err(e) => warn!(user_id = %user_id, reason = %e, "falling back to local recommendations"),
        }

        let response = self.fallback(&requester, limit).await?;
        self.fallback_responses.fetch_add(1, Ordering::Relaxed);
        Ok(response)
    }

    /// Fetch recommendations and record them in the ledger under `source`.
    ///
    /// Unlike [`Self::get_recommendations`] this requires a usable profile
    /// even when the AI service could answer.
    pub async fn refresh(
        &self,
        user_id: &UserId,
        limit: usize,
        source: RecommendationSource,
    ) -> Result<RecommendationResponse> {
        let requester = self.require_user(user_id).await?;
        if requester.usable_profile().is_none() {
            return Err(Error::PreferencesNotSet(user_id.clone()));
        }

        let response = self.get_recommendations(user_id, limit).await?;
        self.record(user_id, &response, source);
        Ok(response)
    }

    /// Store a response in the ledger, if one is attached.
    ///
    /// Only memory is touched; the ledger file is written by
    /// [`crate::spawn_ledger_maintenance`] and on shutdown.
    pub fn record(&self, user_id: &UserId, response: &RecommendationResponse, source: RecommendationSource) {
        if let Some(ledger) = &self.ledger {
            ledger.record(user_id, &response.recommendations, source, response.source);
        }
    }

    /// Register a user's profile with the AI service
    pub async fn sync_user(&self, user_id: &UserId) -> Result<Value> {
        let service = self.service.as_ref().ok_or(Error::NotConfigured)?;
        let profile = self
            .require_user(user_id)
            .await?
            .usable_profile()
            .cloned()
            .ok_or_else(|| Error::PreferencesNotSet(user_id.clone()))?;

        let payload = AiUserPayload::from_profile(user_id, &profile, Utc::now());
        let answer = service.add_model_user(&payload).await?;
        info!(user_id = %user_id, "user registered with AI service");
        Ok(answer)
    }

    pub async fn retrain(&self) -> Result<Value> {
        let service = self.service.as_ref().ok_or(Error::NotConfigured)?;
        let answer = service.train_model().await?;
        info!("AI model retrained");
        Ok(answer)
    }

    async fn primary(&self, requester: &UserRecord, limit: usize) -> Result<RecommendationResponse> {
        let service = self.service.as_ref().ok_or(Error::NotConfigured)?;
        let raw = service.recommend(&requester.id.external_id(), limit).await?;
        let payload = UpstreamPayload::parse(raw)?;
        let requester_cluster = payload.requester_cluster();

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(payload.entries.len());
        for entry in payload.entries {
            match ExternalId::parse(&entry.user_id) {
                Some(ExternalId::Local(id)) if id != requester.id => {
                    if seen.insert(id.clone()) {
                        resolved.push((id, entry));
                    }
                }
                Some(ExternalId::Local(_)) => debug!("skipping requester in upstream answer"),
                Some(ExternalId::Mock) => debug!(external_id = %entry.user_id, "skipping mock user"),
                None => debug!(external_id = %entry.user_id, "skipping unresolvable id"),
            }
        }

        let ids: Vec<UserId> = resolved.iter().map(|(id, _)| id.clone()).collect();
        let users: HashMap<UserId, UserRecord> = self
            .store
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let encoder = self.aggregator.encoder();
        let requester_profile = requester.usable_profile();
        let requester_vector = requester_profile.map(|p| encoder.encode(p));

        let mut recommendations = Vec::with_capacity(resolved.len());
        for (id, upstream) in resolved {
            let Some(candidate) = users.get(&id) else {
                debug!(user_id = %id, "skipping unknown local user");
                continue;
            };
            if !candidate.is_candidate() {
                debug!(user_id = %id, "skipping non-candidate local user");
                continue;
            }

            let mut entry = RecommendationEntry::new(candidate.display_fields(), upstream.compatibility_score)
                .with_cluster(upstream.cluster_id);
            entry.upstream = upstream.extra;

            let same_cluster = matches!(
                (entry.cluster_id, requester_cluster),
                (Some(a), Some(b)) if a == b
            );
            let candidate_profile = candidate.usable_profile();
            let candidate_vector = candidate_profile.map(|p| encoder.encode(p));
            let pair = match (requester_profile, &requester_vector, candidate_profile, &candidate_vector) {
                (Some(rp), Some(rv), Some(cp), Some(cv)) => Some(ScoredPair {
                    requester: rp,
                    candidate: cp,
                    requester_vector: rv,
                    candidate_vector: cv,
                }),
                _ => None,
            };
            explain_entry(&mut entry, encoder, pair.as_ref(), same_cluster);

            recommendations.push(entry);
        }
        recommendations.truncate(limit);

        Ok(RecommendationResponse {
            recommendations,
            cluster_info: payload.cluster_info,
            model_metrics: payload.model_metrics,
            local_stats: None,
            source: Source::Primary,
        })
    }

    async fn fallback(&self, requester: &UserRecord, limit: usize) -> Result<RecommendationResponse> {
        let pool = self.store.list_candidate_profiles(&requester.id).await?;
        let local = self.aggregator.recommend(requester, &pool, limit)?;

        Ok(RecommendationResponse {
            recommendations: local.entries,
            cluster_info: None,
            model_metrics: None,
            local_stats: Some(local.stats),
            source: Source::Fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use matchmate_core::{Profile, Role};
    use matchmate_storage::InMemoryProfileStore;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    /// Scripted upstream answers, one per call
    struct ScriptedService {
        answers: Mutex<Vec<Result<Value>>>,
        calls: AtomicU64,
    }

    impl ScriptedService {
        fn new(answers: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers),
                calls: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl RecommendationService for ScriptedService {
        async fn recommend(&self, _external_id: &str, _n: usize) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let mut answers = self.answers.lock();
            if answers.is_empty() {
                return Err(Error::ExternalService("no scripted answer".into()));
            }
            answers.remove(0)
        }

        async fn add_model_user(&self, payload: &AiUserPayload) -> Result<Value> {
            Ok(json!({"user_id": payload.user_id}))
        }

        async fn train_model(&self) -> Result<Value> {
            Ok(json!({"status": "trained"}))
        }
    }

    fn profile(personality: &str, sleep: &str, hobbies: &[&str]) -> Profile {
        Profile {
            age: Some(24.0),
            personality_type: Some(personality.into()),
            sleep_pattern: Some(sleep.into()),
            cleanliness_level: Some("clean".into()),
            hobbies: hobbies.iter().map(|h| h.to_string()).collect(),
            form_completed: true,
            ..Default::default()
        }
    }

    fn store() -> Arc<InMemoryProfileStore> {
        let mut unfinished = profile("introvert", "night-owl", &[]);
        unfinished.form_completed = false;
        Arc::new(InMemoryProfileStore::from_users([
            UserRecord::new("1", "Ada").with_profile(profile("introvert", "night-owl", &["reading"])),
            UserRecord::new("2", "Bo").with_profile(profile("introvert", "night-owl", &["reading"])),
            UserRecord::new("3", "Cy").with_profile(profile("extrovert", "early-bird", &["sports"])),
            UserRecord::new("4", "Di").with_profile(unfinished),
            UserRecord::new("5", "Ed"),
        ]))
    }

    fn facade(service: Option<Arc<ScriptedService>>) -> RecommendationFacade {
        let facade = RecommendationFacade::new(store(), FeatureEncoder::standard(), FacadeConfig::default());
        match service {
            Some(service) => facade.with_service(service),
            None => facade,
        }
    }

    #[tokio::test]
    async fn test_primary_maps_and_skips() {
        let service = ScriptedService::new(vec![Ok(json!({
            "recommendations": [
                {"user_id": "mock_001", "compatibility_score": 0.99},
                {"user_id": "user_3", "compatibility_score": 0.9, "cluster": 2},
                {"user_id": "user_999", "compatibility_score": 0.8},
                {"user_id": "user_2", "compatibility_score": 0.7, "cluster": 1},
            ],
            "cluster_info": {"user_cluster": 1},
            "model_metrics": {"silhouette": 0.4}
        }))]);
        let facade = facade(Some(service));

        let response = facade.get_recommendations(&UserId::from("1"), 5).await.unwrap();
        assert_eq!(response.source, Source::Primary);
        let ids: Vec<_> = response.recommendations.iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!(response.recommendations[0].display_fields.name, "Cy");
        assert_eq!(response.recommendations[0].match_percentage, 90);
        assert!(response.model_metrics.is_some());

        let bo = &response.recommendations[1];
        assert!(bo.match_reasons.contains(&"Same lifestyle cluster".to_string()));
        assert!(bo.shared_traits.contains(&"same-sleep-pattern".to_string()));
        assert!(!bo.compatibility_factors.is_empty());
        assert_eq!(facade.stats().primary_responses, 1);
    }

    #[tokio::test]
    async fn test_primary_skips_mock_and_staff_records() {
        let mut synthetic = UserRecord::new("2", "Bot").with_profile(profile("introvert", "night-owl", &["reading"]));
        synthetic.is_mock = true;
        let mut admin = UserRecord::new("3", "Root").with_profile(profile("introvert", "night-owl", &["reading"]));
        admin.role = Role::Admin;
        let mut provider = UserRecord::new("4", "Landlord").with_profile(profile("introvert", "night-owl", &[]));
        provider.role = Role::Provider;
        let store = Arc::new(InMemoryProfileStore::from_users([
            UserRecord::new("1", "Ada").with_profile(profile("introvert", "night-owl", &["reading"])),
            synthetic,
            admin,
            provider,
            UserRecord::new("5", "Bo").with_profile(profile("introvert", "early-bird", &["reading"])),
        ]));
        let service = ScriptedService::new(vec![Ok(json!([
            {"user_id": "user_2", "compatibility_score": 0.95},
            {"user_id": "user_3", "compatibility_score": 0.9},
            {"user_id": "user_4", "compatibility_score": 0.85},
            {"user_id": "user_5", "compatibility_score": 0.8},
        ]))]);
        let facade = RecommendationFacade::new(store, FeatureEncoder::standard(), FacadeConfig::default())
            .with_service(service);

        let response = facade.get_recommendations(&UserId::from("1"), 5).await.unwrap();
        assert_eq!(response.source, Source::Primary);
        let ids: Vec<_> = response.recommendations.iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["5"]);
    }

    #[tokio::test]
    async fn test_failed_fallback_is_not_counted() {
        let facade = facade(Some(ScriptedService::new(vec![Err(Error::ExternalService("down".into()))])));
        assert!(facade.get_recommendations(&UserId::from("4"), 5).await.is_err());
        assert_eq!(
            facade.stats(),
            FacadeStats {
                primary_responses: 0,
                fallback_responses: 0
            }
        );

        facade.get_recommendations(&UserId::from("1"), 5).await.unwrap();
        assert_eq!(facade.stats().fallback_responses, 1);
    }

    #[tokio::test]
    async fn test_upstream_failures_fall_back() {
        let failures = vec![
            Err(Error::ExternalServiceTimeout(Duration::from_secs(30))),
            Err(Error::ExternalService("HTTP 500".into())),
            Ok(json!({"unexpected": true})),
        ];
        let count = failures.len() as u64;
        let facade = facade(Some(ScriptedService::new(failures)));

        for _ in 0..count {
            let response = facade.get_recommendations(&UserId::from("1"), 5).await.unwrap();
            assert_eq!(response.source, Source::Fallback);
            let ids: Vec<_> = response.recommendations.iter().map(|e| e.candidate_id.as_str()).collect();
            assert_eq!(ids, vec!["2", "3"]);
            assert!(response.local_stats.is_some());
        }
        assert_eq!(facade.stats().fallback_responses, count);
    }

    #[tokio::test]
    async fn test_no_service_goes_local() {
        let facade = facade(None);
        let response = facade.get_recommendations(&UserId::from("1"), 0).await.unwrap();
        assert_eq!(response.source, Source::Fallback);
        assert_eq!(response.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_surfaces_missing_preferences() {
        let facade = facade(Some(ScriptedService::new(vec![Err(Error::ExternalService("down".into()))])));
        let err = facade.get_recommendations(&UserId::from("5"), 5).await.unwrap_err();
        assert!(matches!(err, Error::PreferencesNotSet(_)));

        let err = facade.get_recommendations(&UserId::from("nobody"), 5).await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_primary_answer_without_requester_profile() {
        let service = ScriptedService::new(vec![Ok(json!([
            {"user_id": "user_2", "compatibility_score": 0.9}
        ]))]);
        let facade = facade(Some(service));
        let response = facade.get_recommendations(&UserId::from("5"), 5).await.unwrap();
        assert_eq!(response.source, Source::Primary);
        let entry = &response.recommendations[0];
        assert!(entry.compatibility_factors.is_empty());
        assert!(entry.shared_traits.contains(&"high-compatibility".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_records_in_ledger() {
        let ledger = Arc::new(RecommendationLedger::new());
        let facade = facade(None).with_ledger(ledger.clone());

        facade
            .refresh(&UserId::from("1"), 5, RecommendationSource::Daily)
            .await
            .unwrap();
        let err = facade
            .refresh(&UserId::from("4"), 5, RecommendationSource::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreferencesNotSet(_)));

        let stored = ledger.active_for(&UserId::from("1"), 10);
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|r| r.source == RecommendationSource::Daily));
        assert!(stored.iter().all(|r| r.origin == Source::Fallback));
    }

    #[tokio::test]
    async fn test_sync_and_retrain() {
        let facade = facade(Some(ScriptedService::new(vec![])));
        let answer = facade.sync_user(&UserId::from("2")).await.unwrap();
        assert_eq!(answer["user_id"], "user_2");
        assert!(matches!(
            facade.sync_user(&UserId::from("4")).await,
            Err(Error::PreferencesNotSet(_))
        ));
        assert_eq!(facade.retrain().await.unwrap()["status"], "trained");

        let local_only = self::facade(None);
        assert!(matches!(local_only.retrain().await, Err(Error::NotConfigured)));
    }
}

//! Recurring recommendation refresh
//!
//! One tokio task per user. The scoring path never depends on this module;
//! it only drives [`RecommendationFacade::refresh`] on a timer.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use futures_util::future::BoxFuture;
use matchmate_core::{Error, Result, UserId};
use matchmate_storage::{RecommendationLedger, RecommendationSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::facade::RecommendationFacade;

pub type RefreshCallback = Arc<dyn Fn(UserId) -> BoxFuture<'static, ()> + Send + Sync>;

/// A `M H * * *` cron expression, evaluated in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let &[minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(invalid(expression, "expected 5 fields"));
        };
        if [day, month, weekday] != ["*", "*", "*"] {
            return Err(invalid(expression, "only daily schedules are supported"));
        }

        let minute: u32 = minute.parse().map_err(|_| invalid(expression, "bad minute"))?;
        let hour: u32 = hour.parse().map_err(|_| invalid(expression, "bad hour"))?;
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| invalid(expression, "time out of range"))?;
        Ok(Self { at })
    }

    /// First firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(self.at));
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

fn invalid(expression: &str, reason: &str) -> Error {
    Error::InvalidSchedule(format!("`{}`: {}", expression, reason))
}

pub trait RefreshScheduler: Send + Sync {
    /// Run `callback` for `user_id` on `cron_expression`, replacing any
    /// existing job for that user
    fn schedule_recurring(&self, user_id: &UserId, cron_expression: &str, callback: RefreshCallback) -> Result<()>;

    /// Returns false when nothing was scheduled
    fn cancel(&self, user_id: &UserId) -> bool;

    fn is_scheduled(&self, user_id: &UserId) -> bool;
}

pub struct TokioRefreshScheduler {
    runtime: Handle,
    jobs: Mutex<HashMap<UserId, JoinHandle<()>>>,
}

impl TokioRefreshScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl RefreshScheduler for TokioRefreshScheduler {
    fn schedule_recurring(&self, user_id: &UserId, cron_expression: &str, callback: RefreshCallback) -> Result<()> {
        let schedule = DailySchedule::parse(cron_expression)?;
        let user = user_id.clone();

        let job = self.runtime.spawn(async move {
            loop {
                let delay = schedule.delay_from(Utc::now());
                debug!(user_id = %user, delay_secs = delay.as_secs(), "next refresh scheduled");
                tokio::time::sleep(delay).await;
                callback(user.clone()).await;
            }
        });

        if let Some(previous) = self.jobs.lock().insert(user_id.clone(), job) {
            previous.abort();
        }
        info!(user_id = %user_id, cron = cron_expression, "scheduled recommendation refresh");
        Ok(())
    }

    fn cancel(&self, user_id: &UserId) -> bool {
        match self.jobs.lock().remove(user_id) {
            Some(job) => {
                job.abort();
                info!(user_id = %user_id, "cancelled recommendation refresh");
                true
            }
            None => false,
        }
    }

    fn is_scheduled(&self, user_id: &UserId) -> bool {
        self.jobs.lock().contains_key(user_id)
    }
}

impl Drop for TokioRefreshScheduler {
    fn drop(&mut self) {
        for (_, job) in self.jobs.lock().drain() {
            job.abort();
        }
    }
}

/// Callback that refreshes a user's recommendations into the ledger
pub fn daily_refresh(facade: Arc<RecommendationFacade>) -> RefreshCallback {
    Arc::new(move |user_id: UserId| {
        let facade = facade.clone();
        Box::pin(async move {
            match facade.refresh(&user_id, 0, RecommendationSource::Daily).await {
                Ok(response) => info!(
                    user_id = %user_id,
                    results = response.recommendations.len(),
                    source = %response.source,
                    "daily recommendations refreshed"
                ),
                Err(e) => warn!(user_id = %user_id, error = %e, "daily refresh failed"),
            }
        })
    })
}

/// Purge expired ledger entries and write pending changes every `interval`.
///
/// File writes run on the blocking pool.
pub fn spawn_ledger_maintenance(
    ledger: Arc<RecommendationLedger>,
    runtime: &Handle,
    interval: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = ledger.purge_expired();
            if purged > 0 {
                info!(purged, "expired recommendations purged");
            }

            let pending = ledger.clone();
            match tokio::task::spawn_blocking(move || pending.flush_if_dirty()).await {
                Ok(Ok(true)) => debug!("recommendation ledger written"),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => error!(error = %e, "failed to persist recommendation ledger"),
                Err(e) => error!(error = %e, "ledger flush task failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_daily() {
        let schedule = DailySchedule::parse("0 3 * * *").unwrap();
        assert_eq!(schedule.next_after(at(1, 0, 0)), at(3, 0, 0));
        assert_eq!(
            schedule.next_after(at(3, 0, 0)),
            Utc.with_ymd_and_hms(2024, 3, 11, 3, 0, 0).unwrap()
        );
        assert_eq!(
            DailySchedule::parse(" 30  22 * * * ").unwrap().next_after(at(23, 0, 0)),
            Utc.with_ymd_and_hms(2024, 3, 11, 22, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_other_schedules() {
        for expression in ["", "0 3 * *", "0 3 1 * *", "*/5 * * * *", "60 3 * * *", "0 24 * * *", "a b * * *"] {
            assert!(
                matches!(DailySchedule::parse(expression), Err(Error::InvalidSchedule(_))),
                "accepted {:?}",
                expression
            );
        }
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> RefreshCallback {
        Arc::new(move |_user| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_fires_and_cancels() {
        let scheduler = TokioRefreshScheduler::new(Handle::current());
        let counter = Arc::new(AtomicUsize::new(0));
        let user = UserId::from("1");

        scheduler
            .schedule_recurring(&user, "0 3 * * *", counting_callback(counter.clone()))
            .unwrap();
        assert!(scheduler.is_scheduled(&user));

        tokio::time::sleep(Duration::from_secs(25 * 3600)).await;
        assert!(counter.load(Ordering::SeqCst) >= 1);

        assert!(scheduler.cancel(&user));
        assert!(!scheduler.cancel(&user));
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_replaces_job() {
        let scheduler = TokioRefreshScheduler::new(Handle::current());
        let counter = Arc::new(AtomicUsize::new(0));
        let user = UserId::from("1");

        scheduler
            .schedule_recurring(&user, "0 3 * * *", counting_callback(counter.clone()))
            .unwrap();
        scheduler
            .schedule_recurring(&user, "15 4 * * *", counting_callback(counter))
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        let err = scheduler.schedule_recurring(&UserId::from("2"), "bogus", daily_noop());
        assert!(matches!(err, Err(Error::InvalidSchedule(_))));
        assert!(!scheduler.is_scheduled(&UserId::from("2")));
    }

    #[tokio::test]
    async fn test_ledger_maintenance_purges_and_writes() {
        use chrono::Duration as ChronoDuration;
        use matchmate_core::{DisplayFields, RecommendationEntry, Source};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = Arc::new(RecommendationLedger::open(&path).unwrap().with_ttl(ChronoDuration::seconds(-1)));
        let candidate = DisplayFields {
            id: UserId::from("2"),
            ..Default::default()
        };
        ledger.record(
            &UserId::from("1"),
            &[RecommendationEntry::new(candidate, 0.5)],
            RecommendationSource::Daily,
            Source::Fallback,
        );

        let job = spawn_ledger_maintenance(ledger.clone(), &Handle::current(), Duration::from_millis(20));
        for _ in 0..100 {
            if ledger.is_empty() && !ledger.is_dirty() && path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        job.abort();

        assert!(ledger.is_empty());
        assert!(path.exists());
        assert!(RecommendationLedger::open(&path).unwrap().is_empty());
    }

    fn daily_noop() -> RefreshCallback {
        Arc::new(|_user| Box::pin(async {}))
    }
}

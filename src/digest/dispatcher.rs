use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::services::{Notifier, SubmissionTracker};

use super::SynthesisEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchTrigger {
    /// Timer fire: only dispatches when something is unshared.
    Scheduled,
    /// Operator request: dispatches whatever the day holds.
    Manual,
}

/// How a dispatch cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No scraped records for the day.
    NoRecords,
    /// Everything today was already shared; nothing sent.
    NothingNew { total: usize },
    Dispatched {
        total: usize,
        unshared: usize,
        marked: usize,
        message: String,
    },
    /// The notifier failed; nothing was marked shared.
    DeliveryFailed {
        total: usize,
        unshared: usize,
        error: String,
    },
}

/// Runs gather, evaluate, synthesize, deliver and commit for one day's
/// records. Cycles never overlap.
pub struct DigestDispatcher {
    tracker: Arc<SubmissionTracker>,
    engine: SynthesisEngine,
    notifier: Arc<dyn Notifier>,
    cycle_lock: Mutex<()>,
}

impl DigestDispatcher {
    pub fn new(
        tracker: Arc<SubmissionTracker>,
        engine: SynthesisEngine,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tracker,
            engine,
            notifier,
            cycle_lock: Mutex::new(()),
        }
    }

    pub async fn run_cycle(&self, trigger: DispatchTrigger) -> Result<CycleOutcome> {
        self.run_cycle_on(trigger, Utc::now().date_naive()).await
    }

    pub async fn run_cycle_on(
        &self,
        trigger: DispatchTrigger,
        date: NaiveDate,
    ) -> Result<CycleOutcome> {
        let _cycle = self.cycle_lock.lock().await;

        // Gathering
        let records = self.tracker.repository().scraped_on(date).await?;
        if records.is_empty() {
            tracing::info!(?trigger, %date, "No scraped submissions for the day");
            return Ok(CycleOutcome::NoRecords);
        }

        // Evaluating
        let unshared: Vec<String> = records
            .iter()
            .filter(|r| !r.is_shared())
            .map(|r| r.source_url.clone())
            .collect();
        for record in &records {
            tracing::debug!(url = %record.source_url, shared_at = ?record.shared_to_group_at, "Sharing status");
        }

        if unshared.is_empty() && trigger == DispatchTrigger::Scheduled {
            tracing::info!(total = records.len(), "All submissions already shared, skipping digest");
            return Ok(CycleOutcome::NothingNew {
                total: records.len(),
            });
        }
        tracing::info!(
            ?trigger,
            unshared = unshared.len(),
            total = records.len(),
            "Dispatching digest"
        );

        // Synthesizing covers the whole day, not just the unshared subset.
        let message = self.engine.synthesize(&records).await;

        // Dispatching
        if let Err(e) = self.notifier.deliver(&message).await {
            tracing::error!(error = %e, unshared = unshared.len(), "Digest delivery failed, nothing marked shared");
            return Ok(CycleOutcome::DeliveryFailed {
                total: records.len(),
                unshared: unshared.len(),
                error: e.to_string(),
            });
        }

        // Committing
        let marked = self.tracker.mark_shared(&unshared).await?;
        if marked != unshared.len() {
            tracing::warn!(
                expected = unshared.len(),
                marked,
                "Share count mismatch, some submissions were marked concurrently"
            );
        }

        Ok(CycleOutcome::Dispatched {
            total: records.len(),
            unshared: unshared.len(),
            marked,
            message,
        })
    }

    /// Fire a scheduled cycle every `period` until `shutdown` flips to true.
    /// The first cycle runs one period after start.
    pub async fn run_periodic(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs(), "Periodic digest dispatcher started");

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    tracing::debug!("Checking for unshared submissions");
                    match self.run_cycle(DispatchTrigger::Scheduled).await {
                        Ok(outcome) => tracing::debug!(?outcome, "Dispatch cycle finished"),
                        Err(e) if e.is_store_failure() => {
                            tracing::error!(error = %e, "Store failure, dispatch cycle aborted")
                        }
                        Err(e) => tracing::warn!(error = %e, "Dispatch cycle aborted"),
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Periodic digest dispatcher stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompts::NO_CONVERSATIONS_MESSAGE;
    use crate::testing::{
        break_store, file_tracker, share_url, tracker, RecordingNotifier, RecordingSynthesizer,
    };

    struct Fixture {
        tracker: Arc<SubmissionTracker>,
        notifier: Arc<RecordingNotifier>,
        dispatcher: Arc<DigestDispatcher>,
    }

    async fn fixture() -> Fixture {
        let tracker = tracker().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = SynthesisEngine::new(Some(Arc::new(RecordingSynthesizer::default())));
        let dispatcher = Arc::new(DigestDispatcher::new(
            tracker.clone(),
            engine,
            notifier.clone(),
        ));
        Fixture {
            tracker,
            notifier,
            dispatcher,
        }
    }

    async fn scraped(tracker: &SubmissionTracker, id: &str, submitter: &str, digest: &str) {
        tracker.submit(&share_url(id), submitter).await.unwrap();
        tracker
            .record_scrape_result(&share_url(id), format!("content {id}"), digest.to_string())
            .await
            .unwrap();
    }

    async fn shared_at(tracker: &SubmissionTracker, id: &str) -> Option<chrono::DateTime<Utc>> {
        tracker
            .repository()
            .submission_by_url(&share_url(id))
            .await
            .unwrap()
            .unwrap()
            .shared_to_group_at
    }

    #[tokio::test]
    async fn empty_day_sends_nothing() {
        let f = fixture().await;
        f.tracker.submit(&share_url("pending"), "xyn").await.unwrap();

        let outcome = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        assert_eq!(outcome, CycleOutcome::NoRecords);
        assert!(f.notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn dispatches_then_skips_when_nothing_new() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "thinks about tides").await;

        let first = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        match first {
            CycleOutcome::Dispatched {
                total,
                unshared,
                marked,
                ref message,
            } => {
                assert_eq!((total, unshared, marked), (1, 1, 1));
                assert!(message.contains("From Alice (#1): thinks about tides"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(shared_at(&f.tracker, "a").await.is_some());

        let second = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        assert_eq!(second, CycleOutcome::NothingNew { total: 1 });
        assert_eq!(f.notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn new_submission_resends_whole_day_but_marks_only_new() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;
        f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        let a_shared = shared_at(&f.tracker, "a").await;

        scraped(&f.tracker, "b", "Bob", "d4").await;
        let outcome = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        match outcome {
            CycleOutcome::Dispatched {
                total,
                unshared,
                marked,
                message,
            } => {
                assert_eq!((total, unshared, marked), (2, 1, 1));
                assert!(message.contains("From Alice (#1): d1"));
                assert!(message.contains("From Bob (#1): d4"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(shared_at(&f.tracker, "a").await, a_shared);
        assert!(shared_at(&f.tracker, "b").await.is_some());
    }

    #[tokio::test]
    async fn delivery_failure_marks_nothing_and_next_cycle_retries() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;
        f.notifier.set_failing(true);

        let failed = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        assert!(matches!(
            failed,
            CycleOutcome::DeliveryFailed { unshared: 1, .. }
        ));
        assert!(shared_at(&f.tracker, "a").await.is_none());

        scraped(&f.tracker, "b", "Bob", "d4").await;
        f.notifier.set_failing(false);
        let retried = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        assert!(matches!(
            retried,
            CycleOutcome::Dispatched {
                unshared: 2,
                marked: 2,
                ..
            }
        ));
        assert_eq!(f.notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn manual_trigger_sends_even_when_everything_is_shared() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;
        f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        let outcome = f.dispatcher.run_cycle(DispatchTrigger::Manual).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Dispatched {
                total: 1,
                unshared: 0,
                marked: 0,
                ..
            }
        ));
        assert_eq!(f.notifier.delivered().len(), 2);
    }

    #[tokio::test]
    async fn reset_then_cycle_reshares_everything() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;
        scraped(&f.tracker, "b", "Bob", "d4").await;
        f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        assert_eq!(f.tracker.reset_all_shared().await.unwrap(), 2);
        let outcome = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Dispatched {
                total: 2,
                unshared: 2,
                marked: 2,
                ..
            }
        ));
        assert!(shared_at(&f.tracker, "a").await.is_some());
        assert!(shared_at(&f.tracker, "b").await.is_some());
    }

    #[tokio::test]
    async fn blank_digests_still_count_as_dispatched_with_sentinel() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "").await;

        let outcome = f.dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Dispatched { marked: 1, .. }));
        assert_eq!(f.notifier.delivered(), vec![NO_CONVERSATIONS_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn concurrent_cycles_are_serialized() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;

        let (first, second) = tokio::join!(
            f.dispatcher.run_cycle(DispatchTrigger::Scheduled),
            f.dispatcher.run_cycle(DispatchTrigger::Scheduled),
        );
        let outcomes = [first.unwrap(), second.unwrap()];

        let dispatched = outcomes
            .iter()
            .filter(|o| matches!(o, CycleOutcome::Dispatched { .. }))
            .count();
        assert_eq!(dispatched, 1);
        assert!(outcomes.contains(&CycleOutcome::NothingNew { total: 1 }));
        assert_eq!(f.notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn periodic_loop_fires_on_interval_and_stops() {
        let f = fixture().await;
        scraped(&f.tracker, "a", "Alice", "d1").await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(
            f.dispatcher
                .clone()
                .run_periodic(Duration::from_millis(50), shutdown_rx),
        );
        assert!(f.notifier.delivered().is_empty());

        let notifier = f.notifier.clone();
        let delivered = async move {
            while notifier.delivered().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), delivered)
            .await
            .expect("no scheduled dispatch happened");

        // Later ticks find nothing new.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.notifier.delivered().len(), 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap();
    }

    /// Moves the table away during the first delivery so the commit step
    /// fails after the message went out.
    struct TableMovingNotifier {
        path: std::path::PathBuf,
        moved: std::sync::atomic::AtomicBool,
        delivered: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Notifier for TableMovingNotifier {
        async fn deliver(&self, _message: &str) -> Result<()> {
            use std::sync::atomic::Ordering;
            if !self.moved.swap(true, Ordering::SeqCst) {
                rusqlite::Connection::open(&self.path)
                    .unwrap()
                    .execute_batch("ALTER TABLE submissions RENAME TO submissions_moved")
                    .unwrap();
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failure_while_gathering_aborts_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let (tracker, path) = file_tracker(&dir).await;
        scraped(&tracker, "a", "xyn", "digest a").await;
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = DigestDispatcher::new(tracker, SynthesisEngine::new(None), notifier.clone());

        break_store(&path);

        let err = dispatcher
            .run_cycle(DispatchTrigger::Scheduled)
            .await
            .unwrap_err();
        assert!(err.is_store_failure());
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn store_failure_while_committing_marks_nothing() {
        use std::sync::atomic::Ordering;

        let dir = tempfile::tempdir().unwrap();
        let (tracker, path) = file_tracker(&dir).await;
        scraped(&tracker, "a", "xyn", "digest a").await;
        let notifier = Arc::new(TableMovingNotifier {
            path: path.clone(),
            moved: Default::default(),
            delivered: Default::default(),
        });
        let dispatcher = DigestDispatcher::new(
            tracker.clone(),
            SynthesisEngine::new(None),
            notifier.clone(),
        );

        let err = dispatcher
            .run_cycle(DispatchTrigger::Scheduled)
            .await
            .unwrap_err();
        assert!(err.is_store_failure());
        assert_eq!(notifier.delivered.load(Ordering::SeqCst), 1);

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("ALTER TABLE submissions_moved RENAME TO submissions")
            .unwrap();
        assert!(shared_at(&tracker, "a").await.is_none());

        let outcome = dispatcher.run_cycle(DispatchTrigger::Scheduled).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Dispatched { marked: 1, .. }));
        assert_eq!(notifier.delivered.load(Ordering::SeqCst), 2);
    }
}

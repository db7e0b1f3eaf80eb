//! # Reminder Scheduler
//!
//! Once a day, every owner with due items gets one reminder. Items listed in
//! a delivered reminder have their review count advanced; anything that was
//! not delivered stays due for the next cycle.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Cycle reports and the already-running guard
//! - 1.1.0: Retry with fixed delay before giving up on an owner
//! - 1.0.0: Daily cycle over all owners

use super::message::compose_reminder;
use super::notifier::{Notifier, RecipientResolver};
use super::retry::RetryPolicy;
use super::trigger::DailyTrigger;
use crate::core::config::SchedulerConfig;
use crate::database::ItemStore;
use crate::features::reviews::due_items;
use chrono::Local;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
}

/// What one cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub owners_seen: usize,
    pub notified: usize,
    /// Owners with nothing due or no resolvable recipient
    pub skipped: usize,
    pub delivery_failures: usize,
    /// Owners whose due items could not be loaded
    pub query_failures: usize,
    pub items_advanced: usize,
    pub increment_failures: usize,
    pub stopped_early: bool,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} owners, {} notified, {} skipped, {} delivery failures, {} query failures, \
             {} items advanced, {} increment failures",
            self.owners_seen,
            self.notified,
            self.skipped,
            self.delivery_failures,
            self.query_failures,
            self.items_advanced,
            self.increment_failures
        )?;
        if self.stopped_early {
            write!(f, " (stopped early)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was in flight; nothing was done
    AlreadyRunning,
}

/// Marks a cycle in flight; clears the flag when dropped
struct CycleGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct ReminderScheduler {
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
    recipients: Arc<dyn RecipientResolver>,
    trigger: DailyTrigger,
    lookback: chrono::Duration,
    retry: RetryPolicy,
    max_items_per_message: usize,
    running: AtomicBool,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ItemStore>,
        notifier: Arc<dyn Notifier>,
        recipients: Arc<dyn RecipientResolver>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            recipients,
            trigger: DailyTrigger::new(config.review_time),
            lookback: config.lookback,
            retry: RetryPolicy::new(config.retry_attempts, config.retry_delay),
            max_items_per_message: config.max_items_per_message,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::RunningCycle
        } else {
            SchedulerState::Idle
        }
    }

    fn try_begin_cycle(&self) -> Option<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard {
                running: &self.running,
            })
    }

    /// Run one reminder cycle over every owner.
    ///
    /// `stop` is checked between owners; the owner being processed always
    /// finishes.
    pub async fn run_cycle(&self, stop: &watch::Receiver<bool>) -> CycleOutcome {
        let Some(_guard) = self.try_begin_cycle() else {
            warn!("Review reminder cycle already running, skipping");
            return CycleOutcome::AlreadyRunning;
        };

        let mut report = CycleReport::default();
        let owners = match self.store.list_distinct_owners().await {
            Ok(owners) => owners,
            Err(e) => {
                error!("Failed to list users for review reminders: {e}");
                return CycleOutcome::Completed(report);
            }
        };

        info!("Starting review reminder cycle for {} users", owners.len());
        for owner in &owners {
            if *stop.borrow() {
                info!("Stop requested, ending review reminder cycle early");
                report.stopped_early = true;
                break;
            }
            report.owners_seen += 1;
            self.process_owner(owner, &mut report).await;
        }

        CycleOutcome::Completed(report)
    }

    async fn process_owner(&self, owner: &str, report: &mut CycleReport) {
        let due = match due_items(self.store.as_ref(), owner, self.lookback).await {
            Ok(due) => due,
            Err(e) => {
                error!("Failed to load items due for review for user {owner}: {e}");
                report.query_failures += 1;
                return;
            }
        };

        if due.is_empty() {
            debug!("Nothing due for user {owner}");
            report.skipped += 1;
            return;
        }

        let Some(recipient) = self.recipients.resolve(owner) else {
            warn!("No reminder recipient for user {owner}, skipping {} due items", due.len());
            report.skipped += 1;
            return;
        };

        let mention = recipient.mention();
        let Some(message) = compose_reminder(mention.as_deref(), &due, self.max_items_per_message)
        else {
            return;
        };

        let label = format!("Review reminder for user {owner}");
        let delivery = self
            .retry
            .run(&label, |_| self.notifier.send(&recipient, &message.text))
            .await;
        match delivery {
            Ok(sent) => info!(
                "Sent review reminder with {} items to user {owner} via {recipient} (attempt {})",
                message.item_ids.len(),
                sent.attempts
            ),
            Err(failed) => {
                error!(
                    "Giving up on review reminder for user {owner} after {} attempts: {}",
                    failed.attempts, failed.value
                );
                report.delivery_failures += 1;
                return;
            }
        }
        report.notified += 1;

        for id in &message.item_ids {
            match self.store.increment_review_count(*id).await {
                Ok(()) => report.items_advanced += 1,
                Err(e) => {
                    warn!("Failed to advance review count for item {id}: {e}");
                    report.increment_failures += 1;
                }
            }
        }
    }

    /// Sleep until each daily fire time and run a cycle, until `stop` is set
    pub async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        info!("Review reminder scheduler started, runs daily at {}", self.trigger);

        loop {
            if *stop.borrow() {
                break;
            }

            let now = Local::now();
            let next = self.trigger.next_after(&now);
            debug!("Next review reminder cycle at {}", next.format("%Y-%m-%d %H:%M %Z"));

            tokio::select! {
                _ = tokio::time::sleep(self.trigger.until_next(&now)) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            match self.run_cycle(&stop).await {
                CycleOutcome::Completed(report) => {
                    info!("Review reminder cycle finished: {report}")
                }
                CycleOutcome::AlreadyRunning => {}
            }
        }

        info!("Review reminder scheduler stopped");
    }

    /// Spawn the daily loop on the tokio runtime
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = Arc::new(self);
        let task = tokio::spawn(scheduler.clone().run(stop_rx));
        SchedulerHandle {
            scheduler,
            stop: stop_tx,
            task,
        }
    }
}

/// Running scheduler. Dropping the handle also ends the loop at its next wait.
pub struct SchedulerHandle {
    scheduler: Arc<ReminderScheduler>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Run a cycle right away, outside the daily schedule
    pub async fn run_now(&self) -> CycleOutcome {
        let stop = self.stop.subscribe();
        self.scheduler.run_cycle(&stop).await
    }

    /// Ask the loop to stop and wait for it. An in-flight owner finishes first.
    pub async fn stop(self) {
        if self.stop.send(true).is_err() {
            debug!("Review reminder scheduler already gone");
        }
        if let Err(e) = self.task.await {
            error!("Review reminder scheduler task failed: {e}");
        }
    }
}

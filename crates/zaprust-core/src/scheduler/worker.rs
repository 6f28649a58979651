//! Due-job polling worker

use chrono::{Local, Utc};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zaprust_common::config::SchedulerConfig;
use zaprust_common::types::Severity;
use zaprust_storage::{CreateJob, Job, JobRepository};

use super::inflight::InFlightSet;
use super::repeat;
use crate::activity::ActivityRecorder;
use crate::dispatch::DispatchGateway;
use crate::events::EventBus;
use crate::session::SessionManager;

/// Polls for due jobs and publishes them
#[derive(Clone)]
pub struct JobScheduler {
    jobs: JobRepository,
    sessions: SessionManager,
    gateway: DispatchGateway,
    activity: ActivityRecorder,
    bus: EventBus,
    in_flight: InFlightSet,
    tick: Duration,
    ready_wait: Duration,
}

impl JobScheduler {
    pub fn new(
        jobs: JobRepository,
        sessions: SessionManager,
        gateway: DispatchGateway,
        activity: ActivityRecorder,
        bus: EventBus,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            sessions,
            gateway,
            activity,
            bus,
            in_flight: InFlightSet::new(),
            tick: Duration::from_secs(config.tick_secs),
            ready_wait: Duration::from_secs(config.ready_wait_secs),
        }
    }

    /// Run the polling loop until cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(tick_secs = self.tick.as_secs(), "Job scheduler started");
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.tick_once().await,
            }
        }
        info!("Job scheduler stopped");
    }

    /// One polling pass: claim each due job and process it concurrently
    pub async fn tick_once(&self) {
        let due = match self.jobs.due(Utc::now()).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Failed to load due jobs: {}", e);
                return;
            }
        };

        for job in due {
            // still being processed from an earlier pass
            let Some(guard) = self.in_flight.try_claim(job.id) else {
                continue;
            };
            let scheduler = self.clone();
            tokio::spawn(async move {
                let _guard = guard;
                scheduler.process_job(job).await;
            });
        }
    }

    async fn process_job(&self, job: Job) {
        debug!(job_id = %job.id, "Processing due job");

        if !self.sessions.is_connected(job.account_id).await {
            if let Err(e) = self.sessions.connect(job.account_id).await {
                debug!(job_id = %job.id, "Session nudge failed: {}", e);
            }
            if !self
                .sessions
                .wait_until_ready(job.account_id, self.ready_wait)
                .await
            {
                warn!(job_id = %job.id, "Session not ready; job stays pending");
                self.bus.notify(
                    Severity::Warning,
                    "Post delayed",
                    "Session offline; the scheduled post will retry on the next pass",
                    Some(job.account_id),
                );
                return;
            }
        }

        let Some(media_path) = job.media_path.clone() else {
            self.fail_job(&job, "Job has no media attached").await;
            return;
        };

        let caption = job.caption.as_deref();
        match self
            .gateway
            .post_broadcast(job.account_id, &media_path, caption)
            .await
        {
            Ok(()) => self.complete_job(&job).await,
            Err(e) if e.is_transient() => {
                warn!(job_id = %job.id, "Transient failure; job stays pending: {}", e);
                self.bus.notify(
                    Severity::Warning,
                    "Post delayed",
                    format!("Scheduled post not sent yet: {}", e),
                    Some(job.account_id),
                );
            }
            Err(e) => self.fail_job(&job, &e.to_string()).await,
        }
    }

    async fn complete_job(&self, job: &Job) {
        if let Err(e) = self.jobs.mark_sent(job.id).await {
            error!(job_id = %job.id, "Failed to mark job sent: {}", e);
        }
        info!(job_id = %job.id, "Scheduled post published");
        self.activity
            .record(
                Severity::Info,
                "scheduled_post",
                "Scheduled post published",
                Some(job.account_id),
                None,
            )
            .await;
        self.bus.notify(
            Severity::Info,
            "Post published",
            "Scheduled post sent",
            Some(job.account_id),
        );
        self.schedule_successor(job).await;
    }

    /// Queue the next occurrence of a repeating job
    ///
    /// Successors take the computed time as-is; the minute-slot nudge
    /// applies only when a job is first created.
    async fn schedule_successor(&self, job: &Job) {
        let Some(repeat) = job.repeat_enum() else {
            return;
        };
        let days = job.repeat_days_vec();
        let fired_local = job.scheduled_at.with_timezone(&Local).naive_local();
        let Some(next_local) = repeat::next_occurrence(fired_local, repeat, &days) else {
            debug!(job_id = %job.id, "Repeat schedule has no next occurrence");
            return;
        };
        let next = match next_local.and_local_timezone(Local) {
            chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
                dt.with_timezone(&Utc)
            }
            // the local time falls in a DST gap
            chrono::LocalResult::None => job.scheduled_at + chrono::Duration::days(1),
        };

        let create = CreateJob {
            account_id: job.account_id,
            media_path: job.media_path.clone(),
            caption: job.caption.clone(),
            scheduled_at: next,
            repeat_type: Some(repeat),
            repeat_days: Some(days),
        };
        match self.jobs.create(create).await {
            Ok(successor) => {
                debug!(job_id = %job.id, next_id = %successor.id, "Queued repeat occurrence");
            }
            Err(e) => error!(job_id = %job.id, "Failed to queue repeat occurrence: {}", e),
        }
    }

    async fn fail_job(&self, job: &Job, reason: &str) {
        error!(job_id = %job.id, reason, "Scheduled post failed");
        if let Err(e) = self.jobs.mark_failed(job.id).await {
            error!(job_id = %job.id, "Failed to mark job failed: {}", e);
        }
        self.activity
            .record(
                Severity::Error,
                "scheduled_post",
                format!("Scheduled post failed: {}", reason),
                Some(job.account_id),
                None,
            )
            .await;
        self.bus.notify(
            Severity::Error,
            "Post failed",
            format!("Scheduled post failed: {}", reason),
            Some(job.account_id),
        );
    }
}

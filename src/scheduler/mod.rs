//! Cooperative job scheduler
//!
//! Driven once per host tick. Keeps a small pool of periodic jobs, decides
//! how many are due and affordable, runs them in priority order and lets each
//! job pick its next due time. Under load the scheduler catches up by batching
//! more jobs per tick instead of falling further behind.

pub mod job;

pub use job::{JobId, ScheduledJob};

use crate::core::config::SchedulerConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::Timestamp;

/// What a job wants after it ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Run again at the given time
    Reschedule(Timestamp),
    /// Inconsistent state detected: reschedule this job and skip the rest of the tick
    AbortTick(Timestamp),
}

/// Executes jobs on behalf of the scheduler
pub trait JobRunner {
    /// Run one job. `wakeups` lets a job pull other jobs earlier.
    ///
    /// Errors are invariant violations and stop the player.
    fn run_job(
        &mut self,
        job: JobId,
        now: Timestamp,
        wakeups: &mut Vec<(JobId, Timestamp)>,
    ) -> Result<JobOutcome>;
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs executed, in execution order
    pub executed: Vec<JobId>,
    /// How late the earliest job was (negative: nothing due)
    pub delay: i64,
    pub aborted: bool,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    config: SchedulerConfig,
    /// Rolling count of delayed ticks; punctual ticks decrement it
    delayed_ticks: u32,
    executed_total: u64,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            jobs: Vec::new(),
            config,
            delayed_ticks: 0,
            executed_total: 0,
        }
    }

    /// Scheduler with every job due at `start`
    pub fn with_all_jobs(config: SchedulerConfig, start: Timestamp) -> Self {
        let mut scheduler = Self::new(config);
        scheduler.jobs = JobId::ALL
            .iter()
            .map(|id| ScheduledJob::new(*id, start))
            .collect();
        scheduler
    }

    pub fn add(&mut self, id: JobId, due_time: Timestamp) -> Result<()> {
        if self.jobs.iter().any(|j| j.id == id) {
            return Err(CoreError::DuplicateJob(id));
        }
        self.jobs.push(ScheduledJob::new(id, due_time));
        Ok(())
    }

    pub fn reschedule(&mut self, id: JobId, due_time: Timestamp) -> Result<()> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(CoreError::UnknownJob(id))?;
        job.due_time = due_time;
        Ok(())
    }

    pub fn due_time(&self, id: JobId) -> Option<Timestamp> {
        self.jobs.iter().find(|j| j.id == id).map(|j| j.due_time)
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn executed_total(&self) -> u64 {
        self.executed_total
    }

    pub fn max_jobs_per_tick(&self) -> usize {
        self.config.max_jobs_per_tick
    }

    /// One backward pass of adjacent swaps.
    ///
    /// The pool is nearly sorted between ticks; a backward pass is enough to
    /// bring the earliest job to the front.
    fn bubble_pass(&mut self) {
        for i in (1..self.jobs.len()).rev() {
            let (a, b) = (&self.jobs[i - 1], &self.jobs[i]);
            if (b.due_time, b.priority) < (a.due_time, a.priority) {
                self.jobs.swap(i - 1, i);
            }
        }
    }

    /// Number of jobs to run for the given delay
    pub fn batch_size(&self, delay: u64) -> usize {
        let units = delay as f64 / self.config.catchup_unit_ms as f64;
        (units.sqrt() as usize).clamp(1, self.config.max_jobs_per_tick)
    }

    pub fn tick(&mut self, now: Timestamp, runner: &mut impl JobRunner) -> Result<TickReport> {
        let mut report = TickReport::default();
        self.bubble_pass();
        let Some(first) = self.jobs.first() else {
            return Ok(report);
        };
        report.delay = now as i64 - first.due_time as i64;
        if report.delay < 0 {
            return Ok(report);
        }
        let delay = report.delay as u64;
        self.track_delay(delay);

        // Collect due jobs; each pop is parked past `now` so it is not taken twice
        let jobs_to_run = self.batch_size(delay);
        let mut collected: Vec<(JobId, u8, Timestamp)> = Vec::with_capacity(jobs_to_run);
        while collected.len() < jobs_to_run {
            let Some(front) = self.jobs.first_mut() else {
                break;
            };
            if front.due_time > now {
                break;
            }
            collected.push((front.id, front.priority, front.due_time));
            front.due_time = now + 1;
            self.bubble_pass();
        }
        collected.sort_by_key(|(id, priority, _)| (*priority, *id));

        let mut wakeups = Vec::new();
        for (index, (id, _, _)) in collected.iter().enumerate() {
            let outcome = runner.run_job(*id, now, &mut wakeups)?;
            report.executed.push(*id);
            self.executed_total += 1;
            let (next, abort) = match outcome {
                JobOutcome::Reschedule(at) => (at, false),
                JobOutcome::AbortTick(at) => (at, true),
            };
            self.reschedule(*id, next.max(now + 1))?;
            if abort {
                tracing::debug!("{} aborted the tick", id.label());
                for (skipped, _, original) in &collected[index + 1..] {
                    self.reschedule(*skipped, *original)?;
                }
                report.aborted = true;
                break;
            }
        }

        for (id, at) in wakeups {
            if report.executed.contains(&id) {
                continue;
            }
            if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
                job.due_time = job.due_time.min(at.max(now));
            }
        }

        Ok(report)
    }

    fn track_delay(&mut self, delay: u64) {
        if delay > self.config.delay_warning_ms {
            self.delayed_ticks += 1;
        } else {
            self.delayed_ticks = self.delayed_ticks.saturating_sub(1);
        }
        if self.delayed_ticks >= self.config.delay_warning_count {
            tracing::warn!(
                "decision core persistently delayed: last delay {} ms over {} ticks",
                delay,
                self.delayed_ticks
            );
            self.delayed_ticks = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reschedules every job a fixed interval later
    struct Recorder {
        interval: u64,
        ran: Vec<JobId>,
        abort_on: Option<JobId>,
    }

    impl Recorder {
        fn new(interval: u64) -> Self {
            Self {
                interval,
                ran: Vec::new(),
                abort_on: None,
            }
        }
    }

    impl JobRunner for Recorder {
        fn run_job(
            &mut self,
            job: JobId,
            now: Timestamp,
            _wakeups: &mut Vec<(JobId, Timestamp)>,
        ) -> Result<JobOutcome> {
            self.ran.push(job);
            if self.abort_on == Some(job) {
                return Ok(JobOutcome::AbortTick(now + self.interval));
            }
            Ok(JobOutcome::Reschedule(now + self.interval))
        }
    }

    #[test]
    fn test_nothing_due() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::RoadCheck, 5_000).unwrap();
        let mut runner = Recorder::new(1_000);
        let report = scheduler.tick(1_000, &mut runner).unwrap();
        assert!(report.executed.is_empty());
        assert_eq!(report.delay, -4_000);
    }

    #[test]
    fn test_punctual_tick_runs_one_job() {
        let mut scheduler = Scheduler::with_all_jobs(SchedulerConfig::default(), 1_000);
        let mut runner = Recorder::new(1_000);
        let report = scheduler.tick(1_000, &mut runner).unwrap();
        assert_eq!(report.executed.len(), 1);
    }

    #[test]
    fn test_batch_size_grows_with_delay() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.batch_size(0), 1);
        assert_eq!(scheduler.batch_size(2_000), 2);
        assert_eq!(scheduler.batch_size(4_500), 3);
        assert_eq!(scheduler.batch_size(60_000), 4);
    }

    #[test]
    fn test_collected_jobs_run_in_priority_order() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::PrintStats, 0).unwrap();
        scheduler.add(JobId::RefreshBuildable, 100).unwrap();
        scheduler.add(JobId::CheckEconomies, 200).unwrap();
        scheduler.add(JobId::RoadCheck, 300).unwrap();
        let mut runner = Recorder::new(1_000);
        let report = scheduler.tick(20_000, &mut runner).unwrap();
        assert_eq!(
            report.executed,
            vec![
                JobId::CheckEconomies,
                JobId::RoadCheck,
                JobId::RefreshBuildable,
                JobId::PrintStats
            ]
        );
    }

    #[test]
    fn test_abort_restores_skipped_jobs() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::CheckEconomies, 0).unwrap();
        scheduler.add(JobId::ConstructBuilding, 10).unwrap();
        let mut runner = Recorder::new(1_000);
        runner.abort_on = Some(JobId::CheckEconomies);
        let report = scheduler.tick(8_000, &mut runner).unwrap();
        assert!(report.aborted);
        assert_eq!(report.executed, vec![JobId::CheckEconomies]);
        assert_eq!(scheduler.due_time(JobId::ConstructBuilding), Some(10));
        assert_eq!(scheduler.due_time(JobId::CheckEconomies), Some(9_000));
    }

    #[test]
    fn test_due_time_always_advances() {
        struct Lazy;
        impl JobRunner for Lazy {
            fn run_job(
                &mut self,
                _job: JobId,
                _now: Timestamp,
                _wakeups: &mut Vec<(JobId, Timestamp)>,
            ) -> Result<JobOutcome> {
                Ok(JobOutcome::Reschedule(0))
            }
        }
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::RoadCheck, 500).unwrap();
        scheduler.tick(1_000, &mut Lazy).unwrap();
        assert_eq!(scheduler.due_time(JobId::RoadCheck), Some(1_001));
    }

    #[test]
    fn test_wakeup_pulls_other_job_earlier() {
        struct Waker;
        impl JobRunner for Waker {
            fn run_job(
                &mut self,
                job: JobId,
                now: Timestamp,
                wakeups: &mut Vec<(JobId, Timestamp)>,
            ) -> Result<JobOutcome> {
                if job == JobId::ConstructBuilding {
                    wakeups.push((JobId::CheckEconomies, now));
                }
                Ok(JobOutcome::Reschedule(now + 5_000))
            }
        }
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::ConstructBuilding, 0).unwrap();
        scheduler.add(JobId::CheckEconomies, 60_000).unwrap();
        scheduler.tick(100, &mut Waker).unwrap();
        assert_eq!(scheduler.due_time(JobId::CheckEconomies), Some(100));
    }

    #[test]
    fn test_duplicate_and_unknown_jobs() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add(JobId::RoadCheck, 0).unwrap();
        assert!(matches!(
            scheduler.add(JobId::RoadCheck, 0),
            Err(CoreError::DuplicateJob(JobId::RoadCheck))
        ));
        assert!(matches!(
            scheduler.reschedule(JobId::PrintStats, 0),
            Err(CoreError::UnknownJob(JobId::PrintStats))
        ));
    }

    #[test]
    fn test_runner_error_propagates() {
        struct Broken;
        impl JobRunner for Broken {
            fn run_job(
                &mut self,
                job: JobId,
                _now: Timestamp,
                _wakeups: &mut Vec<(JobId, Timestamp)>,
            ) -> Result<JobOutcome> {
                Err(CoreError::UnknownJob(job))
            }
        }
        let mut scheduler = Scheduler::with_all_jobs(SchedulerConfig::default(), 0);
        assert!(scheduler.tick(0, &mut Broken).is_err());
    }
}

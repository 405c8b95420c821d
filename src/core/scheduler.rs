//! # Poll Scheduler
//!
//! Owns the periodic jobs that keep the UI fresh: conversation refresh,
//! history refresh, and the recording clock. Each job is a tokio task keyed
//! by name. Registering a name again replaces the previous job, and every
//! job is aborted when the scheduler is dropped, so a view that goes away
//! never leaves an orphaned timer behind.
//!
//! Views only say *what* should be refreshed and *how often*. Replacing
//! polling with server push means replacing this module, not the views.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Default)]
pub struct PollScheduler {
    jobs: HashMap<&'static str, AbortHandle>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` now and then every `period` until cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, Instant::now(), period, job);
    }

    /// Like [`every`](Self::every), but the first run waits one `period`.
    pub fn every_after<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, Instant::now() + period, period, job);
    }

    fn spawn<F, Fut>(&mut self, name: &'static str, start: Instant, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(name);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                job().await;
            }
        });
        debug!("Poll job '{}' scheduled every {:?}", name, period);
        self.jobs.insert(name, handle.abort_handle());
    }

    /// Stop a job. Returns whether one was running.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.jobs.remove(name) {
            Some(handle) => {
                handle.abort();
                debug!("Poll job '{}' cancelled", name);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.jobs.drain() {
            handle.abort();
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::io;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::repository::RepositoryError;

type ApplyFn<J> = dyn Fn(Vec<J>) -> Result<(), RepositoryError> + Send + Sync;

#[derive(Debug)]
struct WritebackState<J> {
    pending: Vec<J>,
    in_flight: bool,
    shutdown: bool,
    written: u64,
}

impl<J> Default for WritebackState<J> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            in_flight: false,
            shutdown: false,
            written: 0,
        }
    }
}

struct WritebackInner<J> {
    state: Mutex<WritebackState<J>>,
    cv: Condvar,
}

impl<J> WritebackInner<J> {
    fn new() -> Self {
        Self {
            state: Mutex::new(WritebackState::default()),
            cv: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WritebackState<J>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, WritebackState<J>>) -> MutexGuard<'a, WritebackState<J>> {
        self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background writer for workspace index changes that must not block the caller.
///
/// Jobs are applied in scheduling order. Jobs queued while a batch is in flight are handed
/// to the next batch together, so a burst of jobs costs one write. No job replaces another.
pub(crate) struct IndexWriteback<J> {
    inner: Arc<WritebackInner<J>>,
    worker: Option<JoinHandle<()>>,
}

impl<J> fmt::Debug for IndexWriteback<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexWriteback").finish_non_exhaustive()
    }
}

impl<J: Send + 'static> IndexWriteback<J> {
    /// Starts the worker. `apply` receives every job queued since the previous batch.
    pub(crate) fn spawn<F>(apply: F) -> io::Result<Self>
    where
        F: Fn(Vec<J>) -> Result<(), RepositoryError> + Send + Sync + 'static,
    {
        let apply: Arc<ApplyFn<J>> = Arc::new(apply);
        let inner = Arc::new(WritebackInner::new());
        let worker = std::thread::Builder::new()
            .name("zonemap-index-writeback".to_owned())
            .spawn({
                let inner = inner.clone();
                move || run_worker(inner, apply)
            })?;

        Ok(Self {
            inner,
            worker: Some(worker),
        })
    }

    pub(crate) fn schedule(&self, job: J) {
        let mut state = self.inner.lock();
        state.pending.push(job);
        if state.pending.len() > 1 {
            debug!(queued = state.pending.len(), "batched pending workspace index job");
        }
        self.inner.cv.notify_all();
    }

    /// Blocks until every scheduled job has been applied (or failed).
    pub(crate) fn flush(&self) {
        let mut state = self.inner.lock();
        while !state.pending.is_empty() || state.in_flight {
            state = self.inner.wait(state);
        }
    }

    /// Number of jobs the worker has applied successfully.
    pub(crate) fn written(&self) -> u64 {
        self.inner.lock().written
    }
}

impl<J> Drop for IndexWriteback<J> {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.shutdown = true;
            self.inner.cv.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker<J>(inner: Arc<WritebackInner<J>>, apply: Arc<ApplyFn<J>>) {
    loop {
        let batch = {
            let mut state = inner.lock();
            loop {
                if !state.pending.is_empty() {
                    state.in_flight = true;
                    break mem::take(&mut state.pending);
                }
                if state.shutdown {
                    return;
                }
                state = inner.wait(state);
            }
        };

        let jobs = batch.len() as u64;
        let result = apply(batch);
        if let Err(err) = &result {
            warn!(error = %err, jobs, "asynchronous workspace index update failed");
        }

        let mut state = inner.lock();
        state.in_flight = false;
        if result.is_ok() {
            state.written += jobs;
        }
        inner.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::IndexWriteback;
    use crate::store::repository::RepositoryError;
    use crate::store::StoreError;

    #[test]
    fn flush_waits_for_scheduled_jobs() {
        let applied = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let writeback = IndexWriteback::spawn({
            let applied = applied.clone();
            move |jobs: Vec<&'static str>| {
                applied.lock().unwrap().extend(jobs);
                Ok(())
            }
        })
        .unwrap();

        writeback.schedule("W1");
        writeback.flush();

        assert_eq!(*applied.lock().unwrap(), vec!["W1"]);
        assert_eq!(writeback.written(), 1);
    }

    #[test]
    fn every_scheduled_job_is_applied_in_order() {
        let applied = Arc::new(Mutex::new(Vec::<u32>::new()));
        let writeback = IndexWriteback::spawn({
            let applied = applied.clone();
            move |jobs: Vec<u32>| {
                applied.lock().unwrap().extend(jobs);
                Ok(())
            }
        })
        .unwrap();

        for job in 0..100 {
            writeback.schedule(job);
        }
        writeback.flush();

        assert_eq!(*applied.lock().unwrap(), (0..100).collect::<Vec<_>>());
        assert_eq!(writeback.written(), 100);
    }

    #[test]
    fn failed_batches_are_not_counted() {
        let writeback = IndexWriteback::spawn(|_: Vec<()>| {
            Err(RepositoryError::Storage(StoreError::Aborted {
                reason: "test".to_owned(),
            }))
        })
        .unwrap();

        writeback.schedule(());
        writeback.flush();
        assert_eq!(writeback.written(), 0);
    }

    #[test]
    fn flush_without_work_returns_immediately() {
        let writeback = IndexWriteback::spawn(|_: Vec<()>| Ok(())).unwrap();
        writeback.flush();
        assert_eq!(writeback.written(), 0);
    }
}

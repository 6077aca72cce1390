// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `Scheduler`: the single-threaded cooperative executor that serialises all
//! mutation of Streamer state and session callbacks (§5). Capture threads
//! and socket I/O hand work to it across a suspension point; between
//! suspension points it runs to completion.
//!
//! The host binary may still run a multi-threaded runtime for accepting
//! connections, but the `Streamer` actor and every `SlimProtoSession` /
//! `HttpStreamingSession` task are spawned onto this dedicated runtime, so
//! their shared state is only ever touched from one thread.

use std::future::Future;

/// A dedicated current-thread Tokio runtime dedicated to CORE state.
pub struct Scheduler {
    runtime: tokio::runtime::Runtime,
}

impl Scheduler {
    /// Builds a new scheduler backed by a current-thread Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying runtime fails to initialise
    /// (e.g. the process cannot create its reactor).
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    /// A cloneable handle for spawning further work onto this executor from
    /// other threads (e.g. the acceptor loop handing off a new connection).
    #[must_use]
    pub fn handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Schedules `future` without waiting for it to resolve.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Drives `future` to completion on this executor, blocking the calling
    /// thread. Typically called once by the host process's entrypoint with a
    /// future that resolves only on shutdown.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn spawned_work_runs_and_block_on_waits_for_it() {
        let scheduler = Scheduler::new().expect("scheduler builds");
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let handle = scheduler.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });
        scheduler.block_on(handle).expect("task completes");

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn handle_can_spawn_from_outside_the_scheduler_thread() {
        let scheduler = Scheduler::new().expect("scheduler builds");
        let handle = scheduler.handle();

        let result = std::thread::spawn(move || {
            let join = handle.spawn(async { 42 });
            handle.block_on(join)
        })
        .join()
        .expect("spawning thread completes");

        assert_eq!(result.expect("task completes"), 42);
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Hot reload of the catalog.
//!
//! The manager compares the catalog file's [`SourceMarker`] against the
//! marker of the last successful build. When it differs, a complete new
//! generation is built off to the side and published with one atomic swap.
//! A failed build is logged, the previous generation keeps serving, and the
//! build is attempted again on every poll until one succeeds.
//!
//! ```text
//! Idle ──change──► Building ──ok──► Idle
//!                    ▲    │
//!                    │    └──error──► Failed
//!                    └──next poll───────┘
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, tick, Sender};

use super::generation::{Generation, SourceMarker};
use super::SchemaRegistry;
use crate::core::{RegistryError, Result};

/// Reload state as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Building,
    Failed,
}

impl fmt::Display for ReloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Building => write!(f, "building"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one poll.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The catalog file did not change.
    Unchanged,
    /// A new generation with this number was published.
    Reloaded(u64),
    /// The rebuild failed; the previous generation is still current.
    Failed(RegistryError),
}

#[derive(Debug)]
struct Progress {
    state: ReloadState,
    /// Marker of the catalog behind the current generation.
    baseline: Option<SourceMarker>,
}

/// Watches the catalog file of one registry.
pub struct ReloadManager {
    registry: Arc<SchemaRegistry>,
    progress: Mutex<Progress>,
    // serializes builds between the background thread and `force`
    build_lock: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReloadManager {
    /// Create a manager whose baseline is the registry's current generation.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        let baseline = registry.snapshot().marker();
        Self {
            registry,
            progress: Mutex::new(Progress {
                state: ReloadState::Idle,
                baseline,
            }),
            build_lock: Mutex::new(()),
        }
    }

    /// Registry this manager publishes into.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Current state.
    pub fn state(&self) -> ReloadState {
        lock(&self.progress).state
    }

    /// Rebuild if the catalog file changed since the last successful build.
    pub fn poll_once(&self) -> ReloadOutcome {
        let _build = lock(&self.build_lock);
        let path = self.registry.catalog_path();

        let marker = match SourceMarker::read(path) {
            Ok(marker) => marker,
            Err(e) => {
                let err = RegistryError::catalog_build(path.display().to_string(), e.to_string());
                return self.fail(err);
            }
        };

        {
            let mut progress = lock(&self.progress);
            if progress.baseline == Some(marker) {
                // the file is back to what the current generation was built from
                progress.state = ReloadState::Idle;
                return ReloadOutcome::Unchanged;
            }
        }

        tracing::debug!(path = %path.display(), "catalog changed");
        self.rebuild(Some(marker))
    }

    /// Rebuild unconditionally.
    pub fn force(&self) -> ReloadOutcome {
        let _build = lock(&self.build_lock);
        let marker = SourceMarker::read(self.registry.catalog_path()).ok();
        self.rebuild(marker)
    }

    fn rebuild(&self, observed: Option<SourceMarker>) -> ReloadOutcome {
        lock(&self.progress).state = ReloadState::Building;

        let number = self.registry.snapshot().number() + 1;
        match Generation::build(
            self.registry.catalog_path(),
            self.registry.root_directory(),
            number,
        ) {
            Ok(generation) => {
                let baseline = generation.marker().or(observed);
                self.registry.publish(generation);
                let mut progress = lock(&self.progress);
                progress.state = ReloadState::Idle;
                progress.baseline = baseline;
                ReloadOutcome::Reloaded(number)
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&self, err: RegistryError) -> ReloadOutcome {
        tracing::error!(
            path = %self.registry.catalog_path().display(),
            generation = self.registry.snapshot().number(),
            error = %err,
            "catalog reload failed, keeping previous generation"
        );
        lock(&self.progress).state = ReloadState::Failed;
        ReloadOutcome::Failed(err)
    }

    /// Poll on a background thread every `interval`, starting after
    /// `initial_delay`. The thread stops when the handle is dropped.
    pub fn spawn(
        self: Arc<Self>,
        interval: Duration,
        initial_delay: Duration,
    ) -> Result<ReloadHandle> {
        let (shutdown, stop) = bounded::<()>(0);

        let thread = std::thread::Builder::new()
            .name("schemacodec-reload".into())
            .spawn(move || {
                let stopped = select! {
                    recv(stop) -> _ => true,
                    recv(after(initial_delay)) -> _ => false,
                };
                if stopped {
                    return;
                }

                tracing::info!(
                    path = %self.registry.catalog_path().display(),
                    interval_ms = interval.as_millis() as u64,
                    "catalog watcher started"
                );
                let ticker = tick(interval);
                loop {
                    self.poll_once();
                    let stopped = select! {
                        recv(stop) -> _ => true,
                        recv(ticker) -> _ => false,
                    };
                    if stopped {
                        break;
                    }
                }
                tracing::debug!("catalog watcher stopped");
            })?;

        Ok(ReloadHandle {
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

impl fmt::Debug for ReloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadManager")
            .field("catalog_path", &self.registry.catalog_path())
            .field("state", &self.state())
            .finish()
    }
}

/// Owner of the background reload thread.
#[derive(Debug)]
pub struct ReloadHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReloadHandle {
    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        // dropping the sender wakes the thread's select
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("catalog watcher thread panicked");
            }
        }
    }
}

impl Drop for ReloadHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

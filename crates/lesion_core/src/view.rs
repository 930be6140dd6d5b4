//! State behind the upload-and-predict screen.
//!
//! One request runs at a time on a worker thread. Every submission gets a
//! generation number; results from anything but the latest generation are
//! dropped when they arrive.

use crate::{Banner, Classifier, PredictError, Prediction, SelectedFile};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// What `submit` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// No file was selected; the error is already in place.
    Rejected,
    /// A request with this generation is in flight.
    Started(u64),
    /// The worker could not be started; the error is already in place.
    Failed,
}

struct Settled {
    generation: u64,
    result: Result<Prediction, PredictError>,
}

pub struct UploadView {
    selected: Option<SelectedFile>,
    outcome: Option<Prediction>,
    busy: bool,
    generation: u64,
    preview_revision: u64,
    tx: Sender<Settled>,
    rx: Receiver<Settled>,
}

impl Default for UploadView {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadView {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            selected: None,
            outcome: None,
            busy: false,
            generation: 0,
            preview_revision: 0,
            tx,
            rx,
        }
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn outcome(&self) -> Option<&Prediction> {
        self.outcome.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Changes whenever the selected file does; the preview is stale when it
    /// was built for another revision.
    pub fn preview_revision(&self) -> u64 {
        self.preview_revision
    }

    pub fn can_submit(&self) -> bool {
        !self.busy && self.selected.is_some()
    }

    pub fn banner(&self, malignant_label: &str) -> Option<Banner> {
        self.outcome
            .as_ref()
            .map(|p| Banner::from_prediction(p, malignant_label))
    }

    /// Replaces (or clears) the selected file and drops any result. A request
    /// still in flight is abandoned.
    pub fn select_file(&mut self, file: Option<SelectedFile>) {
        if self.busy {
            tracing::debug!("Abandoning request {} after file change", self.generation);
            self.generation += 1;
            self.busy = false;
        }
        self.preview_revision += 1;
        self.outcome = None;
        self.selected = file;
    }

    /// Sends the selected file to `classifier` on a worker thread. `notify`
    /// runs on that thread once the result is ready to be picked up by
    /// [`UploadView::poll`].
    pub fn submit<F>(&mut self, classifier: Arc<dyn Classifier>, notify: F) -> Submission
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(file) = self.selected.clone() else {
            self.outcome = Some(Prediction::from_error(&PredictError::NoFileSelected));
            return Submission::Rejected;
        };

        self.generation += 1;
        let generation = self.generation;
        self.busy = true;
        self.outcome = None;
        tracing::info!(
            "Submitting {} ({} bytes, {}) as request {generation}",
            file.name(),
            file.len(),
            file.mime()
        );

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("predict-{generation}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(&file)))
                    .unwrap_or_else(|_| {
                        Err(PredictError::RequestFailed("classifier panicked".into()))
                    });
                // The view may be gone already; nothing left to report to.
                let _ = tx.send(Settled { generation, result });
                notify();
            })
            .map(drop);
        self.after_spawn(generation, spawned)
    }

    fn after_spawn(&mut self, generation: u64, spawned: io::Result<()>) -> Submission {
        match spawned {
            Ok(()) => Submission::Started(generation),
            Err(e) => {
                self.settle(Err(PredictError::RequestFailed(format!(
                    "cannot start worker: {e}"
                ))));
                Submission::Failed
            }
        }
    }

    /// Applies every result that has arrived. Returns true when the visible
    /// state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(settled) => changed |= self.apply(settled),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Blocks until the current request settles.
    pub fn wait(&mut self) {
        while self.busy {
            match self.rx.recv() {
                Ok(settled) => {
                    self.apply(settled);
                }
                Err(_) => break,
            }
        }
    }

    /// Like [`UploadView::wait`] but gives up after `timeout`. Returns whether
    /// the view is idle.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.busy {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(settled) => {
                    self.apply(settled);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        !self.busy
    }

    fn apply(&mut self, settled: Settled) -> bool {
        if !self.busy || settled.generation != self.generation {
            tracing::debug!(
                "Discarding result of request {} (current {})",
                settled.generation,
                self.generation
            );
            return false;
        }
        self.settle(settled.result);
        true
    }

    fn settle(&mut self, result: Result<Prediction, PredictError>) {
        self.busy = false;
        let prediction = match result {
            Ok(prediction) => {
                tracing::info!("Request {} finished: {prediction:?}", self.generation);
                prediction
            }
            Err(err) => {
                if let PredictError::RequestFailed(reason) = &err {
                    tracing::warn!("Request {} failed: {reason}", self.generation);
                }
                Prediction::from_error(&err)
            }
        };
        self.outcome = Some(prediction);
    }
}

//! Background indexing worker.
//!
//! Updates run on one dedicated thread so callers (the CLI, the watcher)
//! never block on OCR. Each submitted job gets its own bounded progress
//! channel; the last event of every job is [`ProgressEvent::Finished`].

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::error::SearchError;
use crate::manager::{IndexManager, UpdateReport};
use crate::progress::{CancelToken, ChannelReporter, LatestProgress, ProgressEvent};

/// Events buffered per job before the indexing thread waits for the consumer.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

const WORKER_THREAD_NAME: &str = "imgsearch-indexer";

struct JobRequest {
    folder: PathBuf,
    force: bool,
    cancel: CancelToken,
    events: SyncSender<ProgressEvent>,
}

/// Owns the indexing thread. Jobs run one at a time in submission order.
/// Dropping the worker lets queued jobs finish, then joins the thread.
pub struct IndexWorker {
    tx: Option<Sender<JobRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl IndexWorker {
    pub fn start(manager: Arc<IndexManager>) -> Result<Self, SearchError> {
        let (tx, rx) = mpsc::channel::<JobRequest>();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_jobs(&manager, rx))?;
        debug!(thread = WORKER_THREAD_NAME, "Index worker started");
        Ok(Self { tx: Some(tx), handle: Some(handle) })
    }

    /// Queue an update of `folder`.
    pub fn submit(&self, folder: impl Into<PathBuf>, force: bool) -> Result<IndexJob, SearchError> {
        self.submit_with_cancel(folder, force, CancelToken::new())
    }

    /// Queue an update that stops when `cancel` fires. The token may be
    /// shared, e.g. with a Ctrl-C handler.
    pub fn submit_with_cancel(
        &self,
        folder: impl Into<PathBuf>,
        force: bool,
        cancel: CancelToken,
    ) -> Result<IndexJob, SearchError> {
        let folder = folder.into();
        let (events_tx, events_rx) = mpsc::sync_channel(PROGRESS_CHANNEL_CAPACITY);
        let request = JobRequest {
            folder: folder.clone(),
            force,
            cancel: cancel.clone(),
            events: events_tx,
        };
        let tx = self.tx.as_ref().ok_or(SearchError::WorkerStopped)?;
        tx.send(request).map_err(|_| SearchError::WorkerStopped)?;
        Ok(IndexJob { folder, events: events_rx, cancel })
    }

    /// Finish queued jobs and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Index worker thread panicked");
            }
        }
    }
}

impl Drop for IndexWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for IndexWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

fn run_jobs(manager: &IndexManager, rx: Receiver<JobRequest>) {
    for job in rx {
        info!(folder = %job.folder.display(), force = job.force, "Index job started");
        let reporter = ChannelReporter::new(job.events.clone());
        let result = manager.update_index_with_cancel(&job.folder, &reporter, job.force, &job.cancel);
        if let Err(ref e) = result {
            match e {
                SearchError::Cancelled => info!(folder = %job.folder.display(), "Index job cancelled"),
                _ => error!(folder = %job.folder.display(), error = %e, "Index job failed"),
            }
        }
        drop(reporter);
        // Receiver may already be gone if the caller stopped listening.
        let _ = job.events.send(ProgressEvent::Finished(result));
    }
    debug!("Index worker stopped");
}

/// Handle to one queued update. The progress channel is bounded: keep
/// draining it (or drop the job) so the indexing thread is not held up.
#[derive(Debug)]
pub struct IndexJob {
    folder: PathBuf,
    events: Receiver<ProgressEvent>,
    cancel: CancelToken,
}

impl IndexJob {
    pub fn folder(&self) -> &std::path::Path {
        &self.folder
    }

    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Request cancellation; takes effect before the next image.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the job finishes.
    pub fn wait(self) -> Result<UpdateReport, SearchError> {
        self.wait_with(|_| {})
    }

    /// Block until the job finishes, calling `on_progress` after every
    /// percent or message event.
    pub fn wait_with(self, mut on_progress: impl FnMut(&LatestProgress)) -> Result<UpdateReport, SearchError> {
        let mut latest = LatestProgress::default();
        while let Ok(event) = self.events.recv() {
            latest.apply(event);
            if let Some(result) = latest.finished.take() {
                return result;
            }
            on_progress(&latest);
        }
        Err(SearchError::WorkerStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FolderIdScheme, Storage};
    use crate::extract::ExtractError;
    use std::fs;
    use std::path::Path;

    fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf, Arc<IndexManager>) {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("scans");
        fs::create_dir(&folder).unwrap();
        for (name, text) in files {
            fs::write(folder.join(name), text).unwrap();
        }
        // The image bytes double as their text.
        let extractor = |p: &Path| -> Result<String, ExtractError> { Ok(fs::read_to_string(p)?) };
        let storage = Storage::with_scheme(tmp.path().join("storage"), FolderIdScheme::Sha1).unwrap();
        (tmp, folder, Arc::new(IndexManager::new(storage, extractor)))
    }

    #[test]
    fn test_submit_and_wait() {
        let (_tmp, folder, manager) = setup(&[("a.png", "invoice 2021"), ("b.png", "receipt")]);
        let worker = IndexWorker::start(Arc::clone(&manager)).unwrap();
        let report = worker.submit(&folder, false).unwrap().wait().unwrap();
        assert_eq!(report.indexed_count(), 2);
        assert_eq!(manager.search(&folder, "receipt", 10).unwrap().len(), 1);
        worker.shutdown();
    }

    #[test]
    fn test_wait_with_reports_progress() {
        let files: Vec<(String, String)> = (0..5).map(|i| (format!("{}.png", i), format!("word{}", i))).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let (_tmp, folder, manager) = setup(&refs);
        let worker = IndexWorker::start(manager).unwrap();

        let mut percents = Vec::new();
        let mut last_message = None;
        let report = worker
            .submit(&folder, false)
            .unwrap()
            .wait_with(|p| {
                percents.push(p.percent);
                last_message = p.message.clone();
            })
            .unwrap();
        assert_eq!(report.indexed_count(), 5);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));
        assert_eq!(last_message.as_deref(), Some("Index updated: scans"));
    }

    #[test]
    fn test_jobs_run_in_order() {
        let (_tmp, folder, manager) = setup(&[("a.png", "alpha")]);
        let worker = IndexWorker::start(manager).unwrap();
        let first = worker.submit(&folder, false).unwrap();
        let second = worker.submit(&folder, false).unwrap();
        assert_eq!(first.wait().unwrap().indexed_count(), 1);
        assert_eq!(second.wait().unwrap().indexed_count(), 0);
    }

    #[test]
    fn test_cancelled_job() {
        let (_tmp, folder, manager) = setup(&[("a.png", "alpha")]);
        let worker = IndexWorker::start(Arc::clone(&manager)).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = worker.submit_with_cancel(&folder, false, cancel).unwrap().wait().unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
        assert!(!manager.is_indexed(&folder));
    }

    #[test]
    fn test_failed_job_reports_error() {
        let (tmp, _folder, manager) = setup(&[]);
        let worker = IndexWorker::start(manager).unwrap();
        let err = worker.submit(tmp.path().join("missing"), false).unwrap().wait().unwrap_err();
        assert!(matches!(err, SearchError::DirNotFound(_)));
    }

    #[test]
    fn test_dropped_job_does_not_stall_worker() {
        let files: Vec<(String, String)> = (0..100).map(|i| (format!("{:03}.png", i), "x".to_string())).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let (_tmp, folder, manager) = setup(&refs);
        let worker = IndexWorker::start(manager).unwrap();
        // More events than the channel holds, nobody listening.
        drop(worker.submit(&folder, false).unwrap());
        let report = worker.submit(&folder, true).unwrap().wait().unwrap();
        assert_eq!(report.indexed_count(), 100);
    }
}

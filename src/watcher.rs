//! Watch mode: re-run the incremental update whenever images in a folder
//! change on disk.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::SearchError;
use crate::is_image_file;
use crate::manager::UpdateReport;
use crate::progress::CancelToken;
use crate::worker::IndexWorker;

/// Default quiet period after the last file event before an update runs.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// True when the event can change the folder's image set.
pub fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_image_file(p))
}

/// Watch `folder` (non-recursively) until `stop` fires.
///
/// Image events are batched: once `debounce_ms` pass without a new event, one
/// update is submitted to `worker` and its result handed to `on_update`.
/// Updates run through the regular change detection, so a batch only
/// re-extracts what actually changed.
pub fn watch_folder(
    worker: &IndexWorker,
    folder: &Path,
    debounce_ms: u64,
    stop: &CancelToken,
    mut on_update: impl FnMut(Result<UpdateReport, SearchError>),
) -> Result<(), SearchError> {
    if !folder.is_dir() {
        return Err(SearchError::DirNotFound(folder.display().to_string()));
    }
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(folder, RecursiveMode::NonRecursive)?;
    info!(folder = %folder.display(), debounce_ms, "Watching folder");

    let debounce = Duration::from_millis(debounce_ms);
    let mut pending = 0usize;
    while !stop.is_cancelled() {
        match rx.recv_timeout(debounce) {
            Ok(Ok(event)) => {
                if is_relevant(&event) {
                    debug!(kind = ?event.kind, paths = ?event.paths, "Image change");
                    pending += 1;
                }
            }
            Ok(Err(e)) => warn!(error = %e, "File watcher error"),
            Err(RecvTimeoutError::Timeout) => {
                if pending == 0 {
                    continue;
                }
                info!(events = pending, "Changes settled, updating index");
                pending = 0;
                let result = worker
                    .submit_with_cancel(folder, false, stop.clone())
                    .and_then(|job| job.wait());
                on_update(result);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(folder = %folder.display(), "Watch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_image_events_are_relevant() {
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), "/s/a.png")));
        assert!(is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/s/a.JPG")));
        assert!(is_relevant(&event(EventKind::Remove(RemoveKind::File), "/s/a.tiff")));
    }

    #[test]
    fn test_other_events_ignored() {
        assert!(!is_relevant(&event(EventKind::Create(CreateKind::File), "/s/notes.txt")));
        assert!(!is_relevant(&event(EventKind::Access(notify::event::AccessKind::Any), "/s/a.png")));
        assert!(!is_relevant(&Event::new(EventKind::Create(CreateKind::File))));
    }

    #[test]
    fn test_missing_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = crate::config::Storage::new(tmp.path().join("storage")).unwrap();
        let manager = std::sync::Arc::new(crate::manager::IndexManager::new(
            storage,
            crate::extract::SidecarExtractor::default(),
        ));
        let worker = IndexWorker::start(manager).unwrap();
        let err = watch_folder(&worker, &tmp.path().join("nope"), 10, &CancelToken::new(), |_| {}).unwrap_err();
        assert!(matches!(err, SearchError::DirNotFound(_)));
    }

    #[test]
    fn test_stops_when_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = crate::config::Storage::new(tmp.path().join("storage")).unwrap();
        let manager = std::sync::Arc::new(crate::manager::IndexManager::new(
            storage,
            crate::extract::SidecarExtractor::default(),
        ));
        let worker = IndexWorker::start(manager).unwrap();
        let stop = CancelToken::new();
        stop.cancel();
        let mut updates = 0;
        watch_folder(&worker, tmp.path(), 10, &stop, |_| updates += 1).unwrap();
        assert_eq!(updates, 0);
    }
}

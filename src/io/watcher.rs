use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::SystemTime;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// The store file plus the write-ahead-log companions a SQLite store keeps
/// beside it. A write may touch only the companions, so all three count.
pub fn store_paths(store: &Path) -> Vec<PathBuf> {
    let mut paths = vec![store.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = store.as_os_str().to_os_string();
        name.push(suffix);
        paths.push(PathBuf::from(name));
    }
    paths
}

/// Most recent modification time across `paths`, ignoring missing files
pub fn latest_mtime(paths: &[PathBuf]) -> Option<SystemTime> {
    paths
        .iter()
        .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
        .max()
}

/// Tracks the modification time of the tracker's on-disk files.
///
/// Polling mtimes is the source of truth. When a notify watcher could be
/// started it only serves as a hint to check early.
pub struct StoreWatcher {
    paths: Vec<PathBuf>,
    _watcher: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<()>,
}

impl StoreWatcher {
    /// Poll-only watcher over `paths`
    pub fn polling(paths: Vec<PathBuf>) -> Self {
        let (_tx, rx) = mpsc::channel();
        StoreWatcher {
            paths,
            _watcher: None,
            rx,
        }
    }

    /// Watch the directories holding `paths` for change hints
    pub fn start(paths: Vec<PathBuf>) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let tracked = paths.clone();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else { return };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                if event.paths.iter().any(|p| tracked.iter().any(|t| p == t)) {
                    let _ = tx.send(());
                }
            },
            Config::default(),
        )?;

        let mut dirs: Vec<&Path> = paths.iter().filter_map(|p| p.parent()).collect();
        dirs.sort();
        dirs.dedup();
        for dir in dirs {
            if dir.is_dir() {
                watcher.watch(dir, RecursiveMode::NonRecursive)?;
            }
        }

        Ok(StoreWatcher {
            paths,
            _watcher: Some(watcher),
            rx,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn latest_mtime(&self) -> Option<SystemTime> {
        latest_mtime(&self.paths)
    }

    /// Drain pending change hints. True if any arrived since the last call.
    pub fn take_hint(&self) -> bool {
        let mut any = false;
        while self.rx.try_recv().is_ok() {
            any = true;
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn companions_sit_beside_the_store() {
        let paths = store_paths(Path::new("/w/.beads/beads.db"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/w/.beads/beads.db"),
                PathBuf::from("/w/.beads/beads.db-wal"),
                PathBuf::from("/w/.beads/beads.db-shm"),
            ]
        );
    }

    #[test]
    fn latest_mtime_ignores_missing_files() {
        let tmp = TempDir::new().unwrap();
        let paths = store_paths(&tmp.path().join("beads.db"));
        assert_eq!(latest_mtime(&paths), None);

        fs::write(&paths[1], "wal").unwrap();
        let wal = fs::metadata(&paths[1]).unwrap().modified().unwrap();
        assert_eq!(latest_mtime(&paths), Some(wal));
    }

    #[test]
    fn picks_the_newest_companion() {
        let tmp = TempDir::new().unwrap();
        let paths = store_paths(&tmp.path().join("beads.db"));
        fs::write(&paths[0], "db").unwrap();
        let old = SystemTime::now() - Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&paths[0])
            .unwrap()
            .set_modified(old)
            .unwrap();
        fs::write(&paths[2], "shm").unwrap();

        let watcher = StoreWatcher::polling(paths.clone());
        let shm = fs::metadata(&paths[2]).unwrap().modified().unwrap();
        assert_eq!(watcher.latest_mtime(), Some(shm));
        assert!(!watcher.take_hint());
    }
}

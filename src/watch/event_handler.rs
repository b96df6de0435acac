// src/watch/event_handler.rs

//! Turning raw `notify` events into compile triggers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::Event;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::fs::FileSystem;
use crate::types::WatchEventKind;
use crate::watch::cache::FileCache;
use crate::watch::hash::{compute_aggregate_hash, HashStore, MemoryHashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, WatchProfile};

/// Map a `notify` event onto `(path, kind)` pairs.
///
/// Access events carry no change and yield nothing. A rename reports the
/// old path as deleted and the new one as added.
pub fn classify_event(event: &Event) -> Vec<(PathBuf, WatchEventKind)> {
    let all = |kind: WatchEventKind| -> Vec<(PathBuf, WatchEventKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    match &event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => all(WatchEventKind::Added),
        EventKind::Remove(_) => all(WatchEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(WatchEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(WatchEventKind::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push((from.clone(), WatchEventKind::Deleted));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((to.clone(), WatchEventKind::Added));
            }
            out
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => all(WatchEventKind::Changed),
    }
}

/// Trailing debounce per watch target.
///
/// Each event pushes the target's deadline to `now + delay`; a target fires
/// once no event arrived for a full delay.
#[derive(Debug, Default)]
pub struct Debouncer {
    deadlines: BTreeMap<usize, Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, profile: usize, now: Instant, delay: Duration) {
        self.deadlines.insert(profile, now + delay);
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return the targets whose deadline has passed, in index order.
    pub fn take_due(&mut self, now: Instant) -> Vec<usize> {
        let due: Vec<usize> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(idx, _)| *idx)
            .collect();
        for idx in &due {
            self.deadlines.remove(idx);
        }
        due
    }
}

/// Matching state shared by the watcher loop.
pub struct ChangeFilter {
    root: PathBuf,
    profiles: Arc<Vec<WatchProfile>>,
    /// Compile outputs, relative to `root`. Never trigger on these.
    ignored: BTreeSet<String>,
    fs: Arc<dyn FileSystem>,
    hash_store: Arc<Mutex<Box<dyn HashStore>>>,
    file_cache: Arc<Mutex<FileCache>>,
}

impl ChangeFilter {
    pub fn new(
        root: impl Into<PathBuf>,
        profiles: Vec<WatchProfile>,
        destinations: &[String],
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let ignored = destinations
            .iter()
            .filter_map(|d| relative_str(Path::new("."), Path::new(d)))
            .collect();
        let hash_store: Box<dyn HashStore> = Box::new(MemoryHashStore::new());
        Self {
            root: root.into(),
            profiles: Arc::new(profiles),
            ignored,
            fs,
            hash_store: Arc::new(Mutex::new(hash_store)),
            file_cache: Arc::new(Mutex::new(FileCache::new())),
        }
    }

    pub fn profiles(&self) -> &[WatchProfile] {
        &self.profiles
    }

    /// Indices of the profiles an event of `kind` on `path` matches.
    pub fn matching_profiles(&self, path: &Path, kind: WatchEventKind) -> Vec<usize> {
        let Some(rel) = relative_str(&self.root, path) else {
            debug!(?path, root = ?self.root, "event outside the watch root; ignoring");
            return Vec::new();
        };

        if self.ignored.contains(&rel) {
            debug!(path = %rel, "event on a compile destination; ignoring");
            return Vec::new();
        }

        let matched: Vec<usize> = self
            .profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches(&rel, kind))
            .map(|(idx, _)| idx)
            .collect();

        if !matched.is_empty() {
            info!("File \"{rel}\" {kind}.");
            if let Ok(mut cache) = self.file_cache.lock() {
                cache.invalidate(path);
            }
        }
        matched
    }

    /// Seed the hash store so the first real change is compared against
    /// the content at startup.
    pub async fn prime_hashes(&self) {
        for idx in 0..self.profiles.len() {
            if self.profiles[idx].use_hash() {
                self.content_changed(idx).await;
            }
        }
    }

    /// Whether a due target should fire.
    ///
    /// Without `use_hash` it always does. With it, only when the aggregate
    /// content hash of the target's files differs from the last one seen.
    pub async fn content_changed(&self, idx: usize) -> bool {
        let Some(profile) = self.profiles.get(idx) else {
            return false;
        };
        if !profile.use_hash() {
            return true;
        }

        let root = self.root.clone();
        let profiles = Arc::clone(&self.profiles);
        let fs = Arc::clone(&self.fs);
        let hash_store = Arc::clone(&self.hash_store);
        let file_cache = Arc::clone(&self.file_cache);

        tokio::task::spawn_blocking(move || {
            let profile = &profiles[idx];
            let files = match collect_matching_files(fs.as_ref(), &root, profile) {
                Ok(files) => files,
                Err(err) => {
                    warn!(watch_target = %profile.name(), error = %err, "failed to collect watched files; triggering anyway");
                    return true;
                }
            };

            let mut entries = Vec::with_capacity(files.len());
            {
                let Ok(mut cache) = file_cache.lock() else {
                    warn!("file cache mutex poisoned; triggering anyway");
                    return true;
                };
                for file in &files {
                    match cache.get_or_compute(fs.as_ref(), file) {
                        Ok(hash) => entries.push(format!("{}:{hash}", file.display())),
                        Err(err) => {
                            warn!(file = ?file, error = %err, "failed to hash file; triggering anyway");
                            return true;
                        }
                    }
                }
            }
            let new_hash = compute_aggregate_hash(&entries);

            let Ok(mut store) = hash_store.lock() else {
                warn!("hash store mutex poisoned; triggering anyway");
                return true;
            };
            if store.load(profile.name()).as_deref() == Some(new_hash.as_str()) {
                info!(watch_target = %profile.name(), "watched content unchanged; skipping");
                return false;
            }
            store.save(profile.name(), &new_hash);
            true
        })
        .await
        .unwrap_or(true)
    }

    /// Union of the compile tasks of `indices`, in first-seen order.
    pub fn tasks_for(&self, indices: &[usize]) -> Vec<TaskName> {
        let mut tasks: Vec<TaskName> = Vec::new();
        for idx in indices {
            let Some(profile) = self.profiles.get(*idx) else {
                continue;
            };
            for task in profile.tasks() {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }
        tasks
    }
}

/// Fire every target whose debounce has elapsed as one trigger batch.
///
/// Returns `false` once the runtime is gone.
pub async fn flush_due(
    filter: &ChangeFilter,
    debouncer: &mut Debouncer,
    now: Instant,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let mut fired = Vec::new();
    for idx in debouncer.take_due(now) {
        if filter.content_changed(idx).await {
            fired.push(idx);
        }
    }

    let tasks = filter.tasks_for(&fired);
    if tasks.is_empty() {
        return true;
    }

    debug!(?tasks, "watch batch ready");
    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks,
            reason: TriggerReason::FileWatch,
        })
        .await
    {
        warn!("failed to send RuntimeEvent::TasksTriggered: {err}");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut ev = Event::new(kind);
        for p in paths {
            ev = ev.add_path(PathBuf::from(p));
        }
        ev
    }

    fn profile(name: &str, task: &str, use_hash: bool) -> WatchProfile {
        WatchProfile::new(
            name,
            &["nouveau/css/*.less".to_string(), "nouveau/css/*.css".to_string()],
            &[],
            vec![task.to_string()],
            WatchEventKind::ALL.to_vec(),
        )
        .unwrap()
        .with_use_hash(use_hash)
    }

    fn filter(fs: &MockFileSystem, profiles: Vec<WatchProfile>) -> ChangeFilter {
        ChangeFilter::new(
            ".",
            profiles,
            &["nouveau/css/main.css".to_string()],
            Arc::new(fs.clone()),
        )
    }

    #[test]
    fn classifies_event_kinds() {
        let create = event(EventKind::Create(CreateKind::File), &["a.less"]);
        assert_eq!(classify_event(&create), vec![(PathBuf::from("a.less"), WatchEventKind::Added)]);

        let remove = event(EventKind::Remove(RemoveKind::File), &["a.less"]);
        assert_eq!(classify_event(&remove)[0].1, WatchEventKind::Deleted);

        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["a.less"],
        );
        assert_eq!(classify_event(&write)[0].1, WatchEventKind::Changed);

        let access = event(EventKind::Access(notify::event::AccessKind::Any), &["a.less"]);
        assert!(classify_event(&access).is_empty());
    }

    #[test]
    fn rename_both_is_a_delete_and_an_add() {
        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["old.less", "new.less"],
        );
        assert_eq!(
            classify_event(&rename),
            vec![
                (PathBuf::from("old.less"), WatchEventKind::Deleted),
                (PathBuf::from("new.less"), WatchEventKind::Added),
            ]
        );
    }

    #[test]
    fn debouncer_resets_on_each_event() {
        let start = Instant::now();
        let delay = Duration::from_millis(100);
        let mut d = Debouncer::new();

        d.record(0, start, delay);
        d.record(0, start + Duration::from_millis(80), delay);
        assert!(d.take_due(start + Duration::from_millis(120)).is_empty());
        assert_eq!(d.next_deadline(), Some(start + Duration::from_millis(180)));
        assert_eq!(d.take_due(start + Duration::from_millis(180)), vec![0]);
        assert!(d.is_empty());
    }

    #[test]
    fn debouncer_fires_targets_independently() {
        let start = Instant::now();
        let mut d = Debouncer::new();
        d.record(1, start, Duration::from_millis(50));
        d.record(0, start, Duration::from_millis(200));

        assert_eq!(d.take_due(start + Duration::from_millis(60)), vec![1]);
        assert_eq!(d.take_due(start + Duration::from_millis(200)), vec![0]);
    }

    #[test]
    fn destinations_never_match() {
        let fs = MockFileSystem::new();
        let f = filter(&fs, vec![profile("styles", "less:dist", false)]);

        assert_eq!(
            f.matching_profiles(Path::new("nouveau/css/vars.less"), WatchEventKind::Changed),
            vec![0]
        );
        assert!(f
            .matching_profiles(Path::new("nouveau/css/main.css"), WatchEventKind::Changed)
            .is_empty());
    }

    #[test]
    fn tasks_are_merged_across_targets() {
        let fs = MockFileSystem::new();
        let f = filter(
            &fs,
            vec![
                profile("a", "less:dist", false),
                profile("b", "less:dist", false),
                profile("c", "less:admin", false),
            ],
        );
        assert_eq!(f.tasks_for(&[0, 1, 2]), vec!["less:dist", "less:admin"]);
    }

    #[tokio::test]
    async fn unchanged_content_is_skipped_with_use_hash() {
        let fs = MockFileSystem::new();
        fs.add_file("nouveau/css/main.less", "@c: red;");
        let f = filter(&fs, vec![profile("styles", "less:dist", true)]);
        f.prime_hashes().await;

        // Touch without a content change.
        f.matching_profiles(Path::new("nouveau/css/main.less"), WatchEventKind::Changed);
        assert!(!f.content_changed(0).await);

        fs.add_file("nouveau/css/main.less", "@c: blue;");
        f.matching_profiles(Path::new("nouveau/css/main.less"), WatchEventKind::Changed);
        assert!(f.content_changed(0).await);
    }

    #[tokio::test]
    async fn flush_sends_one_batch_for_due_targets() {
        let fs = MockFileSystem::new();
        let f = filter(
            &fs,
            vec![profile("a", "less:dist", false), profile("b", "less:admin", false)],
        );
        let (tx, mut rx) = mpsc::channel(4);
        let start = Instant::now();
        let mut d = Debouncer::new();
        d.record(0, start, Duration::from_millis(10));
        d.record(1, start, Duration::from_millis(10));

        assert!(flush_due(&f, &mut d, start, &tx).await);
        assert!(rx.try_recv().is_err());

        assert!(flush_due(&f, &mut d, start + Duration::from_millis(10), &tx).await);
        match rx.try_recv() {
            Ok(RuntimeEvent::TasksTriggered { tasks, reason }) => {
                assert_eq!(tasks, vec!["less:dist", "less:admin"]);
                assert_eq!(reason, TriggerReason::FileWatch);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

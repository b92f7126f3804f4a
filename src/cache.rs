//! Staleness cache for incremental passes.
//!
//! Remembers, per source path, the modification time the source had when a
//! derivative was last generated from it. A later pass skips the file when
//! its destination still exists and the source mtime is unchanged.
//!
//! # Lifetime
//!
//! The cache lives in memory only. A fresh process starts cold and
//! regenerates everything once; repeated passes in the same process (the
//! `watch` command) then skip unchanged files. The cache is an explicit
//! object owned by the caller, so tests and long-running hosts can
//! [`clear`](MtimeCache::clear) it.
//!
//! ## Keys
//!
//! Records are keyed by source path alone. Two presets reading the same
//! source share one record: after the first preset claims a touched
//! source, the second sees the new mtime already recorded and, if its own
//! destination exists, treats the file as fresh.
//!
//! ## Concurrency
//!
//! Files of one preset are processed in parallel. [`MtimeCache::claim`]
//! performs the check and the record under a single lock, so two workers
//! can never both decide a source is stale.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Verdict for one source/destination pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Destination exists and the source is unchanged since it was generated.
    Fresh,
    /// Destination is missing or the source changed; regenerate.
    Stale,
}

/// Source path → mtime last generated from.
#[derive(Debug, Default)]
pub struct MtimeCache {
    mtimes: Mutex<HashMap<PathBuf, SystemTime>>,
}

impl MtimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, SystemTime>> {
        // Poisoning only means a worker panicked; the map itself is intact.
        self.mtimes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `destination` must be (re)generated from `source`.
    ///
    /// `false` only when the destination exists and the recorded mtime for
    /// `source` equals its current mtime. Does not record anything.
    pub fn needs_generation(&self, source: &Path, destination: &Path) -> io::Result<bool> {
        let current = source_mtime(source)?;
        let map = self.lock();
        Ok(verdict(&map, source, destination, current) == Freshness::Stale)
    }

    /// Check freshness and, when stale, record the source's current mtime
    /// before returning. The caller transforms only on [`Freshness::Stale`].
    pub fn claim(&self, source: &Path, destination: &Path) -> io::Result<Freshness> {
        let current = source_mtime(source)?;
        let mut map = self.lock();
        let freshness = verdict(&map, source, destination, current);
        if freshness == Freshness::Stale {
            map.insert(source.to_path_buf(), current);
        }
        Ok(freshness)
    }

    /// Record the mtime a derivative of `source` was generated from.
    pub fn record(&self, source: &Path, mtime: SystemTime) {
        self.lock().insert(source.to_path_buf(), mtime);
    }

    /// Last recorded mtime for `source`, if any.
    pub fn last_seen(&self, source: &Path) -> Option<SystemTime> {
        self.lock().get(source).copied()
    }

    /// Drop the record for `source`, so the next pass retries it.
    pub fn forget(&self, source: &Path) {
        self.lock().remove(source);
    }

    /// Forget every record. The next pass regenerates everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn source_mtime(source: &Path) -> io::Result<SystemTime> {
    std::fs::metadata(source)?.modified()
}

fn verdict(
    map: &HashMap<PathBuf, SystemTime>,
    source: &Path,
    destination: &Path,
    current: SystemTime,
) -> Freshness {
    if destination.exists() && map.get(source) == Some(&current) {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}

/// Outcome counts for one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub generated: u32,
    pub fresh: u32,
    pub failed: u32,
}

impl PassStats {
    pub fn generated(&mut self) {
        self.generated += 1;
    }

    pub fn fresh(&mut self) {
        self.fresh += 1;
    }

    pub fn failed(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.generated + self.fresh + self.failed
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fresh > 0 {
            write!(
                f,
                "{} generated, {} fresh ({} total)",
                self.generated,
                self.fresh,
                self.total()
            )?;
        } else {
            write!(f, "{} generated", self.generated)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("logo.png");
        let dest = tmp.path().join("out/logo.png");
        fs::write(&source, b"src").unwrap();
        (tmp, source, dest)
    }

    fn write_dest(dest: &Path) {
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(dest, b"dst").unwrap();
    }

    #[test]
    fn cold_cache_needs_generation() {
        let (_tmp, source, dest) = fixture();
        write_dest(&dest);
        let cache = MtimeCache::new();
        assert!(cache.needs_generation(&source, &dest).unwrap());
    }

    #[test]
    fn recorded_and_present_is_fresh() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();

        assert_eq!(cache.claim(&source, &dest).unwrap(), Freshness::Stale);
        write_dest(&dest);
        assert_eq!(cache.claim(&source, &dest).unwrap(), Freshness::Fresh);
        assert!(!cache.needs_generation(&source, &dest).unwrap());
    }

    #[test]
    fn missing_destination_is_stale_even_when_recorded() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();
        cache.claim(&source, &dest).unwrap();
        // Destination was never written.
        assert!(cache.needs_generation(&source, &dest).unwrap());
    }

    #[test]
    fn touched_source_is_stale() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        set_mtime(&source, t0);

        cache.claim(&source, &dest).unwrap();
        write_dest(&dest);
        assert!(!cache.needs_generation(&source, &dest).unwrap());

        set_mtime(&source, t0 + Duration::from_secs(60));
        assert!(cache.needs_generation(&source, &dest).unwrap());
        assert_eq!(cache.claim(&source, &dest).unwrap(), Freshness::Stale);
        assert_eq!(
            cache.last_seen(&source),
            Some(t0 + Duration::from_secs(60))
        );
    }

    #[test]
    fn needs_generation_does_not_record() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();
        cache.needs_generation(&source, &dest).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn claim_records_before_transform() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();
        cache.claim(&source, &dest).unwrap();
        assert_eq!(
            cache.last_seen(&source),
            Some(fs::metadata(&source).unwrap().modified().unwrap())
        );
    }

    #[test]
    fn records_are_shared_across_destinations() {
        let (tmp, source, dest) = fixture();
        let other_dest = tmp.path().join("thumbs/logo.png");
        let cache = MtimeCache::new();

        cache.claim(&source, &dest).unwrap();
        write_dest(&dest);
        write_dest(&other_dest);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.claim(&source, &other_dest).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let cache = MtimeCache::new();
        let result = cache.claim(&tmp.path().join("gone.png"), &tmp.path().join("x.png"));
        assert!(result.is_err());
    }

    #[test]
    fn forget_makes_source_stale_again() {
        let (_tmp, source, dest) = fixture();
        let cache = MtimeCache::new();
        cache.claim(&source, &dest).unwrap();
        write_dest(&dest);
        cache.forget(&source);
        assert_eq!(cache.claim(&source, &dest).unwrap(), Freshness::Stale);
    }

    #[test]
    fn clear_forgets_everything() {
        let (_tmp, source, _dest) = fixture();
        let cache = MtimeCache::new();
        cache.record(&source, SystemTime::now());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.last_seen(&source).is_none());
    }

    #[test]
    fn stats_display() {
        let stats = PassStats {
            generated: 3,
            fresh: 0,
            failed: 0,
        };
        assert_eq!(stats.to_string(), "3 generated");

        let stats = PassStats {
            generated: 1,
            fresh: 4,
            failed: 2,
        };
        assert_eq!(stats.to_string(), "1 generated, 4 fresh (7 total), 2 failed");
    }

    #[test]
    fn stats_counters() {
        let mut stats = PassStats::default();
        stats.generated();
        stats.fresh();
        stats.fresh();
        stats.failed();
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.fresh, 2);
    }
}

//! Disk cache inspection and cleanup.

use std::fs;
use std::io;
use std::path::Path;

use super::function::TEMP_SUFFIX;

/// Minimum digest length for a file to be recognised as a cache entry.
const MIN_DIGEST_LEN: usize = 16;

/// Summary of cache files in a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of committed entries.
    pub entries: usize,
    /// Number of leftover temporary files.
    pub temp_files: usize,
    /// Total bytes across both.
    pub bytes: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum CacheFile {
    Entry,
    Temp,
}

/// Classifies a file name as an entry (`<op>.<hexdigest>`), a temporary
/// file (`<entry>.<pid>-<seq>.tmp`), or neither.
fn classify(name: &str) -> Option<CacheFile> {
    if let Some(stem) = name.strip_suffix(TEMP_SUFFIX) {
        let (entry, _unique) = stem.rsplit_once('.')?;
        return classify(entry).filter(|f| *f == CacheFile::Entry).map(|_| CacheFile::Temp);
    }

    let (operation, digest) = name.rsplit_once('.')?;
    let is_digest = digest.len() >= MIN_DIGEST_LEN && digest.chars().all(|c| c.is_ascii_hexdigit());
    (!operation.is_empty() && is_digest).then_some(CacheFile::Entry)
}

fn scan(dir: &Path, delete: bool) -> io::Result<CacheStats> {
    let mut stats = CacheStats::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(kind) = name.to_str().and_then(classify) else {
            continue;
        };

        let len = entry.metadata()?.len();
        if delete {
            fs::remove_file(entry.path())?;
        }

        stats.bytes += len;
        match kind {
            CacheFile::Entry => stats.entries += 1,
            CacheFile::Temp => stats.temp_files += 1,
        }
    }

    Ok(stats)
}

/// Counts cache entries and temporary files in `dir`.
///
/// Files that do not follow the cache naming scheme are ignored.
pub fn disk_stats(dir: &Path) -> io::Result<CacheStats> {
    scan(dir, false)
}

/// Deletes all cache entries and temporary files in `dir`.
///
/// Returns what was removed. Unrelated files are left untouched.
pub fn clear(dir: &Path) -> io::Result<CacheStats> {
    scan(dir, true)
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// A single cached filesystem payload, or a negative-cache marker for a missing path.
#[derive(Debug)]
pub struct ContentBlob {
    pub present: bool,
    pub bytes: Vec<u8>,
    pub mtime: SystemTime,
}

impl ContentBlob {
    fn missing() -> Self {
        ContentBlob {
            present: false,
            bytes: Vec::new(),
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Path-keyed content cache. Reads happen concurrently from any worker; the
/// indexer replaces the whole map under the write lock when the blog
/// directory changes (see `indexer`).
#[derive(Default)]
pub struct Cache {
    entries: RwLock<HashMap<PathBuf, Arc<ContentBlob>>>,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached blob for `path`, loading it from disk on first miss.
    /// A missing file is cached too (`present == false`) so repeated lookups
    /// of a 404 path don't keep hitting the filesystem.
    pub fn lookup_or_load(&self, path: &Path) -> Arc<ContentBlob> {
        if let Some(blob) = self.entries.read().unwrap().get(path) {
            return Arc::clone(blob);
        }

        let blob = Arc::new(load_blob(path));
        self.entries
            .write()
            .unwrap()
            .insert(path.to_path_buf(), Arc::clone(&blob));
        blob
    }

    /// Inserts or overwrites an entry directly (used by the indexer to cache
    /// generated pages that never live on disk, e.g. `<blog-dir>/<id>.html`).
    pub fn insert(&self, path: PathBuf, bytes: Vec<u8>) {
        let blob = Arc::new(ContentBlob {
            present: true,
            bytes,
            mtime: SystemTime::now(),
        });
        self.entries.write().unwrap().insert(path, blob);
    }

    /// Replaces the entire cache contents in one write-locked assignment.
    pub fn replace_all(&self, entries: HashMap<PathBuf, Arc<ContentBlob>>) {
        *self.entries.write().unwrap() = entries;
    }
}

fn load_blob(path: &Path) -> ContentBlob {
    let metadata = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => return ContentBlob::missing(),
    };
    let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    match fs::read(path) {
        Ok(bytes) => ContentBlob {
            present: true,
            bytes,
            mtime,
        },
        Err(_) => ContentBlob::missing(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_negative_cached() {
        let cache = Cache::new();
        let blob = cache.lookup_or_load(Path::new("/no/such/path/ever"));
        assert!(!blob.present);
        assert!(blob.is_empty());
    }

    #[test]
    fn repeated_lookup_returns_same_blob() {
        let dir = std::env::temp_dir().join(format!("aehttpd-cache-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("hello.txt");
        fs::File::create(&file).unwrap().write_all(b"hi\n").unwrap();

        let cache = Cache::new();
        let first = cache.lookup_or_load(&file);
        let second = cache.lookup_or_load(&file);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&first.bytes, b"hi\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn replace_all_swaps_contents() {
        let cache = Cache::new();
        cache.insert(PathBuf::from("/a"), b"one".to_vec());
        let mut fresh = HashMap::new();
        fresh.insert(
            PathBuf::from("/b"),
            Arc::new(ContentBlob {
                present: true,
                bytes: b"two".to_vec(),
                mtime: SystemTime::now(),
            }),
        );
        cache.replace_all(fresh);
        assert!(!cache.lookup_or_load(Path::new("/a")).present);
        let b = cache.lookup_or_load(Path::new("/b"));
        assert!(b.present);
        assert_eq!(&b.bytes, b"two");
    }
}

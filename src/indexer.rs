use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use proxy_log::{info, trace, warn};

use crate::blog::BlogRecord;
use crate::cache::{Cache, ContentBlob};

/// Owns the published blog list and the last-observed mtime of the blog
/// directory. `refresh` is driven by a periodic timer on the main reactor
/// (see `server::Server::run`); readers only ever see a `list()` snapshot.
pub struct BlogIndex {
    last_dir_mtime: Mutex<Option<SystemTime>>,
    list: Mutex<Arc<Vec<BlogRecord>>>,
}

impl Default for BlogIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl BlogIndex {
    pub fn new() -> Self {
        BlogIndex {
            last_dir_mtime: Mutex::new(None),
            list: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub fn list(&self) -> Arc<Vec<BlogRecord>> {
        Arc::clone(&self.list.lock().unwrap())
    }

    /// Rescans `blog_dir`; does nothing if its mtime hasn't advanced since
    /// the last successful refresh. On any failure the previous blog list
    /// and cache contents are left untouched and `last_dir_mtime` is not
    /// advanced, so the next tick retries the same rescan.
    pub fn refresh(&self, blog_dir: &Path, template_dir: &Path, document_root: &Path, cache: &Cache) {
        let dir_mtime = match fs::metadata(blog_dir).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                warn!("indexer: could not stat blog dir {:?}: {}", blog_dir, e);
                return;
            }
        };

        if *self.last_dir_mtime.lock().unwrap() == Some(dir_mtime) {
            return;
        }

        trace!("indexer: blog directory changed, rebuilding index");

        let mut ids: Vec<u64> = match fs::read_dir(blog_dir) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| !name.starts_with('.'))
                .filter_map(|name| name.parse::<u64>().ok())
                .collect(),
            Err(e) => {
                warn!("indexer: could not read blog dir {:?}: {}", blog_dir, e);
                return;
            }
        };
        ids.sort_unstable();

        let mut fresh_cache: HashMap<PathBuf, Arc<ContentBlob>> = HashMap::new();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match decode_blog_record(id, blog_dir) {
                Some((record, page)) => {
                    let html_path = blog_dir.join(format!("{}.html", id));
                    fresh_cache.insert(html_path, Arc::new(fresh_blob(page)));
                    records.push(record);
                }
                None => warn!("indexer: skipping unreadable blog record {}", id),
            }
        }

        let index_page = render_index_page(&records, template_dir);
        fresh_cache.insert(document_root.join("index.html"), Arc::new(fresh_blob(index_page)));

        // Allocate a fresh cache and swap it in wholesale: stale negative
        // entries and deleted posts' rendered pages must not survive a
        // successful rebuild.
        cache.replace_all(fresh_cache);

        *self.list.lock().unwrap() = Arc::new(records.clone());
        *self.last_dir_mtime.lock().unwrap() = Some(dir_mtime);

        info!("indexer: rebuilt blog index with {} posts", records.len());
    }
}

fn fresh_blob(bytes: Vec<u8>) -> ContentBlob {
    ContentBlob {
        present: true,
        bytes,
        mtime: SystemTime::now(),
    }
}

fn decode_blog_record(id: u64, blog_dir: &Path) -> Option<(BlogRecord, Vec<u8>)> {
    let source = blog_dir.join(id.to_string());
    let json = fs::read_to_string(&source).ok()?;
    let record = BlogRecord::decode(id, &json).ok()?;
    let page = record.render_page().into_bytes();
    Some((record, page))
}

/// Lazily fills a single blog page into the live cache on a read-path miss
/// (e.g. a post created after the indexer's last tick). Unlike `refresh`
/// this does not touch the rest of the cache.
pub(crate) fn build_blog_record(id: u64, blog_dir: &Path, cache: &Cache) -> Option<BlogRecord> {
    let (record, page) = decode_blog_record(id, blog_dir)?;
    let html_path = blog_dir.join(format!("{}.html", id));
    cache.insert(html_path, page);
    Some(record)
}

fn render_index_page(records: &[BlogRecord], template_dir: &Path) -> Vec<u8> {
    let header = fs::read_to_string(template_dir.join("index_header.html")).unwrap_or_default();
    let footer = fs::read_to_string(template_dir.join("index_footer.html")).unwrap_or_default();

    let mut page = String::with_capacity(header.len() + footer.len() + records.len() * 256);
    page.push_str(&header);
    for record in records {
        page.push_str(&record.render_index_row());
    }
    page.push_str(&footer);

    page.into_bytes()
}

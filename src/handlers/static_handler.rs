use std::path::{Component, Path, PathBuf};

use crate::cache::Cache;
use crate::http::{BodySegment, HttpResponse};
use crate::httpdate;
use crate::wire::HttpRequest;

fn mime_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css",
        Some("htm") | Some("html") => "text/html",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("txt") => "text/plain",
        Some("gif") => "image/gif",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Rejects any request path whose normalised components would climb above
/// `document_root`, without leaking whether the escaped target exists.
fn resolve_within_root(document_root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = if request_path == "/" {
        "index.html"
    } else {
        request_path.trim_start_matches('/')
    };

    let mut out = document_root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

pub fn handle_static(request: &HttpRequest, document_root: &Path, cache: &Cache) -> HttpResponse {
    let Some(path) = resolve_within_root(document_root, &request.path) else {
        return HttpResponse::new(404);
    };

    let blob = cache.lookup_or_load(&path);
    if !blob.present {
        return HttpResponse::new(404);
    }

    if let Some(since) = request.header("if-modified-since") {
        if let Some(since_time) = httpdate::parse(since) {
            if blob.mtime <= since_time {
                return HttpResponse::new(304);
            }
        }
    }

    let mut response = HttpResponse::new(200);
    response.set_mime_type(mime_type_for(&path));
    response.set_header("Last-Modified", httpdate::format(blob.mtime));
    response.set_header("Cache-Control", "max-age=3600");
    response.set_header("Date", httpdate::format(std::time::SystemTime::now()));
    response.push_segment(BodySegment::Borrowed(blob));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aehttpd-static-test-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn get(path: &str) -> HttpRequest {
        let mut req = HttpRequest::new();
        req.path = path.to_string();
        req
    }

    #[test]
    fn serves_existing_file() {
        let root = scratch("serves");
        fs::File::create(root.join("hello.txt")).unwrap().write_all(b"hi\n").unwrap();
        let cache = Cache::new();
        let res = handle_static(&get("/hello.txt"), &root, &cache);
        assert_eq!(res.status_code, 200);
        assert_eq!(res.mime_type, "text/plain");
        assert_eq!(res.body_len(), 3);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn root_path_maps_to_index_html() {
        let root = scratch("index");
        fs::write(root.join("index.html"), b"<h1>hi</h1>").unwrap();
        let cache = Cache::new();
        let res = handle_static(&get("/"), &root, &cache);
        assert_eq!(res.status_code, 200);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_file_is_404() {
        let root = scratch("missing");
        let cache = Cache::new();
        let res = handle_static(&get("/nope.txt"), &root, &cache);
        assert_eq!(res.status_code, 404);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn traversal_outside_root_is_404_not_403() {
        let root = scratch("traversal");
        let cache = Cache::new();
        let res = handle_static(&get("/../../../etc/passwd"), &root, &cache);
        assert_eq!(res.status_code, 404);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn fresh_if_modified_since_yields_304() {
        let root = scratch("ims");
        fs::write(root.join("a.txt"), b"x").unwrap();
        let cache = Cache::new();
        let future = httpdate::format(std::time::SystemTime::now() + std::time::Duration::from_secs(3600));
        let mut req = get("/a.txt");
        req.headers.push(("if-modified-since".to_string(), future));
        let res = handle_static(&req, &root, &cache);
        assert_eq!(res.status_code, 304);
        fs::remove_dir_all(&root).ok();
    }
}

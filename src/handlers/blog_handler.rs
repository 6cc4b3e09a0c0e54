use std::path::Path;

use crate::cache::Cache;
use crate::http::{BodySegment, HttpResponse};
use crate::indexer::build_blog_record;
use crate::wire::HttpRequest;

fn extract_id(request: &HttpRequest, route_prefix: &str) -> Option<u64> {
    let suffix = request.path.strip_prefix(route_prefix).unwrap_or("");
    let suffix = suffix.trim_start_matches('/');
    if let Ok(id) = suffix.parse::<u64>() {
        if id > 0 {
            return Some(id);
        }
    }
    if let Ok(id) = request.query.parse::<u64>() {
        if id > 0 {
            return Some(id);
        }
    }
    None
}

pub fn handle_blog(
    request: &HttpRequest,
    route_prefix: &str,
    blog_dir: &Path,
    template_dir: &Path,
    cache: &Cache,
) -> HttpResponse {
    let Some(id) = extract_id(request, route_prefix) else {
        return HttpResponse::new(404);
    };

    let html_path = blog_dir.join(format!("{}.html", id));
    let mut body = cache.lookup_or_load(&html_path);
    if !body.present {
        if build_blog_record(id, blog_dir, cache).is_none() {
            return HttpResponse::new(404);
        }
        body = cache.lookup_or_load(&html_path);
        if !body.present {
            return HttpResponse::new(500);
        }
    }

    let header = cache.lookup_or_load(&template_dir.join("blogs_header.html"));
    let footer = cache.lookup_or_load(&template_dir.join("blogs_footer.html"));
    if !header.present || !footer.present {
        return HttpResponse::new(500);
    }

    let mut response = HttpResponse::new(200);
    response.set_mime_type("text/html");
    response.push_segment(BodySegment::Borrowed(header));
    response.push_segment(BodySegment::Borrowed(body));
    response.push_segment(BodySegment::Borrowed(footer));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("aehttpd-blog-handler-test-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn get(path: &str, query: &str) -> HttpRequest {
        let mut req = HttpRequest::new();
        req.path = path.to_string();
        req.query = query.to_string();
        req
    }

    #[test]
    fn serves_blog_by_suffix_path() {
        let blog_dir = scratch("suffix-blogs");
        let tmpl_dir = scratch("suffix-tmpl");
        fs::write(blog_dir.join("7"), r#"{"heading":"H","content":"C"}"#).unwrap();
        fs::write(tmpl_dir.join("blogs_header.html"), "HEAD").unwrap();
        fs::write(tmpl_dir.join("blogs_footer.html"), "FOOT").unwrap();

        let cache = Cache::new();
        let res = handle_blog(&get("/blogs/7", ""), "/blogs", &blog_dir, &tmpl_dir, &cache);
        assert_eq!(res.status_code, 200);
        let body: Vec<u8> = res
            .segments
            .iter()
            .flat_map(|s| s.as_slice().to_vec())
            .collect();
        let body = String::from_utf8(body).unwrap();
        assert!(body.starts_with("HEAD"));
        assert!(body.ends_with("FOOT"));
        assert!(body.contains('H'));

        fs::remove_dir_all(&blog_dir).ok();
        fs::remove_dir_all(&tmpl_dir).ok();
    }

    #[test]
    fn serves_blog_by_query_string() {
        let blog_dir = scratch("query-blogs");
        let tmpl_dir = scratch("query-tmpl");
        fs::write(blog_dir.join("7"), r#"{"heading":"H"}"#).unwrap();
        fs::write(tmpl_dir.join("blogs_header.html"), "").unwrap();
        fs::write(tmpl_dir.join("blogs_footer.html"), "").unwrap();

        let cache = Cache::new();
        let res = handle_blog(&get("/blogs", "7"), "/blogs", &blog_dir, &tmpl_dir, &cache);
        assert_eq!(res.status_code, 200);

        fs::remove_dir_all(&blog_dir).ok();
        fs::remove_dir_all(&tmpl_dir).ok();
    }

    #[test]
    fn zero_id_is_404() {
        let blog_dir = scratch("zero-blogs");
        let tmpl_dir = scratch("zero-tmpl");
        let cache = Cache::new();
        let res = handle_blog(&get("/blogs/0", ""), "/blogs", &blog_dir, &tmpl_dir, &cache);
        assert_eq!(res.status_code, 404);
        fs::remove_dir_all(&blog_dir).ok();
        fs::remove_dir_all(&tmpl_dir).ok();
    }

    #[test]
    fn unknown_id_is_404() {
        let blog_dir = scratch("unknown-blogs");
        let tmpl_dir = scratch("unknown-tmpl");
        let cache = Cache::new();
        let res = handle_blog(&get("/blogs/999", ""), "/blogs", &blog_dir, &tmpl_dir, &cache);
        assert_eq!(res.status_code, 404);
        fs::remove_dir_all(&blog_dir).ok();
        fs::remove_dir_all(&tmpl_dir).ok();
    }
}

use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use aehttpd::config::AppConfig;
use aehttpd::server::Server;

fn scratch_root(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("aehttpd-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("www")).unwrap();
    fs::create_dir_all(dir.join("blogs")).unwrap();
    fs::create_dir_all(dir.join("tmpl")).unwrap();
    dir
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn request(port: u16, raw: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).ok();
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn serves_static_file_and_blog_post_end_to_end() {
    let root = scratch_root("basic");
    fs::write(root.join("www/hello.txt"), b"hi there\n").unwrap();
    fs::write(root.join("blogs").join("1"), r#"{"heading":"First post","content":"Hello"}"#).unwrap();
    fs::write(root.join("tmpl/blogs_header.html"), "<header>").unwrap();
    fs::write(root.join("tmpl/blogs_footer.html"), "</footer>").unwrap();
    fs::write(root.join("tmpl/index_header.html"), "<ul>").unwrap();
    fs::write(root.join("tmpl/index_footer.html"), "</ul>").unwrap();

    let port = free_port();
    let config = AppConfig {
        bind_address: "127.0.0.1".to_string(),
        port,
        worker_count: 2,
        document_root: root.join("www"),
        blog_dir: root.join("blogs"),
        template_dir: root.join("tmpl"),
        indexer_period_secs: 1,
    };

    let server = Server::new(config).unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    thread::sleep(Duration::from_millis(200));

    let resp = request(port, "GET /hello.txt HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(resp.starts_with("HTTP/1.1 200 OK"), "{}", resp);
    assert!(resp.ends_with("hi there\n"));

    let resp = request(port, "GET /blogs/1 HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(resp.starts_with("HTTP/1.1 200 OK"), "{}", resp);
    assert!(resp.contains("<header>"));
    assert!(resp.contains("First post"));
    assert!(resp.contains("</footer>"));

    let resp = request(port, "GET /does-not-exist HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(resp.starts_with("HTTP/1.1 404"), "{}", resp);

    let resp = request(port, "POST /hello.txt HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(resp.starts_with("HTTP/1.1 405"), "{}", resp);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn indexer_publishes_index_page_after_startup() {
    let root = scratch_root("index");
    fs::write(root.join("blogs").join("1"), r#"{"heading":"One"}"#).unwrap();
    fs::write(root.join("blogs").join("2"), r#"{"heading":"Two"}"#).unwrap();
    fs::write(root.join("tmpl/blogs_header.html"), "").unwrap();
    fs::write(root.join("tmpl/blogs_footer.html"), "").unwrap();
    fs::write(root.join("tmpl/index_header.html"), "<ul>").unwrap();
    fs::write(root.join("tmpl/index_footer.html"), "</ul>").unwrap();

    let port = free_port();
    let config = AppConfig {
        bind_address: "127.0.0.1".to_string(),
        port,
        worker_count: 2,
        document_root: root.join("www"),
        blog_dir: root.join("blogs"),
        template_dir: root.join("tmpl"),
        indexer_period_secs: 1,
    };

    let server = Server::new(config).unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    thread::sleep(Duration::from_millis(1500));

    let resp = request(port, "GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(resp.starts_with("HTTP/1.1 200 OK"), "{}", resp);
    assert!(resp.contains("One"));
    assert!(resp.contains("Two"));

    fs::remove_dir_all(&root).ok();
}

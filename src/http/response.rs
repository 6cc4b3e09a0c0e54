use std::sync::Arc;

use crate::cache::ContentBlob;
use crate::fmt_int;

/// One piece of a response body. `Borrowed` segments point into the content
/// cache and are never freed by the response; `Owned` segments are allocated
/// just for this response (canned error pages, generated HTML).
#[derive(Debug, Clone)]
pub enum BodySegment {
    Owned(Arc<[u8]>),
    Borrowed(Arc<ContentBlob>),
}

impl BodySegment {
    pub fn owned(bytes: Vec<u8>) -> Self {
        BodySegment::Owned(Arc::from(bytes))
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            BodySegment::Owned(b) => b.as_ref(),
            BodySegment::Borrowed(blob) => blob.bytes.as_slice(),
        }
    }
}

pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Page Not Found",
        405 => "Method Not Allowed",
        414 => "URI Too Long",
        418 => "I'm a teapot",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Unassembled response: a status, a MIME type and up to three body
/// segments (head/main/foot), plus response headers. The writer serialises
/// the header block and gathers header + segments into one vectored write.
#[derive(Debug, Default)]
pub struct HttpResponse {
    pub status_code: u16,
    pub mime_type: String,
    pub headers: Vec<(String, String)>,
    pub segments: Vec<BodySegment>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        HttpResponse {
            status_code,
            mime_type: String::new(),
            headers: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn set_mime_type(&mut self, mime: impl Into<String>) -> &mut Self {
        self.mime_type = mime.into();
        self
    }

    pub fn push_segment(&mut self, segment: BodySegment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    pub fn set_body_owned(&mut self, bytes: Vec<u8>, mime: &str) -> &mut Self {
        self.mime_type = mime.to_string();
        self.segments = vec![BodySegment::owned(bytes)];
        self
    }

    pub fn body_len(&self) -> usize {
        self.segments.iter().map(BodySegment::len).sum()
    }

    /// Serialises the status line and headers into `buf`. Returns the
    /// number of bytes written, or `None` on overflow (the pipeline falls
    /// back to the canned 500 page in that case).
    pub fn write_header_block(&self, buf: &mut [u8; 512]) -> Option<usize> {
        let mut pos = 0usize;
        macro_rules! put {
            ($bytes:expr) => {{
                let b = $bytes;
                if pos + b.len() > buf.len() {
                    return None;
                }
                buf[pos..pos + b.len()].copy_from_slice(b);
                pos += b.len();
            }};
        }

        put!(b"HTTP/1.1 ");
        let mut num_buf = [0u8; 20];
        let n = fmt_int::format_u64(self.status_code as u64, &mut num_buf);
        put!(&num_buf[..n]);
        put!(b" ");
        put!(reason_phrase(self.status_code).as_bytes());
        put!(b"\r\n");

        if (200..300).contains(&self.status_code) {
            put!(b"Content-Length: ");
            let mut len_buf = [0u8; 20];
            let n = fmt_int::format_u64(self.body_len() as u64, &mut len_buf);
            put!(&len_buf[..n]);
            put!(b"\r\n");
            if !self.mime_type.is_empty() {
                put!(b"Content-Type: ");
                put!(self.mime_type.as_bytes());
                put!(b"\r\n");
            }
        }

        for (key, value) in &self.headers {
            put!(key.as_bytes());
            put!(b": ");
            put!(value.as_bytes());
            put!(b"\r\n");
        }

        put!(b"Connection: close\r\n");
        put!(b"Server: aehttpd\r\n");
        put!(b"\r\n");
        Some(pos)
    }
}

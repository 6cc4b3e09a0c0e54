use std::io::{ErrorKind, IoSlice, Read, Write};
use std::time::Instant;

use mio::net::TcpStream;

use crate::http::response::HttpResponse;
use crate::wire::{HttpRequest, Method, ParseError};

const READ_BUF_SIZE: usize = 8192;

/// Per-connection state. Pinned to exactly one worker reactor for its whole
/// life; never touched from any other thread.
pub struct Client {
    pub stream: TcpStream,
    pub request: HttpRequest,
    pub response: Option<HttpResponse>,
    header_buf: [u8; 512],
    header_len: usize,
    skip_body: bool,
    written: usize,
    pub last_activity: Instant,
}

impl Client {
    pub fn new(stream: TcpStream) -> Self {
        Client {
            stream,
            request: HttpRequest::new(),
            response: None,
            header_buf: [0u8; 512],
            header_len: 0,
            skip_body: false,
            written: 0,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Reads whatever is available into the request buffer. Returns `true`
    /// if the connection hit EOF or an unrecoverable read error.
    pub fn read_data(&mut self) -> bool {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return true,
                Ok(n) => {
                    self.request.buffer.extend_from_slice(&buf[..n]);
                    if self.request.buffer.len() > READ_BUF_SIZE * 4 {
                        return true;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => return true,
            }
        }
    }

    /// Drives the request parser as far as the buffered bytes allow.
    pub fn try_complete_request(&mut self) -> Result<bool, ParseError> {
        self.request.advance()
    }

    /// Stages `response` for writing, accounting for HEAD requests which
    /// must not emit a body even though headers describe one.
    pub fn prepare_response(&mut self, response: HttpResponse) {
        self.skip_body = self.request.method == Method::HEAD;
        self.header_len = response.write_header_block(&mut self.header_buf).unwrap_or(0);
        if self.header_len == 0 {
            self.stage_canned_500();
            return;
        }
        self.written = 0;
        self.response = Some(response);
    }

    fn stage_canned_500(&mut self) {
        let page = crate::http::canned::PAGE_500;
        self.header_len = page.len();
        self.header_buf[..page.len()].copy_from_slice(page);
        self.skip_body = false;
        self.written = 0;
        self.response = Some(HttpResponse::new(500));
        // canned pages are self-contained; there is no separate body segment
        if let Some(r) = &mut self.response {
            r.segments.clear();
        }
    }

    /// Writes a canned page directly (used for parser errors and route
    /// assembly failures); these responses need no per-request headers.
    pub fn stage_canned(&mut self, page: &'static [u8]) {
        self.header_len = page.len();
        self.header_buf[..page.len()].copy_from_slice(page);
        self.skip_body = false;
        self.written = 0;
        self.response = Some(HttpResponse::new(0));
        if let Some(r) = &mut self.response {
            r.segments.clear();
        }
    }

    pub fn has_pending_write(&self) -> bool {
        self.response.is_some()
    }

    /// Performs one vectored write attempt. Returns `Ok(true)` once the
    /// whole response has drained, `Ok(false)` if the socket would block.
    pub fn write_ready(&mut self) -> std::io::Result<bool> {
        let Some(response) = &self.response else {
            return Ok(true);
        };

        let header = &self.header_buf[..self.header_len];
        let mut owned_slices: Vec<&[u8]> = Vec::with_capacity(1 + response.segments.len());
        owned_slices.push(header);
        if !self.skip_body {
            for seg in &response.segments {
                owned_slices.push(seg.as_slice());
            }
        }

        let total: usize = owned_slices.iter().map(|s| s.len()).sum();
        if self.written >= total {
            self.response = None;
            return Ok(true);
        }

        let mut remaining = self.written;
        let mut io_slices: Vec<IoSlice<'_>> = Vec::with_capacity(owned_slices.len());
        for slice in &owned_slices {
            if remaining >= slice.len() {
                remaining -= slice.len();
                continue;
            }
            io_slices.push(IoSlice::new(&slice[remaining..]));
            remaining = 0;
        }

        match self.stream.write_vectored(&io_slices) {
            Ok(0) => Ok(true),
            Ok(n) => {
                self.written += n;
                Ok(self.written >= total)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(e),
        }
    }
}

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};

use proxy_log::{errors, info, trace};

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::handlers::{handle_blog, handle_static};
use crate::http::canned;
use crate::http::connection::Client;
use crate::indexer::BlogIndex;
use crate::router::{HandlerKind, Router, RouteConfig, RoutingError};
use crate::wire::Method;

const WAKE_TOKEN: Token = Token(0);
const FIRST_CLIENT_TOKEN: usize = 1;
const MAX_ACCEPTS_PER_PASS: usize = 1000;
const MAIN_LOOP_TICK: Duration = Duration::from_secs(1);

/// Dispatch context shared (read-only after startup, or internally
/// synchronised) by every worker: the router, content cache and blog index.
pub struct SharedState {
    pub router: Arc<Router>,
    pub cache: Arc<Cache>,
    pub blog_index: Arc<BlogIndex>,
    pub config: AppConfig,
}

enum WorkerMessage {
    NewConnection(TcpStream),
    Shutdown,
}

struct WorkerHandle {
    sender: Sender<WorkerMessage>,
    waker: Arc<Waker>,
    join: JoinHandle<()>,
}

pub struct Server {
    listener: TcpListener,
    shared: Arc<SharedState>,
    workers: Vec<WorkerHandle>,
    running: Arc<AtomicBool>,
    poll_storage: Poll,
}

impl Server {
    pub fn new(config: AppConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.bind_address, config.port).parse()?;
        let mut listener = TcpListener::bind(addr)?;

        let router = Arc::new(build_default_router());
        let cache = Arc::new(Cache::new());
        let blog_index = Arc::new(BlogIndex::new());
        let shared = Arc::new(SharedState {
            router,
            cache,
            blog_index,
            config: config.clone(),
        });

        let running = Arc::new(AtomicBool::new(true));
        let mut workers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            workers.push(spawn_worker(id, Arc::clone(&shared), Arc::clone(&running))?);
        }

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, Token(usize::MAX), Interest::READABLE)?;

        info!("aehttpd listening on {}", addr);

        Ok(Server {
            listener,
            shared,
            workers,
            running,
            poll_storage: poll,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let poll = std::mem::replace(&mut self.poll_storage, Poll::new()?);
        let mut events = Events::with_capacity(256);
        let mut last_indexer_tick: Option<Instant> = None;
        let indexer_period = Duration::from_secs(self.shared.config.indexer_period_secs);

        loop {
            if let Err(e) = poll.poll(&mut events, Some(MAIN_LOOP_TICK)) {
                if e.kind() != std::io::ErrorKind::Interrupted {
                    errors!("poll error on main reactor: {}", e);
                }
            }

            for event in events.iter() {
                if event.token() == Token(usize::MAX) {
                    self.accept_connections();
                }
            }

            let now = Instant::now();
            let due = match last_indexer_tick {
                None => true,
                Some(last) => now.duration_since(last) >= indexer_period,
            };
            if due {
                self.shared.blog_index.refresh(
                    &self.shared.config.blog_dir,
                    &self.shared.config.template_dir,
                    &self.shared.config.document_root,
                    &self.shared.cache,
                );
                last_indexer_tick = Some(now);
            }

            if !self.running.load(Ordering::Relaxed) {
                break;
            }
        }

        for worker in self.workers.drain(..) {
            let _ = worker.sender.send(WorkerMessage::Shutdown);
            let _ = worker.waker.wake();
            let _ = worker.join.join();
        }

        Ok(())
    }

    fn accept_connections(&mut self) {
        let mut accepted = 0usize;
        loop {
            if accepted >= MAX_ACCEPTS_PER_PASS {
                break;
            }
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    accepted += 1;
                    let _ = stream.set_nodelay(true);
                    let worker_index = (stream.as_raw_fd() as usize) % self.workers.len();
                    trace!("accepted {} -> worker {}", addr, worker_index);
                    let worker = &self.workers[worker_index];
                    if worker
                        .sender
                        .send(WorkerMessage::NewConnection(stream))
                        .is_ok()
                    {
                        let _ = worker.waker.wake();
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    errors!("accept error: {}", e);
                    break;
                }
            }
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

fn spawn_worker(
    id: usize,
    shared: Arc<SharedState>,
    running: Arc<AtomicBool>,
) -> Result<WorkerHandle> {
    let poll = Poll::new()?;
    let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
    let (tx, rx) = mpsc::channel();

    let join = std::thread::Builder::new()
        .name(format!("aehttpd-worker-{}", id))
        .spawn(move || worker_loop(id, poll, rx, shared, running))
        .map_err(std::io::Error::from)?;

    Ok(WorkerHandle {
        sender: tx,
        waker,
        join,
    })
}

fn worker_loop(
    id: usize,
    poll: Poll,
    rx: Receiver<WorkerMessage>,
    shared: Arc<SharedState>,
    running: Arc<AtomicBool>,
) {
    let mut events = Events::with_capacity(1024);
    let mut connections: HashMap<Token, Client> = HashMap::new();
    let mut next_token = FIRST_CLIENT_TOKEN;

    'outer: loop {
        if let Err(e) = poll.poll(&mut events, Some(MAIN_LOOP_TICK)) {
            if e.kind() != std::io::ErrorKind::Interrupted {
                errors!("worker {}: poll error: {}", id, e);
            }
        }

        for event in events.iter() {
            if event.token() == WAKE_TOKEN {
                while let Ok(msg) = rx.try_recv() {
                    match msg {
                        WorkerMessage::NewConnection(mut stream) => {
                            let token = Token(next_token);
                            next_token += 1;
                            if poll
                                .registry()
                                .register(&mut stream, token, Interest::READABLE)
                                .is_ok()
                            {
                                connections.insert(token, Client::new(stream));
                            }
                        }
                        WorkerMessage::Shutdown => break 'outer,
                    }
                }
                continue;
            }

            let token = event.token();
            let mut destroy = false;

            if let Some(client) = connections.get_mut(&token) {
                client.touch();

                if event.is_readable() && !client.has_pending_write() {
                    destroy |= handle_readable(client, &shared);
                }
                if !destroy && event.is_writable() {
                    destroy |= handle_writable(client);
                }
            }

            if destroy {
                if let Some(mut client) = connections.remove(&token) {
                    let _ = poll.registry().deregister(&mut client.stream);
                }
            } else if let Some(client) = connections.get_mut(&token) {
                let interest = if client.has_pending_write() {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                let _ = poll.registry().reregister(&mut client.stream, token, interest);
            }
        }

        if !running.load(Ordering::Relaxed) {
            break;
        }
    }
}

/// Reads and parses as much as is available, then (on a complete request)
/// routes and dispatches it. Returns `true` if the connection should be torn
/// down (EOF, parse error, or the response has nothing left to write after
/// being staged).
fn handle_readable(client: &mut Client, shared: &SharedState) -> bool {
    let eof = client.read_data();
    if eof && client.request.buffer.is_empty() {
        return true;
    }

    match client.try_complete_request() {
        Ok(true) => {
            // This deployment serves a single virtual host; the router's
            // per-host tries exist for generality but only the empty-string
            // host bucket is ever populated (see build_default_router).
            let method = client.request.method;
            let path = client.request.path.clone();

            match shared.router.resolve(&method, "", &path) {
                Ok(route) => {
                    let response = dispatch(client, &route, shared);
                    client.prepare_response(response);
                }
                Err(RoutingError::NotFound) => client.stage_canned(canned::PAGE_404),
                Err(RoutingError::MethodNotAllowed) => {
                    let mut response = crate::http::HttpResponse::new(405);
                    response.set_header("Allow", "GET, HEAD");
                    client.prepare_response(response);
                }
            }
            false
        }
        Ok(false) => false,
        Err(_) => {
            client.stage_canned(canned::PAGE_404);
            false
        }
    }
}

fn dispatch(client: &Client, route: &RouteConfig, shared: &SharedState) -> crate::http::HttpResponse {
    match route.handler {
        HandlerKind::Static => {
            handle_static(&client.request, &shared.config.document_root, &shared.cache)
        }
        HandlerKind::Blog => handle_blog(
            &client.request,
            &route.path,
            &shared.config.blog_dir,
            &shared.config.template_dir,
            &shared.cache,
        ),
    }
}

fn handle_writable(client: &mut Client) -> bool {
    match client.write_ready() {
        Ok(true) => true,
        Ok(false) => false,
        Err(_) => true,
    }
}

fn build_default_router() -> Router {
    let mut router = Router::new();
    router.add_route_config(
        "",
        "/blogs",
        Arc::new(RouteConfig {
            path: "/blogs".to_string(),
            methods: vec![Method::GET.to_string(), Method::HEAD.to_string()],
            handler: HandlerKind::Blog,
        }),
    );
    router.add_route_config(
        "",
        "/",
        Arc::new(RouteConfig {
            path: "/".to_string(),
            methods: vec![Method::GET.to_string(), Method::HEAD.to_string()],
            handler: HandlerKind::Static,
        }),
    );
    router
}

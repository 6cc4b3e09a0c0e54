pub use crate::blog::BlogRecord;
pub use crate::cache::{Cache, ContentBlob};
pub use crate::config::AppConfig;
pub use crate::error::{CleanError, Result};
pub use crate::http::{BodySegment, Client, HttpResponse};
pub use crate::indexer::BlogIndex;
pub use crate::router::{HandlerKind, RouteConfig, Router, RoutingError};
pub use crate::server::Server;
pub use crate::wire::{HttpRequest, Method, ParseError};

pub use proxy_log::{debug, errors, info, trace, warn};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

use std::collections::HashMap;
use std::sync::Arc;

use crate::wire::Method;

#[derive(Debug, PartialEq, Eq)]
pub enum RoutingError {
    NotFound,
    MethodNotAllowed,
}

/// Which built-in handler a route dispatches to. The router itself knows
/// nothing about static files or blogs; it only matches prefixes and hands
/// back the entry for the caller to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerKind {
    #[default]
    Static,
    Blog,
}

/// One row of the routing table: a prefix, the methods it accepts, and
/// which handler serves it.
#[derive(Debug, Default)]
pub struct RouteConfig {
    pub path: String,
    pub methods: Vec<String>,
    pub handler: HandlerKind,
}

/// One node of the per-host prefix trie. Each node corresponds to one
/// character of path already matched; `payload` is set only at nodes that
/// terminate a registered prefix.
#[derive(Default)]
struct TrieNode {
    children: HashMap<char, Box<TrieNode>>,
    payload: Option<Arc<RouteConfig>>,
}

impl TrieNode {
    fn insert(&mut self, rest: &mut std::str::Chars<'_>, entry: Arc<RouteConfig>) {
        match rest.next() {
            Some(c) => self
                .children
                .entry(c)
                .or_default()
                .insert(rest, entry),
            None => self.payload = Some(entry),
        }
    }

    /// Walks `path`, remembering the deepest node with a payload, and
    /// returns that payload once the walk can no longer extend.
    fn longest_prefix_match(&self, path: &str) -> Option<Arc<RouteConfig>> {
        let mut node = self;
        let mut best = node.payload.clone();
        for c in path.chars() {
            match node.children.get(&c) {
                Some(next) => {
                    node = next;
                    if node.payload.is_some() {
                        best = node.payload.clone();
                    }
                }
                None => break,
            }
        }
        best
    }
}

/// Prefix-matched URL router. One trie per virtual host.
#[derive(Default)]
pub struct Router {
    hosts: HashMap<String, TrieNode>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            hosts: HashMap::new(),
        }
    }

    pub fn add_route_config(&mut self, host: &str, path: &str, entry: Arc<RouteConfig>) {
        let root = self.hosts.entry(host.to_string()).or_default();
        root.insert(&mut path.chars(), entry);
    }

    pub fn resolve(
        &self,
        method: &Method,
        host: &str,
        path: &str,
    ) -> Result<Arc<RouteConfig>, RoutingError> {
        let root = self.hosts.get(host).ok_or(RoutingError::NotFound)?;
        let entry = root
            .longest_prefix_match(path)
            .ok_or(RoutingError::NotFound)?;

        if entry.methods.iter().any(|m| m == method.as_str()) {
            Ok(entry)
        } else {
            Err(RoutingError::MethodNotAllowed)
        }
    }
}

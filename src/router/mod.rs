//! Segment-trie request router.
//!
//! Patterns are split on `/` and stored in a trie whose first level is
//! the http method. A segment starting with `:` captures one path
//! segment under that name; a trailing `*` matches any remainder.
//!
//! Handlers carry an explicit [`Priority`]. Matching walks the tiers
//! from high to low and within a tier prefers literal segments over
//! captures over wildcards, so a high-priority wildcard still beats a
//! low-priority literal route.
//!
//! Handler ids stay dense: removing a handler renumbers every id above
//! it and prunes trie nodes left without terminals or children.

use std::fmt;

/// Dense index into the router's handler table.
pub type HandlerId = usize;

/// Match tier, walked high to low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy)]
struct Terminal {
    id: HandlerId,
    priority: Priority,
}

#[derive(Debug)]
struct Node {
    name: String,
    children: Vec<Node>,
    terminals: Vec<Terminal>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            children: Vec::new(),
            terminals: Vec::new(),
        }
    }

    fn kind(&self) -> SegmentKind {
        SegmentKind::of(&self.name)
    }

    fn child_mut(&mut self, name: &str) -> &mut Node {
        if let Some(i) = self.children.iter().position(|c| c.name == name) {
            return &mut self.children[i];
        }
        // keep literals ahead of captures ahead of wildcards so the
        // match walk tries them in that order
        let kind = SegmentKind::of(name);
        let at = self
            .children
            .iter()
            .position(|c| c.kind() > kind)
            .unwrap_or(self.children.len());
        self.children.insert(at, Node::new(name));
        &mut self.children[at]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentKind {
    Literal,
    Capture,
    Wildcard,
}

impl SegmentKind {
    fn of(name: &str) -> Self {
        if name == "*" {
            SegmentKind::Wildcard
        } else if name.starts_with(':') {
            SegmentKind::Capture
        } else {
            SegmentKind::Literal
        }
    }
}

/// A successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'r, H> {
    pub handler: &'r H,
    pub id: HandlerId,
    /// Captured `:name` segments, in pattern order.
    pub params: Vec<(&'r str, String)>,
}

/// The router; `H` is whatever the caller dispatches on.
pub struct Router<H> {
    root: Node,
    handlers: Vec<H>,
    fallback: Option<H>,
}

impl<H> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("handlers", &self.handlers.len())
            .field("root", &self.root)
            .finish()
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self {
            root: Node::new(""),
            handlers: Vec::new(),
            fallback: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler invoked when no route matches.
    pub fn set_fallback(&mut self, handler: H) {
        self.fallback = Some(handler);
    }

    #[inline]
    pub fn fallback(&self) -> Option<&H> {
        self.fallback.as_ref()
    }

    /// Register a handler for a pattern under one or more methods.
    /// Returns the handler's dense id.
    pub fn add(&mut self, methods: &[&str], pattern: &str, priority: Priority, handler: H) -> HandlerId {
        let id = self.handlers.len();
        self.handlers.push(handler);

        for method in methods {
            let mut node = self.root.child_mut(method);
            for segment in split_pattern(pattern) {
                node = node.child_mut(segment);
            }
            node.terminals.push(Terminal { id, priority });
        }
        id
    }

    /// Look a path up for a method. Does not fall back; see
    /// [`fallback`](Self::fallback).
    pub fn matches<'r>(&'r self, method: &str, path: &str) -> Option<RouteMatch<'r, H>> {
        let method_node = self.root.children.iter().find(|c| c.name == method)?;
        let segments: Vec<&str> = split_pattern(path).collect();

        for tier in [Priority::High, Priority::Medium, Priority::Low] {
            let mut params = Vec::new();
            if let Some(id) = walk(method_node, &segments, tier, &mut params) {
                return Some(RouteMatch {
                    handler: &self.handlers[id],
                    id,
                    params,
                });
            }
        }
        None
    }

    /// Locate a handler by its exact registration and drop it.
    pub fn remove_route(&mut self, method: &str, pattern: &str, priority: Priority) -> Option<H> {
        let mut node = self.root.children.iter().find(|c| c.name == method)?;
        for segment in split_pattern(pattern) {
            node = node.children.iter().find(|c| c.name == segment)?;
        }
        let id = node
            .terminals
            .iter()
            .find(|t| t.priority == priority)
            .map(|t| t.id)?;
        self.remove(id)
    }

    /// Drop a handler. Ids above it shift down by one so the table
    /// stays dense; empty trie branches are pruned.
    pub fn remove(&mut self, id: HandlerId) -> Option<H> {
        if id >= self.handlers.len() {
            return None;
        }
        let handler = self.handlers.remove(id);
        cull(&mut self.root, id);
        Some(handler)
    }
}

fn split_pattern(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split('/').filter(|s| !s.is_empty())
}

/// Depth-first walk preferring literal children, collecting captures.
/// Only terminals of the requested tier count as hits.
fn walk<'r>(
    node: &'r Node,
    segments: &[&str],
    tier: Priority,
    params: &mut Vec<(&'r str, String)>,
) -> Option<HandlerId> {
    if segments.is_empty() {
        return terminal_in(node, tier);
    }

    let (head, rest) = (segments[0], &segments[1..]);

    for child in &node.children {
        match child.kind() {
            SegmentKind::Literal => {
                if child.name != head {
                    continue;
                }
                if let Some(id) = walk(child, rest, tier, params) {
                    return Some(id);
                }
            }
            SegmentKind::Capture => {
                params.push((&child.name[1..], head.to_owned()));
                if let Some(id) = walk(child, rest, tier, params) {
                    return Some(id);
                }
                params.pop();
            }
            SegmentKind::Wildcard => {
                // consumes the whole remainder
                if let Some(id) = terminal_in(child, tier) {
                    return Some(id);
                }
            }
        }
    }

    None
}

fn terminal_in(node: &Node, tier: Priority) -> Option<HandlerId> {
    node.terminals
        .iter()
        .find(|t| t.priority == tier)
        .map(|t| t.id)
        .or_else(|| {
            // a bare wildcard child also terminates here
            node.children
                .iter()
                .find(|c| c.kind() == SegmentKind::Wildcard)
                .and_then(|c| terminal_in(c, tier))
        })
}

/// Remove terminals for `id`, shift greater ids down, prune dead nodes.
fn cull(node: &mut Node, id: HandlerId) {
    node.terminals.retain(|t| t.id != id);
    for t in &mut node.terminals {
        if t.id > id {
            t.id -= 1;
        }
    }
    for child in &mut node.children {
        cull(child, id);
    }
    node.children
        .retain(|c| !c.terminals.is_empty() || !c.children.is_empty());
}

#[cfg(test)]
mod test {
    use super::*;

    fn router() -> Router<&'static str> {
        Router::new()
    }

    #[test]
    fn literal_match() {
        let mut r = router();
        r.add(&["GET"], "/users/list", Priority::Medium, "list");

        let m = r.matches("GET", "/users/list").unwrap();
        assert_eq!(*m.handler, "list");
        assert!(m.params.is_empty());

        assert!(r.matches("POST", "/users/list").is_none());
        assert!(r.matches("GET", "/users").is_none());
        assert!(r.matches("GET", "/users/list/extra").is_none());
    }

    #[test]
    fn root_route() {
        let mut r = router();
        r.add(&["GET"], "/", Priority::Medium, "index");
        assert_eq!(*r.matches("GET", "/").unwrap().handler, "index");
    }

    #[test]
    fn capture_segments() {
        let mut r = router();
        r.add(&["GET"], "/users/:id/posts/:post", Priority::Medium, "post");

        let m = r.matches("GET", "/users/42/posts/7").unwrap();
        assert_eq!(*m.handler, "post");
        assert_eq!(m.params, vec![("id", "42".to_owned()), ("post", "7".to_owned())]);
    }

    #[test]
    fn literal_beats_capture_in_same_tier() {
        let mut r = router();
        r.add(&["GET"], "/users/:id", Priority::Medium, "by-id");
        r.add(&["GET"], "/users/me", Priority::Medium, "me");

        assert_eq!(*r.matches("GET", "/users/me").unwrap().handler, "me");
        assert_eq!(*r.matches("GET", "/users/7").unwrap().handler, "by-id");
    }

    #[test]
    fn capture_backtracks_to_sibling() {
        let mut r = router();
        r.add(&["GET"], "/a/:x/end", Priority::Medium, "cap");
        r.add(&["GET"], "/a/*", Priority::Medium, "wild");

        // :x matches "b" but "stop" != "end", so the wildcard wins
        let m = r.matches("GET", "/a/b/stop").unwrap();
        assert_eq!(*m.handler, "wild");
        assert!(m.params.is_empty());
    }

    #[test]
    fn wildcard_matches_remainder() {
        let mut r = router();
        r.add(&["GET"], "/static/*", Priority::Low, "files");

        assert_eq!(*r.matches("GET", "/static/css/site.css").unwrap().handler, "files");
        assert_eq!(*r.matches("GET", "/static").unwrap().handler, "files");
    }

    #[test]
    fn high_tier_wildcard_beats_low_tier_literal() {
        let mut r = router();
        r.add(&["GET"], "/api/status", Priority::Low, "status");
        r.add(&["GET"], "/api/*", Priority::High, "guard");

        assert_eq!(*r.matches("GET", "/api/status").unwrap().handler, "guard");
    }

    #[test]
    fn multi_method() {
        let mut r = router();
        let id = r.add(&["GET", "HEAD"], "/thing", Priority::Medium, "thing");

        assert_eq!(r.matches("GET", "/thing").unwrap().id, id);
        assert_eq!(r.matches("HEAD", "/thing").unwrap().id, id);
    }

    #[test]
    fn remove_renumbers_dense_ids() {
        let mut r = router();
        let a = r.add(&["GET"], "/a", Priority::Medium, "a");
        let b = r.add(&["GET"], "/b", Priority::Medium, "b");
        let c = r.add(&["GET"], "/c", Priority::Medium, "c");
        assert_eq!((a, b, c), (0, 1, 2));

        assert_eq!(r.remove(b), Some("b"));
        assert_eq!(r.len(), 2);

        assert!(r.matches("GET", "/b").is_none());
        // c slid down into b's slot
        let m = r.matches("GET", "/c").unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(*m.handler, "c");
        assert_eq!(r.matches("GET", "/a").unwrap().id, 0);
    }

    #[test]
    fn remove_by_registration() {
        let mut r = router();
        r.add(&["GET"], "/users/:id", Priority::Medium, "by-id");
        r.add(&["GET"], "/users/list", Priority::Medium, "list");

        assert_eq!(r.remove_route("GET", "/users/list", Priority::Medium), Some("list"));
        assert_eq!(r.remove_route("GET", "/users/list", Priority::Medium), None);

        // the parameter route is untouched
        let m = r.matches("GET", "/users/list").unwrap();
        assert_eq!(*m.handler, "by-id");
        assert_eq!(m.params, vec![("id", "list".to_owned())]);
    }

    #[test]
    fn remove_prunes_empty_branches() {
        let mut r = router();
        let id = r.add(&["GET"], "/deep/nested/leaf", Priority::Medium, "leaf");
        r.remove(id);

        assert!(r.root.children.is_empty());
    }

    #[test]
    fn fallback_is_separate() {
        let mut r = router();
        r.set_fallback("404");
        assert!(r.matches("GET", "/missing").is_none());
        assert_eq!(*r.fallback().unwrap(), "404");
    }
}

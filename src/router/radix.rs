//! Radix tree used for route matching.
//!
//! Each node is one path segment. Static segments are compared after percent
//! decoding and are tried before parameter segments (`{id}`), which match any
//! single segment and keep its raw, still-encoded text. Routes
//! live on terminal nodes keyed by HTTP method, so a path that exists under a
//! different method can still be found (for `405` and `Allow`).

use http::Method;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::ParamVec;
use crate::routes::RouteMeta;

#[derive(Clone, Default)]
struct RadixNode {
    segment: String,
    param_name: Option<Arc<str>>,
    routes: HashMap<Method, Arc<RouteMeta>>,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn insert(&mut self, segments: &[&str], route: Arc<RouteMeta>) {
        let Some((segment, remaining)) = segments.split_first() else {
            self.routes.insert(route.method.clone(), route);
            return;
        };

        if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                child.insert(remaining, route);
                return;
            }
            let mut child = RadixNode {
                param_name: Some(Arc::from(name)),
                ..Default::default()
            };
            child.insert(remaining, route);
            self.param_children.push(child);
            return;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            child.insert(remaining, route);
            return;
        }
        let mut child = RadixNode {
            segment: (*segment).to_string(),
            ..Default::default()
        };
        child.insert(remaining, route);
        self.children.push(child);
    }

    /// Find the terminal node for `segments`, collecting parameters on the way.
    fn search<'a>(&'a self, segments: &[&str], params: &mut ParamVec) -> Option<&'a RadixNode> {
        let Some((segment, remaining)) = segments.split_first() else {
            return (!self.routes.is_empty()).then_some(self);
        };

        let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(*segment));
        for child in &self.children {
            if child.segment == *decoded {
                if let Some(found) = child.search(remaining, params) {
                    return Some(found);
                }
            }
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), (*segment).to_string()));
                if let Some(found) = child.search(remaining, params) {
                    return Some(found);
                }
                params.pop();
            }
        }

        None
    }
}

/// Radix tree router over full paths (base path included)
#[derive(Clone, Default)]
pub struct RadixRouter {
    root: RadixNode,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl RadixRouter {
    #[must_use]
    pub fn new(routes: &[Arc<RouteMeta>]) -> Self {
        let mut root = RadixNode::default();
        for route in routes {
            let full_path = format!("{}{}", route.base_path, route.path_pattern);
            root.insert(&split_path(&full_path), Arc::clone(route));
        }
        Self { root }
    }

    /// Match a method and path; `None` when the path or the method is unknown.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<(Arc<RouteMeta>, ParamVec)> {
        let mut params = ParamVec::new();
        let node = self.root.search(&split_path(path), &mut params)?;
        node.routes.get(method).map(|r| (Arc::clone(r), params))
    }

    /// All routes registered on `path`, whatever their method
    #[must_use]
    pub fn routes_for_path(&self, path: &str) -> Vec<Arc<RouteMeta>> {
        let mut params = ParamVec::new();
        self.root
            .search(&split_path(path), &mut params)
            .map(|node| node.routes.values().cloned().collect())
            .unwrap_or_default()
    }
}

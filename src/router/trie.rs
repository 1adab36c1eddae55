use std::collections::HashMap;
use std::sync::Arc;

use crate::http::ParamVec;

/// Routing trie keyed by path segments.
///
/// Patterns are split on `/`; a segment starting with `:` captures the
/// matched segment under the name after the colon. Each node holds its
/// literal children plus at most one parameter child. Matching walks the
/// path greedily, preferring a literal child over the parameter child at
/// every step; there is no backtracking. Empty segments (from leading,
/// trailing or doubled slashes) are ordinary literal segments, so a
/// pattern must spell them out to match them. Both segments and parameter
/// names are case-sensitive.
#[derive(Debug, Default)]
pub struct PathTrie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<String, TrieNode>,
    param_child: Option<Box<TrieNode>>,
    /// Capture name when this node is a parameter child.
    param_name: Option<Arc<str>>,
    terminal: bool,
}

impl PathTrie {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a pattern. Re-registering the same pattern is a no-op at
    /// the trie level. Registering a different parameter name at a
    /// position that already has one renames the capture; the last
    /// registration wins.
    pub fn insert(&mut self, pattern: &str) {
        let mut node = &mut self.root;
        for segment in pattern.split('/') {
            if let Some(name) = segment.strip_prefix(':') {
                let child = node.param_child.get_or_insert_with(Default::default);
                if child.param_name.as_deref() != Some(name) {
                    child.param_name = Some(Arc::from(name));
                }
                node = &mut **child;
            } else {
                node = node
                    .children
                    .entry(segment.to_string())
                    .or_default();
            }
        }
        node.terminal = true;
    }

    /// Match a path against the registered patterns.
    ///
    /// On success returns the captured parameters and the normalised
    /// pattern (the path with captured segments replaced by `:name`),
    /// which routing tables key on. Returns `None` when a segment has no
    /// matching child or the final node is not a registered pattern end.
    pub fn find(&self, path: &str) -> Option<(ParamVec, String)> {
        let mut node = &self.root;
        let mut params = ParamVec::new();
        let mut normalised = String::with_capacity(path.len());
        let mut first = true;
        for segment in path.split('/') {
            if !first {
                normalised.push('/');
            }
            first = false;
            if let Some(child) = node.children.get(segment) {
                normalised.push_str(segment);
                node = child;
            } else if let Some(child) = &node.param_child {
                let name = child.param_name.clone()?;
                normalised.push(':');
                normalised.push_str(&name);
                params.push((name, segment.to_string()));
                node = &**child;
            } else {
                return None;
            }
        }
        node.terminal.then_some((params, normalised))
    }
}

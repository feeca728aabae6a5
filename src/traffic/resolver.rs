use std::collections::HashMap;

use crate::traffic::node_id::NodeId;

/// Source of display names for new nodes.
///
/// `request_name` must answer immediately with a placeholder; a resolver
/// that learns a better name later reports it through
/// `EngineState::update_display_name`.
pub trait NameResolver {
    fn request_name(&mut self, id: &NodeId) -> String;
}

/// Names every node by its numeric address.
#[derive(Debug, Default)]
pub struct NumericResolver;

impl NameResolver for NumericResolver {
    fn request_name(&mut self, id: &NodeId) -> String {
        id.numeric_name()
    }
}

/// Fixed table of known names, numeric fallback otherwise. Loaded from an
/// ethers/hosts style file by the caller.
#[derive(Debug, Default)]
pub struct StaticResolver {
    names: HashMap<NodeId, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Parses `address name` lines. Blank lines and `#` comments are skipped,
    /// as are lines whose address does not parse.
    pub fn from_lines(contents: &str) -> Self {
        let mut resolver = Self::new();
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let mut fields = line.split_whitespace();
            if let (Some(addr), Some(name)) = (fields.next(), fields.next()) {
                if let Ok(id) = addr.parse::<NodeId>() {
                    resolver.insert(id, name);
                }
            }
        }
        resolver
    }
}

impl NameResolver for StaticResolver {
    fn request_name(&mut self, id: &NodeId) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.numeric_name())
    }
}

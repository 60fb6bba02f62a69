use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and debug output.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_uniqueness() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn node_ids_order_and_hash_consistently() {
        use std::collections::BTreeSet;
        let ids: BTreeSet<NodeId> = (0..16).map(|_| NodeId::new()).collect();
        assert_eq!(ids.len(), 16);
        let id = *ids.iter().next().unwrap();
        assert_eq!(id, NodeId(id.0));
        assert!(id.short().chars().all(|c| c.is_ascii_hexdigit()));
    }
}

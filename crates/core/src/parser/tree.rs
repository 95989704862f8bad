//! Arena-backed move tree
//!
//! Nodes are addressed by [`NodeId`]. `children[0]` of a node continues the
//! line it belongs to; `children[1..]` are alternatives to that continuation
//! played from the same position.

use serde::Serialize;

const NAG_MISTAKE: u8 = 2;
const NAG_BLUNDER: u8 = 4;
const NAG_DUBIOUS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One ply of a game, or the root (no move) of the tree
#[derive(Debug, Clone, Default)]
pub struct MoveNode {
    /// SAN with check suffix, `None` only for the root
    pub san: Option<String>,
    /// Numeric annotation glyphs, `!`/`?` included
    pub nags: Vec<u8>,
    pub comments: Vec<String>,
    pub children: Vec<NodeId>,
}

impl MoveNode {
    /// `?`, `??` or `?!`
    pub fn has_negative_glyph(&self) -> bool {
        self.nags
            .iter()
            .any(|&n| matches!(n, NAG_MISTAKE | NAG_BLUNDER | NAG_DUBIOUS))
    }

    /// Glyphs rendered the way they appear in movetext
    pub fn glyphs(&self) -> Vec<String> {
        self.nags.iter().map(|&n| glyph_text(n)).collect()
    }
}

pub fn glyph_text(nag: u8) -> String {
    match nag {
        1 => "!".to_string(),
        2 => "?".to_string(),
        3 => "!!".to_string(),
        4 => "??".to_string(),
        5 => "!?".to_string(),
        6 => "?!".to_string(),
        other => format!("${}", other),
    }
}

#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<MoveNode>,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![MoveNode::default()],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MoveNode {
        &mut self.nodes[id.0]
    }

    /// Appends `san` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, san: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MoveNode {
            san: Some(san),
            ..MoveNode::default()
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn mainline_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    /// Alternatives to the mainline continuation of `parent`
    pub fn alternatives(&self, parent: NodeId) -> &[NodeId] {
        self.node(parent).children.get(1..).unwrap_or(&[])
    }

    /// Node ids along the mainline, root excluded
    pub fn mainline(&self) -> Vec<NodeId> {
        let mut line = Vec::new();
        let mut current = self.root();
        while let Some(next) = self.mainline_child(current) {
            line.push(next);
            current = next;
        }
        line
    }

    pub fn mainline_len(&self) -> usize {
        self.mainline().len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

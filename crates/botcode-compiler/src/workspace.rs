//! Blockly JSON workspace
//!
//! Deserializes the editor's `Blockly.serialization.workspaces.save` output:
//!
//! ```json
//! { "blocks": { "languageVersion": 0, "blocks": [
//!     { "type": "start_hat", "next": { "block": { "type": "robot_stop" } } }
//! ] } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::{FieldValue, Mutation, Node, NodeTree};

/// A saved editor workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub blocks: BlockList,
}

/// Top-level block list of a workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockList {
    #[serde(default)]
    pub language_version: u32,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// A single block with its fields, inputs and successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_state: Option<ExtraState>,
    /// XML-era mutation attributes, still produced by older saves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<LegacyMutation>,
}

/// What is plugged into an input or next connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<Block>>,
}

impl Connection {
    /// The attached block, or the shadow block when nothing is attached.
    pub fn target(&self) -> Option<&Block> {
        self.block.as_deref().or(self.shadow.as_deref())
    }
}

/// `controls_if` extra state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraState {
    #[serde(default)]
    pub else_if_count: usize,
    #[serde(default)]
    pub has_else: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyMutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elseif: Option<FieldValue>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub has_else: Option<FieldValue>,
}

impl Workspace {
    /// Parse a workspace from its JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a workspace file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Build a workspace from top-level blocks.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: BlockList {
                language_version: 0,
                blocks,
            },
        }
    }
}

impl NodeTree for Workspace {
    type Node = Block;

    fn roots_of_kind(&self, kind: &str) -> Vec<&Block> {
        self.blocks.blocks.iter().filter(|b| b.kind == kind).collect()
    }
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            next: None,
            extra_state: None,
            mutation: None,
        }
    }

    /// A `math_number` literal block
    pub fn number(value: f64) -> Self {
        Self::new("math_number").with_field("NUM", value)
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_input(mut self, name: &str, block: Block) -> Self {
        self.inputs.insert(
            name.to_string(),
            Connection {
                block: Some(Box::new(block)),
                shadow: None,
            },
        );
        self
    }

    pub fn with_extra_state(mut self, else_if_count: usize, has_else: bool) -> Self {
        self.extra_state = Some(ExtraState {
            else_if_count,
            has_else,
        });
        self
    }

    /// Attach `next` at the end of this block's chain.
    pub fn then(mut self, next: Block) -> Self {
        self.append(next);
        self
    }

    fn append(&mut self, next: Block) {
        if let Some(block) = self.next.as_mut().and_then(|c| c.block.as_deref_mut()) {
            block.append(next);
            return;
        }
        self.next = Some(Connection {
            block: Some(Box::new(next)),
            shadow: None,
        });
    }

    /// Link blocks into a statement chain, first to last.
    pub fn chain(blocks: impl IntoIterator<Item = Block>) -> Option<Block> {
        let mut blocks: Vec<Block> = blocks.into_iter().collect();
        let mut head = blocks.pop()?;
        while let Some(mut prev) = blocks.pop() {
            prev.next = Some(Connection {
                block: Some(Box::new(head)),
                shadow: None,
            });
            head = prev;
        }
        Some(head)
    }
}

impl Node for Block {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    fn input(&self, name: &str) -> Option<&Block> {
        self.inputs.get(name).and_then(Connection::target)
    }

    fn next(&self) -> Option<&Block> {
        self.next.as_ref().and_then(Connection::target)
    }

    fn mutation(&self) -> Mutation {
        if let Some(state) = self.extra_state {
            return Mutation {
                else_if_count: state.else_if_count,
                has_else: state.has_else,
            };
        }
        match &self.mutation {
            Some(legacy) => Mutation {
                else_if_count: legacy
                    .elseif
                    .as_ref()
                    .and_then(FieldValue::to_integer)
                    .map_or(0, |n| n.max(0) as usize),
                has_else: legacy
                    .has_else
                    .as_ref()
                    .and_then(FieldValue::to_integer)
                    .is_some_and(|n| n != 0),
            },
            None => Mutation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_saved_workspace() {
        let json = r#"{
            "blocks": {
                "languageVersion": 0,
                "blocks": [
                    {
                        "type": "start_hat",
                        "id": "a1",
                        "x": 20, "y": 20,
                        "next": { "block": {
                            "type": "robot_move",
                            "inputs": {
                                "L": { "shadow": { "type": "math_number", "fields": { "NUM": 50 } } },
                                "R": {
                                    "shadow": { "type": "math_number", "fields": { "NUM": 10 } },
                                    "block": { "type": "math_number", "fields": { "NUM": 40 } }
                                }
                            }
                        } }
                    }
                ]
            }
        }"#;

        let ws = Workspace::from_json(json).expect("workspace should parse");
        let starts = ws.roots_of_kind("start_hat");
        assert_eq!(starts.len(), 1);

        let mv = starts[0].next().expect("chain should have a move block");
        assert_eq!(mv.kind(), "robot_move");
        // Shadow is used only when nothing is attached
        let left = mv.input("L").unwrap();
        assert_eq!(left.field("NUM").and_then(FieldValue::to_number), Some(50.0));
        let right = mv.input("R").unwrap();
        assert_eq!(right.field("NUM").and_then(FieldValue::to_number), Some(40.0));
    }

    #[test]
    fn test_if_mutation_sources() {
        let modern = Block::new("controls_if").with_extra_state(2, true);
        assert_eq!(
            modern.mutation(),
            Mutation {
                else_if_count: 2,
                has_else: true
            }
        );

        let legacy: Block = serde_json::from_str(
            r#"{ "type": "controls_if", "mutation": { "elseif": "1", "else": "1" } }"#,
        )
        .unwrap();
        assert_eq!(
            legacy.mutation(),
            Mutation {
                else_if_count: 1,
                has_else: true
            }
        );

        assert_eq!(Block::new("controls_if").mutation(), Mutation::default());
    }

    #[test]
    fn test_chain_links_in_order() {
        let head = Block::chain([
            Block::new("robot_stop"),
            Block::new("timer_reset"),
            Block::new("robot_stop"),
        ])
        .unwrap();

        let mut kinds = Vec::new();
        let mut cur = Some(&head);
        while let Some(block) = cur {
            kinds.push(block.kind().to_string());
            cur = block.next();
        }
        assert_eq!(kinds, ["robot_stop", "timer_reset", "robot_stop"]);
        assert!(Block::chain(Vec::new()).is_none());
    }

    #[test]
    fn test_then_appends_to_tail() {
        let head = Block::new("robot_stop")
            .then(Block::new("timer_reset"))
            .then(Block::new("wait_seconds"));
        let tail = head.next().and_then(Node::next).unwrap();
        assert_eq!(tail.kind(), "wait_seconds");
    }
}

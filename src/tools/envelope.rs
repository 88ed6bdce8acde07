//! Tool response envelope.
//!
//! Every tool answers with an [`Envelope`]: an ordered list of plain-text or
//! JSON blocks. On the wire the blocks become a single text content item, JSON
//! pretty-printed.

use rmcp::model::{CallToolResult, Content};
use serde_json::Value as JsonValue;

/// One block of a tool response.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(String),
    Json(JsonValue),
}

impl Block {
    fn render(&self) -> String {
        match self {
            Block::Text(text) => text.clone(),
            // Serializing a Value cannot fail; fall back to compact form anyway.
            Block::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// A successful tool response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    blocks: Vec<Block>,
}

impl Envelope {
    /// A response holding one plain-text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![Block::Text(text.into())],
        }
    }

    /// A response holding one JSON block.
    pub fn json(value: JsonValue) -> Self {
        Self {
            blocks: vec![Block::Json(value)],
        }
    }

    /// The JSON value of the first block, if it is a JSON block.
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self.blocks.first() {
            Some(Block::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// The text of the first block, if it is a plain-text block.
    pub fn as_text(&self) -> Option<&str> {
        match self.blocks.first() {
            Some(Block::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Render all blocks into the single text payload sent to the client.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(Block::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Envelope> for CallToolResult {
    fn from(envelope: Envelope) -> Self {
        CallToolResult::success(vec![Content::text(envelope.render())])
    }
}

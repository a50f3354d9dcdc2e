//! Annotation action model
//!
//! A `DrawAction` is one committed, immutable user edit. The geometry it
//! carries is decided by its `ActionKind`, so a stroke can never hold a
//! rectangle and a highlight can never hold text.

use crate::geometry::{Color, Point, SurfaceRect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session-unique action identifier. Never reused, even after undo or erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Annotation tools offered by the overlay.
///
/// `Eraser` and `None` never appear on a stored action: the eraser removes
/// actions instead of creating them, and `None` means no tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Draw,
    Highlight,
    Select,
    Text,
    Note,
    Eraser,
    #[default]
    None,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Draw => "draw",
            Tool::Highlight => "highlight",
            Tool::Select => "select",
            Tool::Text => "text",
            Tool::Note => "note",
            Tool::Eraser => "eraser",
            Tool::None => "none",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draw" => Ok(Tool::Draw),
            "highlight" => Ok(Tool::Highlight),
            "select" => Ok(Tool::Select),
            "text" => Ok(Tool::Text),
            "note" => Ok(Tool::Note),
            "eraser" => Ok(Tool::Eraser),
            "none" | "" => Ok(Tool::None),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

/// Tool-specific payload of an action.
///
/// Serialized with the tool name as the `tool` tag, so an action reads as
/// `{"id":1,"page":1,"tool":"draw","points":[...]}` and fields a tool does
/// not use are absent rather than empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum ActionKind {
    Draw {
        points: Vec<Point>,
    },
    Highlight {
        rect: SurfaceRect,
    },
    Select {
        rect: SurfaceRect,
    },
    Text {
        text: String,
        #[serde(rename = "textPos")]
        text_pos: Point,
    },
    Note {
        text: String,
        #[serde(rename = "textPos")]
        text_pos: Point,
    },
}

impl ActionKind {
    pub fn tool(&self) -> Tool {
        match self {
            ActionKind::Draw { .. } => Tool::Draw,
            ActionKind::Highlight { .. } => Tool::Highlight,
            ActionKind::Select { .. } => Tool::Select,
            ActionKind::Text { .. } => Tool::Text,
            ActionKind::Note { .. } => Tool::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawAction {
    pub id: ActionId,
    /// 1-based page number
    pub page: u32,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Overrides the tool's default color when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl DrawAction {
    pub fn new(id: ActionId, page: u32, kind: ActionKind) -> Self {
        Self {
            id,
            page,
            kind,
            color: None,
        }
    }

    pub fn stroke(id: ActionId, page: u32, points: Vec<Point>) -> Self {
        Self::new(id, page, ActionKind::Draw { points })
    }

    pub fn highlight(id: ActionId, page: u32, rect: SurfaceRect) -> Self {
        Self::new(id, page, ActionKind::Highlight { rect })
    }

    pub fn select(id: ActionId, page: u32, rect: SurfaceRect) -> Self {
        Self::new(id, page, ActionKind::Select { rect })
    }

    pub fn text(id: ActionId, page: u32, text: impl Into<String>, text_pos: Point) -> Self {
        Self::new(
            id,
            page,
            ActionKind::Text {
                text: text.into(),
                text_pos,
            },
        )
    }

    pub fn note(id: ActionId, page: u32, text: impl Into<String>, text_pos: Point) -> Self {
        Self::new(
            id,
            page,
            ActionKind::Note {
                text: text.into(),
                text_pos,
            },
        )
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn tool(&self) -> Tool {
        self.kind.tool()
    }
}

//! Pointer gesture capture for the annotation overlay
//!
//! Turns pointer-down/move/up events into committed actions on an
//! `ActionStore`. At most one edit gesture is in flight; move events outside
//! a gesture are ignored. Text and notes go through a pending anchor that the
//! UI fills in with `submit_text`.

use crate::action::{ActionId, DrawAction, Tool};
use crate::geometry::{Color, Point, SurfaceRect};
use crate::store::ActionStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// A highlight/select drag must be wider than this to commit
    pub min_rect_width: f64,
    /// ...and taller than this
    pub min_rect_height: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_rect_width: 5.0,
            min_rect_height: 5.0,
        }
    }
}

/// What a pointer event did to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    /// A drag started; nothing is committed until pointer up
    Started,
    Committed(ActionId),
    Erased(ActionId),
    /// A text or note anchor is waiting for `submit_text`
    AwaitingText { tool: Tool, page: u32, at: Point },
    /// The gesture ended without producing an action
    Discarded,
}

/// In-progress geometry for live rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview<'a> {
    Stroke(&'a [Point]),
    Rect { tool: Tool, rect: SurfaceRect },
}

#[derive(Debug, Clone)]
struct Drag {
    tool: Tool,
    page: u32,
    start: Point,
    points: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingText {
    tool: Tool,
    page: u32,
    at: Point,
}

#[derive(Debug, Clone, Default)]
pub struct Gesture {
    config: GestureConfig,
    color: Option<Color>,
    drag: Option<Drag>,
    pending: Option<PendingText>,
}

impl Gesture {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Color attached to subsequently committed actions (`None` = tool default).
    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color;
    }

    pub fn is_active(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(
        &mut self,
        store: &mut ActionStore,
        tool: Tool,
        page: u32,
        pos: Point,
    ) -> GestureOutcome {
        if self.drag.is_some() {
            return GestureOutcome::Ignored;
        }

        match tool {
            Tool::None => GestureOutcome::Ignored,
            Tool::Eraser => match store.erase_last_on_page(page) {
                Some(action) => GestureOutcome::Erased(action.id),
                None => GestureOutcome::Ignored,
            },
            Tool::Text | Tool::Note => {
                self.pending = Some(PendingText {
                    tool,
                    page,
                    at: pos,
                });
                GestureOutcome::AwaitingText { tool, page, at: pos }
            }
            Tool::Draw | Tool::Highlight | Tool::Select => {
                self.drag = Some(Drag {
                    tool,
                    page,
                    start: pos,
                    points: vec![pos],
                });
                GestureOutcome::Started
            }
        }
    }

    pub fn pointer_move(&mut self, pos: Point) {
        if let Some(drag) = &mut self.drag {
            drag.points.push(pos);
        }
    }

    pub fn pointer_up(&mut self, store: &mut ActionStore) -> GestureOutcome {
        let Some(drag) = self.drag.take() else {
            return GestureOutcome::Ignored;
        };

        let action = match drag.tool {
            Tool::Draw if drag.points.len() > 1 => {
                Some(DrawAction::stroke(store.next_id(), drag.page, drag.points))
            }
            Tool::Highlight | Tool::Select => {
                let end = drag.points.last().copied().unwrap_or(drag.start);
                let rect = SurfaceRect::from_corners(drag.start, end);
                if rect.exceeds(self.config.min_rect_width, self.config.min_rect_height) {
                    let id = store.next_id();
                    Some(if drag.tool == Tool::Highlight {
                        DrawAction::highlight(id, drag.page, rect)
                    } else {
                        DrawAction::select(id, drag.page, rect)
                    })
                } else {
                    None
                }
            }
            _ => None,
        };

        match action {
            Some(action) => GestureOutcome::Committed(self.commit(store, action)),
            None => GestureOutcome::Discarded,
        }
    }

    /// Leaving the surface mid-drag finishes the gesture like a pointer up.
    pub fn pointer_leave(&mut self, store: &mut ActionStore) -> GestureOutcome {
        self.pointer_up(store)
    }

    /// Fill in the pending text or note anchor.
    ///
    /// Text is committed when it has non-whitespace content, notes whenever
    /// they are non-empty. Either way the anchor is consumed.
    pub fn submit_text(&mut self, store: &mut ActionStore, text: &str) -> GestureOutcome {
        let Some(pending) = self.pending.take() else {
            return GestureOutcome::Ignored;
        };

        let action = match pending.tool {
            Tool::Text if !text.trim().is_empty() => Some(DrawAction::text(
                store.next_id(),
                pending.page,
                text,
                pending.at,
            )),
            Tool::Note if !text.is_empty() => Some(DrawAction::note(
                store.next_id(),
                pending.page,
                text,
                pending.at,
            )),
            _ => None,
        };

        match action {
            Some(action) => GestureOutcome::Committed(self.commit(store, action)),
            None => GestureOutcome::Discarded,
        }
    }

    pub fn cancel_text(&mut self) {
        self.pending = None;
    }

    pub fn pending_text(&self) -> Option<(Tool, u32, Point)> {
        self.pending.map(|p| (p.tool, p.page, p.at))
    }

    pub fn preview(&self) -> Option<Preview<'_>> {
        let drag = self.drag.as_ref()?;
        match drag.tool {
            Tool::Draw if drag.points.len() > 1 => Some(Preview::Stroke(&drag.points)),
            Tool::Highlight | Tool::Select => {
                let end = *drag.points.last()?;
                Some(Preview::Rect {
                    tool: drag.tool,
                    rect: SurfaceRect::from_corners(drag.start, end),
                })
            }
            _ => None,
        }
    }

    fn commit(&self, store: &mut ActionStore, mut action: DrawAction) -> ActionId {
        action.color = self.color;
        let id = action.id;
        store.add_action(action);
        id
    }
}

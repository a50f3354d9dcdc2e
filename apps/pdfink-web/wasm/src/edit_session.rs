//! Editor session for annotating a single PDF
//!
//! Wraps the core action store and gesture tracker behind a wasm-bindgen
//! object. The session owns its store; the UI never sees shared mutable state,
//! it calls into the session and re-reads snapshots.

use pdfink_core::{
    annotated_file_name, get_page_heights, ActionId, ActionStore, Color, Compositor, DrawAction,
    ExportStyle, Gesture, GestureConfig, GestureOutcome, PdfInkError, Point, Preview,
    SurfaceRect, Tool,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// In-progress gesture geometry handed to the overlay renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PreviewView {
    Stroke { points: Vec<Point> },
    Rect { tool: Tool, rect: SurfaceRect },
}

impl From<Preview<'_>> for PreviewView {
    fn from(preview: Preview<'_>) -> Self {
        match preview {
            Preview::Stroke(points) => PreviewView::Stroke {
                points: points.to_vec(),
            },
            Preview::Rect { tool, rect } => PreviewView::Rect { tool, rect },
        }
    }
}

/// Short label for a gesture outcome, as returned to JavaScript
fn outcome_label(outcome: GestureOutcome) -> &'static str {
    match outcome {
        GestureOutcome::Ignored => "ignored",
        GestureOutcome::Started => "started",
        GestureOutcome::Committed(_) => "committed",
        GestureOutcome::Erased(_) => "erased",
        GestureOutcome::AwaitingText { .. } => "awaitingText",
        GestureOutcome::Discarded => "discarded",
    }
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// Session for annotating a single PDF document
#[wasm_bindgen]
pub struct EditorSession {
    document_bytes: Vec<u8>,
    document_name: String,
    page_heights: Vec<f64>,
    store: ActionStore,
    gesture: Gesture,
    tool: Tool,
    style: ExportStyle,
}

#[wasm_bindgen]
impl EditorSession {
    /// Create a new session with the given PDF
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<EditorSession, JsValue> {
        let page_heights = get_page_heights(bytes).map_err(|e| js_error("Parse error", e))?;

        crate::log(&format!(
            "Opened {} ({} pages)",
            name,
            page_heights.len()
        ));

        Ok(EditorSession {
            document_bytes: bytes.to_vec(),
            document_name: name.to_string(),
            page_heights,
            store: ActionStore::new(),
            gesture: Gesture::new(GestureConfig::default()),
            tool: Tool::None,
            style: ExportStyle::default(),
        })
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.page_heights.len() as u32
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.document_name.clone()
    }

    /// Suggested download name for the exported copy
    #[wasm_bindgen(getter, js_name = exportFileName)]
    pub fn export_file_name(&self) -> String {
        annotated_file_name(&self.document_name)
    }

    /// Height of a 1-indexed page in document units, for the y flip
    #[wasm_bindgen(js_name = pageHeight)]
    pub fn page_height(&self, page: u32) -> Option<f64> {
        let index = (page as usize).checked_sub(1)?;
        self.page_heights.get(index).copied()
    }

    /// Get document bytes for PDF.js rendering
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.document_bytes[..])
    }

    // ============ Tool state ============

    #[wasm_bindgen(getter)]
    pub fn tool(&self) -> String {
        self.tool.to_string()
    }

    /// Tool names: "draw", "highlight", "select", "text", "note", "eraser", "none"
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, tool: &str) -> Result<(), JsValue> {
        self.tool = tool.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.gesture.cancel_text();
        Ok(())
    }

    /// CSS color for new actions; `undefined` restores the tool defaults
    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&mut self, color: Option<String>) -> Result<(), JsValue> {
        let color = match color {
            Some(css) => Some(
                Color::parse(&css)
                    .ok_or_else(|| JsValue::from_str(&format!("Invalid color: {}", css)))?,
            ),
            None => None,
        };
        self.gesture.set_color(color);
        Ok(())
    }

    /// Replace the export style from JSON; missing keys keep their defaults
    #[wasm_bindgen(js_name = setStyleJson)]
    pub fn set_style_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.style = serde_json::from_str(json).map_err(|e| js_error("Invalid style JSON", e))?;
        Ok(())
    }

    // ============ Pointer gestures ============

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, page: u32, x: f64, y: f64) -> String {
        let outcome =
            self.gesture
                .pointer_down(&mut self.store, self.tool, page, Point::new(x, y));
        outcome_label(outcome).to_string()
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.gesture.pointer_move(Point::new(x, y));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> String {
        outcome_label(self.gesture.pointer_up(&mut self.store)).to_string()
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) -> String {
        outcome_label(self.gesture.pointer_leave(&mut self.store)).to_string()
    }

    /// Commit the pending text or note; returns true if an action was added
    #[wasm_bindgen(js_name = submitText)]
    pub fn submit_text(&mut self, text: &str) -> bool {
        matches!(
            self.gesture.submit_text(&mut self.store, text),
            GestureOutcome::Committed(_)
        )
    }

    #[wasm_bindgen(js_name = cancelText)]
    pub fn cancel_text(&mut self) {
        self.gesture.cancel_text();
    }

    /// In-progress stroke or rectangle, or null when nothing is being dragged
    #[wasm_bindgen(js_name = getPreview)]
    pub fn get_preview(&self) -> Result<JsValue, JsValue> {
        match self.preview_view() {
            Some(view) => {
                serde_wasm_bindgen::to_value(&view).map_err(|e| js_error("Serialization error", e))
            }
            None => Ok(JsValue::NULL),
        }
    }

    // ============ History ============

    /// Undo the last action. Returns its id, or undefined if nothing to undo.
    #[wasm_bindgen]
    pub fn undo(&mut self) -> Option<u64> {
        self.store.undo().map(|id| id.0)
    }

    /// Redo the last undone action. Returns its id, or undefined.
    #[wasm_bindgen]
    pub fn redo(&mut self) -> Option<u64> {
        self.store.redo().map(|id| id.0)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Remove every action on a page. Returns how many were removed.
    #[wasm_bindgen(js_name = clearPage)]
    pub fn clear_page(&mut self, page: u32) -> usize {
        self.store.clear_page(page)
    }

    /// Remove the most recent action on a page without going through the eraser tool
    #[wasm_bindgen(js_name = eraseLast)]
    pub fn erase_last(&mut self, page: u32) -> Option<u64> {
        self.store.erase_last_on_page(page).map(|action| action.id.0)
    }

    #[wasm_bindgen(js_name = removeAction)]
    pub fn remove_action(&mut self, id: u64) -> bool {
        self.store.remove_action(ActionId(id)).is_some()
    }

    /// Add a fully-formed action (e.g. restored from a saved session).
    /// The id in the JSON is replaced with a fresh one, which is returned.
    #[wasm_bindgen(js_name = addActionJson)]
    pub fn add_action_json(&mut self, json: &str) -> Result<u64, JsValue> {
        let mut action: DrawAction =
            serde_json::from_str(json).map_err(|e| js_error("Invalid action JSON", e))?;
        action.id = self.store.next_id();
        let id = action.id.0;
        self.store.add_action(action);
        Ok(id)
    }

    #[wasm_bindgen(js_name = hasChanges)]
    pub fn has_changes(&self) -> bool {
        !self.store.is_empty()
    }

    #[wasm_bindgen(js_name = getActionCount)]
    pub fn get_action_count(&self) -> usize {
        self.store.len()
    }

    /// Committed actions of one page as JSON, for redrawing the overlay
    #[wasm_bindgen(js_name = getPageActionsJson)]
    pub fn get_page_actions_json(&self, page: u32) -> Result<String, JsValue> {
        serde_json::to_string(&self.store.actions_for_page(page))
            .map_err(|e| js_error("Serialization error", e))
    }

    /// Whole store (committed and undone) as JSON, for debugging/persistence
    #[wasm_bindgen(js_name = getActionsJson)]
    pub fn get_actions_json(&self) -> Result<String, JsValue> {
        self.store
            .to_json()
            .map_err(|e| js_error("Serialization error", e))
    }

    // ============ Export ============

    /// Bake all committed actions into a copy of the document
    pub fn export(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self
            .render_bytes()
            .map_err(|e| js_error("Export error", e))?;
        Ok(js_sys::Uint8Array::from(&bytes[..]))
    }

    /// Same as `export`, resolved through a Promise.
    ///
    /// Works on a snapshot, so edits made while the export is pending do not
    /// leak into the output.
    #[wasm_bindgen(js_name = exportAsync)]
    pub fn export_async(&self) -> js_sys::Promise {
        let source = self.document_bytes.clone();
        let actions = self.store.snapshot();
        let compositor = Compositor::new(self.style.clone());

        future_to_promise(async move {
            let bytes = compositor
                .render(&source, &actions)
                .map_err(|e| js_error("Export error", e))?;
            crate::log(&format!("Exported {} actions ({} bytes)", actions.len(), bytes.len()));
            Ok(js_sys::Uint8Array::from(&bytes[..]).into())
        })
    }
}

impl EditorSession {
    pub fn store(&self) -> &ActionStore {
        &self.store
    }

    fn preview_view(&self) -> Option<PreviewView> {
        self.gesture.preview().map(PreviewView::from)
    }

    fn render_bytes(&self) -> Result<Vec<u8>, PdfInkError> {
        Compositor::new(self.style.clone()).render(&self.document_bytes, self.store.actions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 800.into()],
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        });
        if let Ok(page) = doc.get_object_mut(page_id) {
            if let Ok(dict) = page.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn session() -> EditorSession {
        EditorSession::new("report.pdf", &create_test_pdf()).unwrap()
    }

    #[test]
    fn test_editor_session_creation() {
        let session = session();
        assert_eq!(session.document_name(), "report.pdf");
        assert_eq!(session.export_file_name(), "report_annotated.pdf");
        assert_eq!(session.page_count(), 1);
        assert_eq!(session.page_height(1), Some(800.0));
        assert_eq!(session.page_height(0), None);
        assert_eq!(session.tool(), "none");
        assert!(!session.has_changes());
    }

    #[test]
    fn test_no_tool_ignores_pointer() {
        let mut session = session();
        assert_eq!(session.pointer_down(1, 10.0, 10.0), "ignored");
        session.pointer_move(50.0, 50.0);
        assert_eq!(session.pointer_up(), "ignored");
        assert!(!session.has_changes());
    }

    #[test]
    fn test_draw_gesture_and_undo_redo() {
        let mut session = session();
        session.set_tool("draw").unwrap();

        assert_eq!(session.pointer_down(1, 0.0, 0.0), "started");
        session.pointer_move(10.0, 10.0);
        assert_eq!(session.pointer_up(), "committed");
        assert!(session.can_undo());
        assert!(!session.can_redo());

        let id = session.undo().unwrap();
        assert!(session.can_redo());
        assert_eq!(session.redo(), Some(id));
        assert_eq!(session.get_action_count(), 1);
    }

    #[test]
    fn test_highlight_preview_then_commit() {
        let mut session = session();
        session.set_tool("highlight").unwrap();
        session.pointer_down(1, 100.0, 100.0);
        session.pointer_move(60.0, 140.0);

        assert_eq!(
            session.preview_view(),
            Some(PreviewView::Rect {
                tool: Tool::Highlight,
                rect: SurfaceRect::new(60.0, 100.0, 40.0, 40.0),
            })
        );
        assert_eq!(session.pointer_leave(), "committed");
        assert_eq!(session.preview_view(), None);
    }

    #[test]
    fn test_text_and_note_submission() {
        let mut session = session();
        session.set_tool("text").unwrap();
        assert_eq!(session.pointer_down(1, 50.0, 50.0), "awaitingText");
        assert!(session.submit_text("Q3"));

        session.set_tool("note").unwrap();
        session.pointer_down(1, 200.0, 200.0);
        assert!(!session.submit_text(""));
        assert_eq!(session.get_action_count(), 1);
    }

    #[test]
    fn test_eraser_and_clear_page() {
        let mut session = session();
        session.set_tool("draw").unwrap();
        for offset in [0.0, 20.0, 40.0] {
            session.pointer_down(1, offset, offset);
            session.pointer_move(offset + 10.0, offset + 10.0);
            session.pointer_up();
        }

        session.set_tool("eraser").unwrap();
        assert_eq!(session.pointer_down(1, 0.0, 0.0), "erased");
        assert_eq!(session.get_action_count(), 2);

        assert_eq!(session.clear_page(1), 2);
        assert!(!session.has_changes());
        assert!(!session.can_redo());
    }

    #[test]
    fn test_add_action_json_assigns_fresh_id() {
        let mut session = session();
        let first = session
            .add_action_json(r#"{"id": 40, "page": 1, "tool": "text", "text": "hi", "textPos": {"x": 1, "y": 2}}"#)
            .unwrap();
        let second = session
            .add_action_json(r#"{"id": 40, "page": 1, "tool": "text", "text": "again", "textPos": {"x": 1, "y": 2}}"#)
            .unwrap();
        assert_ne!(first, second);
        assert!(session.remove_action(first));
        assert!(!session.remove_action(first));
    }

    #[test]
    fn test_set_tool_updates_current_tool() {
        let mut session = session();
        session.set_tool("select").unwrap();
        assert_eq!(session.tool(), "select");
    }

    #[test]
    fn test_export_bytes_contain_annotation() {
        let mut session = session();
        session.set_tool("text").unwrap();
        session.pointer_down(1, 50.0, 50.0);
        session.submit_text("Q3");

        let bytes = session.render_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(pdfink_core::get_page_count(&bytes).unwrap(), 1);
        assert_eq!(session.store().len(), 1);
    }

    // Methods returning JsValue/Uint8Array only run under wasm-bindgen-test
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    fn pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[wasm_bindgen_test]
    async fn test_export_async_resolves_to_pdf() {
        let mut session = EditorSession::new("a.pdf", &pdf()).unwrap();
        session.set_tool("select").unwrap();
        session.pointer_down(1, 10.0, 10.0);
        session.pointer_move(100.0, 100.0);
        session.pointer_up();

        let value = JsFuture::from(session.export_async()).await.unwrap();
        let bytes = js_sys::Uint8Array::new(&value).to_vec();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[wasm_bindgen_test]
    fn test_set_tool_unknown_is_error() {
        let mut session = EditorSession::new("a.pdf", &pdf()).unwrap();
        assert!(session.set_tool("lasso").is_err());
        assert!(session.get_preview().unwrap().is_null());
    }
}

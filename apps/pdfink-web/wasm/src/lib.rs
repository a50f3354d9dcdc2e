//! WASM bindings for PDF ink annotations
//!
//! The browser UI forwards pointer events and tool changes to an
//! `EditorSession`; all annotation state, undo/redo and export live in Rust.
//! JavaScript only renders pages (PDF.js), draws the live overlay and does
//! file I/O.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { EditorSession } from './pkg/pdfink_wasm.js';
//!
//! await init();
//!
//! const session = new EditorSession("report.pdf", bytes);
//! session.setTool("highlight");
//! session.pointerDown(1, 100, 100);
//! session.pointerMove(220, 140);
//! session.pointerUp();
//!
//! const pdf = await session.exportAsync();
//! downloadBlob(pdf, session.exportFileName);
//! ```

pub mod edit_session;

use wasm_bindgen::prelude::*;

pub use edit_session::EditorSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    log("pdfink WASM initialized");
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfink_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Output name for an annotated copy of `name`
#[wasm_bindgen]
pub fn annotated_file_name(name: &str) -> String {
    pdfink_core::annotated_file_name(name)
}

/// Log to the browser console; a no-op off wasm
pub(crate) fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&message.into());

    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

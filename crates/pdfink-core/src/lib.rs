//! PDF ink annotations
//!
//! This crate records freehand strokes, highlights, selections, placed text
//! and sticky notes against the pages of a PDF, with linear undo/redo, and
//! bakes them into the page content streams on export using lopdf.
//!
//! - `store::ActionStore`: per-session action history
//! - `gesture::Gesture`: pointer events to committed actions
//! - `compositor::Compositor`: renders the history into a copy of the source PDF

pub mod action;
pub mod compositor;
pub mod coords;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod store;
pub mod style;

pub use action::{ActionId, ActionKind, DrawAction, Tool};
pub use compositor::{annotated_file_name, render_annotations, Compositor, ExportReport};
pub use coords::{to_document_point, to_document_rect};
pub use error::PdfInkError;
pub use geometry::{Color, PdfRect, Point, SurfaceRect};
pub use gesture::{Gesture, GestureConfig, GestureOutcome, Preview};
pub use store::ActionStore;
pub use style::ExportStyle;

fn load(bytes: &[u8]) -> Result<lopdf::Document, PdfInkError> {
    lopdf::Document::load_mem(bytes).map_err(|e| PdfInkError::ParseError(e.to_string()))
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfInkError> {
    Ok(load(bytes)?.get_pages().len() as u32)
}

/// Height of every page in document units, in page order.
///
/// This is the page height lookup used to flip surface coordinates; it reads
/// the effective (possibly inherited) MediaBox of each page.
pub fn get_page_heights(bytes: &[u8]) -> Result<Vec<f64>, PdfInkError> {
    let doc = load(bytes)?;
    Ok(doc
        .get_pages()
        .values()
        .map(|&id| compositor::page_height(&doc, id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = [(612i64, 792i64), (300, 400)]
            .iter()
            .map(|&(w, h)| {
                let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
                    "Contents" => Object::Reference(content_id),
                });
                Object::Reference(page_id)
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_page_count() {
        assert_eq!(get_page_count(&two_page_pdf()).unwrap(), 2);
    }

    #[test]
    fn test_page_heights() {
        assert_eq!(get_page_heights(&two_page_pdf()).unwrap(), vec![792.0, 400.0]);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            get_page_count(b"not a pdf"),
            Err(PdfInkError::ParseError(_))
        ));
    }
}

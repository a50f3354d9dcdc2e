//! Coordinate transformation between the annotation surface and PDF page space
//!
//! The surface has its origin at the top-left with y increasing downward.
//! PDF user space has its origin at the bottom-left with y increasing upward.
//! Both use the same unit, so only the y axis needs flipping against the
//! page height.

use crate::geometry::{PdfRect, Point, SurfaceRect};

/// Convert a surface point to PDF coordinates (flip Y axis)
pub fn to_document_point(p: Point, page_height: f64) -> Point {
    Point {
        x: p.x,
        y: page_height - p.y,
    }
}

/// Convert a PDF point back to surface coordinates
pub fn from_document_point(p: Point, page_height: f64) -> Point {
    Point {
        x: p.x,
        y: page_height - p.y,
    }
}

/// Convert a surface rectangle to a PDF rectangle anchored at its bottom edge
pub fn to_document_rect(rect: SurfaceRect, page_height: f64) -> PdfRect {
    PdfRect {
        x: rect.x,
        y: page_height - rect.y - rect.h,
        width: rect.w,
        height: rect.h,
    }
}

/// Convert a PDF rectangle back to a surface rectangle anchored at its top edge
pub fn from_document_rect(rect: PdfRect, page_height: f64) -> SurfaceRect {
    SurfaceRect {
        x: rect.x,
        y: page_height - rect.y - rect.height,
        w: rect.width,
        h: rect.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_y_axis_flip() {
        let p = to_document_point(Point::new(50.0, 50.0), 800.0);
        assert_eq!(p, Point::new(50.0, 750.0));
    }

    #[test]
    fn test_top_left_maps_to_page_top() {
        let p = to_document_point(Point::new(0.0, 0.0), 792.0);
        assert_eq!(p, Point::new(0.0, 792.0));
    }

    #[test]
    fn test_rect_anchors_bottom_edge() {
        let rect = to_document_rect(SurfaceRect::new(10.0, 20.0, 30.0, 40.0), 800.0);
        assert_eq!(rect.y, 800.0 - 20.0 - 40.0);
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.width, 30.0);
        assert_eq!(rect.height, 40.0);
    }

    #[test]
    fn test_rect_round_trip() {
        let rect = SurfaceRect::new(12.5, 300.25, 80.0, 16.0);
        let back = from_document_rect(to_document_rect(rect, 842.0), 842.0);
        assert_eq!(back, rect);
    }
}

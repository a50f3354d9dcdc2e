//! Bake annotation actions into PDF page content
//!
//! Unlike annotation dictionaries, everything here is written straight into
//! each page's content stream, so the marks survive in every viewer and can
//! no longer be moved or deleted.
//!
//! Per touched page the compositor:
//! 1. wraps the existing content in `q ... Q` so a dangling graphics state in
//!    the source cannot leak into the overlay,
//! 2. appends one content stream with the page's actions in history order,
//! 3. merges the shared Helvetica font and any opacity `ExtGState`s into the
//!    page resources (resolving inherited resources first).

use crate::action::{ActionKind, DrawAction};
use crate::coords::{to_document_point, to_document_rect};
use crate::error::PdfInkError;
use crate::geometry::{Color, PdfRect, Point, SurfaceRect};
use crate::layout::{win_ansi_bytes, wrap_words, HelveticaMetrics};
use crate::style::ExportStyle;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Letter size, used when a page tree carries no MediaBox at all
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
/// Guards the Parent walk against malformed (cyclic) page trees
const MAX_INHERIT_DEPTH: usize = 32;
const FONT_KEY: &str = "FInk";
const GSTATE_KEY: &str = "GSInk";

/// Summary of one export run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub page_count: u32,
    pub rendered: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    style: ExportStyle,
}

impl Compositor {
    pub fn new(style: ExportStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ExportStyle {
        &self.style
    }

    /// Render `actions` onto a copy of `source` and return the new PDF bytes.
    pub fn render(&self, source: &[u8], actions: &[DrawAction]) -> Result<Vec<u8>, PdfInkError> {
        self.render_with_report(source, actions)
            .map(|(bytes, _)| bytes)
    }

    pub fn render_with_report(
        &self,
        source: &[u8],
        actions: &[DrawAction],
    ) -> Result<(Vec<u8>, ExportReport), PdfInkError> {
        let mut doc =
            Document::load_mem(source).map_err(|e| PdfInkError::ParseError(e.to_string()))?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let mut report = ExportReport {
            page_count: pages.len() as u32,
            ..Default::default()
        };

        let mut shared = SharedResources::default();
        let mut canvases: BTreeMap<usize, PageCanvas> = BTreeMap::new();

        // History order: later actions paint over earlier ones on the same page
        for action in actions {
            let page_index = match (action.page as usize).checked_sub(1) {
                Some(index) if index < pages.len() => index,
                _ => {
                    tracing::warn!(
                        id = %action.id,
                        page = action.page,
                        page_count = pages.len(),
                        "skipping action on missing page"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let canvas = match canvases.entry(page_index) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(PageCanvas::open(&doc, pages[page_index])?)
                }
            };

            if self.draw_action(&mut doc, &mut shared, canvas, action)? {
                report.rendered += 1;
            } else {
                tracing::debug!(id = %action.id, tool = %action.tool(), "skipping inconsistent action");
                report.skipped += 1;
            }
        }

        for canvas in canvases.into_values() {
            canvas.finish(&mut doc)?;
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| PdfInkError::SerializationError(e.to_string()))?;

        tracing::info!(
            pages = report.page_count,
            rendered = report.rendered,
            skipped = report.skipped,
            bytes = output.len(),
            "export complete"
        );

        Ok((output, report))
    }

    /// Returns `Ok(false)` when the action's geometry cannot be drawn.
    fn draw_action(
        &self,
        doc: &mut Document,
        shared: &mut SharedResources,
        canvas: &mut PageCanvas,
        action: &DrawAction,
    ) -> Result<bool, PdfInkError> {
        let style = &self.style;
        let h = canvas.height;

        match &action.kind {
            ActionKind::Draw { points } => {
                if points.len() < 2 || !points.iter().all(|p| finite_point(*p)) {
                    return Ok(false);
                }
                let color = action.color.unwrap_or(style.draw_color);
                let mut segments = 0;
                for pair in points.windows(2) {
                    let (from, to) = (pair[0], pair[1]);
                    if (to.x - from.x).hypot(to.y - from.y) < style.min_segment_length {
                        continue;
                    }
                    canvas.draw_line(
                        to_document_point(from, h),
                        to_document_point(to, h),
                        style.stroke_width,
                        color,
                    );
                    segments += 1;
                }
                if segments == 0 {
                    return Ok(false);
                }
            }
            ActionKind::Highlight { rect } => {
                if !valid_rect(rect) {
                    return Ok(false);
                }
                let color = action.color.unwrap_or(style.accent_color);
                let gs = canvas.gstate(
                    doc,
                    shared,
                    style.highlight_fill_opacity,
                    style.highlight_border_opacity,
                )?;
                canvas.draw_rectangle(
                    to_document_rect(*rect, h),
                    &RectPaint {
                        fill: Some(color),
                        border: Some((color, style.highlight_border_width)),
                        dash: &[],
                        gstate: Some(gs),
                    },
                );
            }
            ActionKind::Select { rect } => {
                if !valid_rect(rect) {
                    return Ok(false);
                }
                let color = action.color.unwrap_or(style.accent_color);
                canvas.draw_rectangle(
                    to_document_rect(*rect, h),
                    &RectPaint {
                        fill: None,
                        border: Some((color, style.select_border_width)),
                        dash: &style.select_dash,
                        gstate: None,
                    },
                );
            }
            ActionKind::Text { text, text_pos } => {
                if text.is_empty() || !finite_point(*text_pos) {
                    return Ok(false);
                }
                let font = canvas.font(doc, shared)?;
                let color = action.color.unwrap_or(style.text_color);
                canvas.draw_text(
                    &font,
                    text,
                    to_document_point(*text_pos, h),
                    style.text_size,
                    color,
                );
            }
            ActionKind::Note { text, text_pos } => {
                if !finite_point(*text_pos) {
                    return Ok(false);
                }
                self.draw_note(doc, shared, canvas, text, *text_pos, action.color)?;
            }
        }

        Ok(true)
    }

    fn draw_note(
        &self,
        doc: &mut Document,
        shared: &mut SharedResources,
        canvas: &mut PageCanvas,
        text: &str,
        anchor: Point,
        color: Option<Color>,
    ) -> Result<(), PdfInkError> {
        let style = &self.style;
        let h = canvas.height;

        // The anchor is the note's top-left corner on the surface
        let body = SurfaceRect::new(anchor.x, anchor.y, style.note_width, style.note_height);
        canvas.draw_rectangle(
            to_document_rect(body, h),
            &RectPaint {
                fill: Some(style.note_fill),
                border: Some((style.note_border, style.note_border_width)),
                dash: &[],
                gstate: None,
            },
        );

        let lines = wrap_words(
            text,
            style.note_font_size,
            style.note_wrap_width,
            &HelveticaMetrics,
        );
        if lines.is_empty() {
            return Ok(());
        }

        let font = canvas.font(doc, shared)?;
        let ink = color.unwrap_or(style.text_color);
        let mut baseline = anchor.y + style.note_first_baseline;
        for line in &lines {
            // No line cap: long notes run past the bottom of the box
            let origin = Point::new(anchor.x + style.note_padding, baseline);
            canvas.draw_text(
                &font,
                line,
                to_document_point(origin, h),
                style.note_font_size,
                ink,
            );
            baseline += style.note_line_height;
        }
        Ok(())
    }
}

/// Render with the default style.
pub fn render_annotations(source: &[u8], actions: &[DrawAction]) -> Result<Vec<u8>, PdfInkError> {
    Compositor::default().render(source, actions)
}

/// `<stem>_annotated.<ext>`, the conventional name for an exported copy.
pub fn annotated_file_name(original: &str) -> String {
    match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_annotated.{}", stem, ext),
        _ => format!("{}_annotated", original),
    }
}

fn finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn valid_rect(rect: &SurfaceRect) -> bool {
    [rect.x, rect.y, rect.w, rect.h].iter().all(|v| v.is_finite()) && rect.w >= 0.0 && rect.h >= 0.0
}

/// Document-level objects created at most once per export
#[derive(Default)]
struct SharedResources {
    font: Option<ObjectId>,
    /// Keyed by (fill alpha, stroke alpha) in thousandths
    gstates: HashMap<(u32, u32), ObjectId>,
}

impl SharedResources {
    fn font(&mut self, doc: &mut Document) -> ObjectId {
        *self.font.get_or_insert_with(|| {
            tracing::debug!("embedding Helvetica");
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    fn gstate(&mut self, doc: &mut Document, fill_alpha: f64, stroke_alpha: f64) -> ObjectId {
        let key = (alpha_key(fill_alpha), alpha_key(stroke_alpha));
        *self.gstates.entry(key).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(fill_alpha as f32),
                "CA" => Object::Real(stroke_alpha as f32),
            })
        })
    }
}

fn alpha_key(alpha: f64) -> u32 {
    (alpha.clamp(0.0, 1.0) * 1000.0).round() as u32
}

struct RectPaint<'a> {
    fill: Option<Color>,
    border: Option<(Color, f64)>,
    dash: &'a [f64],
    gstate: Option<Vec<u8>>,
}

/// Drawing surface for one page: collects operators and resource entries
/// until `finish` writes them back into the document.
struct PageCanvas {
    page_id: ObjectId,
    height: f64,
    origin: (f64, f64),
    resources: Dictionary,
    /// Resolved on first use, so a malformed category only fails pages that need it
    fonts: Option<Dictionary>,
    gstates: Option<Dictionary>,
    font_name: Option<Vec<u8>>,
    gstate_names: HashMap<ObjectId, Vec<u8>>,
    ops: Vec<Operation>,
}

impl PageCanvas {
    fn open(doc: &Document, page_id: ObjectId) -> Result<Self, PdfInkError> {
        let [x0, y0, x1, y1] = media_box(doc, page_id);
        let resources = effective_resources(doc, page_id);

        Ok(Self {
            page_id,
            height: y1 - y0,
            origin: (x0, y0),
            resources,
            fonts: None,
            gstates: None,
            font_name: None,
            gstate_names: HashMap::new(),
            ops: Vec::new(),
        })
    }

    fn font(
        &mut self,
        doc: &mut Document,
        shared: &mut SharedResources,
    ) -> Result<Vec<u8>, PdfInkError> {
        if let Some(name) = &self.font_name {
            return Ok(name.clone());
        }
        let mut fonts = match self.fonts.take() {
            Some(fonts) => fonts,
            None => sub_dictionary(doc, &self.resources, b"Font").ok_or_else(|| {
                PdfInkError::FontEmbedError(format!(
                    "page {:?} has a malformed /Font resource",
                    self.page_id
                ))
            })?,
        };
        let font_id = shared.font(doc);
        let name = unique_key(&fonts, FONT_KEY);
        fonts.set(name.clone(), Object::Reference(font_id));
        self.fonts = Some(fonts);
        self.font_name = Some(name.clone());
        Ok(name)
    }

    fn gstate(
        &mut self,
        doc: &mut Document,
        shared: &mut SharedResources,
        fill_alpha: f64,
        stroke_alpha: f64,
    ) -> Result<Vec<u8>, PdfInkError> {
        let mut gstates = match self.gstates.take() {
            Some(gstates) => gstates,
            None => sub_dictionary(doc, &self.resources, b"ExtGState").ok_or_else(|| {
                PdfInkError::OperationError(format!(
                    "page {:?} has a malformed /ExtGState resource",
                    self.page_id
                ))
            })?,
        };
        let gs_id = shared.gstate(doc, fill_alpha, stroke_alpha);
        let name = match self.gstate_names.get(&gs_id) {
            Some(name) => name.clone(),
            None => {
                let name = unique_key(&gstates, GSTATE_KEY);
                gstates.set(name.clone(), Object::Reference(gs_id));
                self.gstate_names.insert(gs_id, name.clone());
                name
            }
        };
        self.gstates = Some(gstates);
        Ok(name)
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.push("RG", vec![real(color.r), real(color.g), real(color.b)]);
    }

    fn set_fill_color(&mut self, color: Color) {
        self.push("rg", vec![real(color.r), real(color.g), real(color.b)]);
    }

    fn draw_line(&mut self, start: Point, end: Point, thickness: f64, color: Color) {
        self.push("q", vec![]);
        self.set_stroke_color(color);
        self.push("w", vec![num(thickness)]);
        // Round caps join consecutive segments of a freehand stroke
        self.push("J", vec![Object::Integer(1)]);
        self.push("m", vec![num(start.x), num(start.y)]);
        self.push("l", vec![num(end.x), num(end.y)]);
        self.push("S", vec![]);
        self.push("Q", vec![]);
    }

    fn draw_rectangle(&mut self, rect: PdfRect, paint: &RectPaint<'_>) {
        self.push("q", vec![]);
        if let Some(name) = &paint.gstate {
            self.push("gs", vec![Object::Name(name.clone())]);
        }
        if let Some(fill) = paint.fill {
            self.set_fill_color(fill);
        }
        if let Some((color, width)) = paint.border {
            self.set_stroke_color(color);
            self.push("w", vec![num(width)]);
            if !paint.dash.is_empty() {
                let pattern = paint.dash.iter().map(|v| num(*v)).collect();
                self.push("d", vec![Object::Array(pattern), Object::Integer(0)]);
            }
        }
        self.push(
            "re",
            vec![num(rect.x), num(rect.y), num(rect.width), num(rect.height)],
        );
        let paint_op = match (paint.fill.is_some(), paint.border.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => "n",
        };
        self.push(paint_op, vec![]);
        self.push("Q", vec![]);
    }

    fn draw_text(&mut self, font: &[u8], text: &str, baseline: Point, size: f64, color: Color) {
        self.push("BT", vec![]);
        self.push("Tf", vec![Object::Name(font.to_vec()), num(size)]);
        self.set_fill_color(color);
        self.push("Td", vec![num(baseline.x), num(baseline.y)]);
        self.push(
            "Tj",
            vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    /// Write the collected operators and resources back into the page.
    fn finish(self, doc: &mut Document) -> Result<(), PdfInkError> {
        let page_id = self.page_id;
        let existing = existing_contents(doc, page_id);

        let mut operations = Vec::with_capacity(self.ops.len() + 3);
        if !existing.is_empty() {
            // Closes the `q` prepended in front of the original content
            operations.push(Operation::new("Q", vec![]));
        }
        operations.push(Operation::new("q", vec![]));
        if self.origin != (0.0, 0.0) {
            operations.push(Operation::new(
                "cm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    num(self.origin.0),
                    num(self.origin.1),
                ],
            ));
        }
        operations.extend(self.ops);
        operations.push(Operation::new("Q", vec![]));

        // Leading newline keeps the first operator apart from the previous
        // stream's last token when readers concatenate page contents
        let mut overlay = b"\n".to_vec();
        overlay.extend(
            Content { operations }
                .encode()
                .map_err(|e| PdfInkError::OperationError(e.to_string()))?,
        );
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
        }
        contents.push(Object::Reference(overlay_id));

        let mut resources = self.resources;
        if let Some(fonts) = self.fonts {
            resources.set("Font", Object::Dictionary(fonts));
        }
        if let Some(gstates) = self.gstates {
            resources.set("ExtGState", Object::Dictionary(gstates));
        }

        let page = doc
            .get_object_mut(page_id)
            .and_then(|obj| obj.as_dict_mut())
            .map_err(|e| PdfInkError::OperationError(e.to_string()))?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));

        Ok(())
    }
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn num(v: f64) -> Object {
    Object::Real(v as f32)
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// Effective MediaBox as `[x0, y0, x1, y1]`, normalized so x0 <= x1 and y0 <= y1.
fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let parsed = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            let values: Vec<f64> = array
                .iter()
                .filter_map(|v| resolve(doc, v).and_then(as_number))
                .collect();
            (values.len() == 4).then(|| {
                [
                    values[0].min(values[2]),
                    values[1].min(values[3]),
                    values[0].max(values[2]),
                    values[1].max(values[3]),
                ]
            })
        });
    parsed.unwrap_or(DEFAULT_MEDIA_BOX)
}

/// Page height in PDF units, taken from the effective MediaBox.
pub fn page_height(doc: &Document, page_id: ObjectId) -> f64 {
    let [_, y0, _, y1] = media_box(doc, page_id);
    y1 - y0
}

fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// Owned copy of a resource category. `None` when present but not a dictionary.
fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Option<Dictionary> {
    match resources.get(key) {
        Ok(obj) => resolve(doc, obj)
            .and_then(|o| o.as_dict().ok())
            .cloned(),
        Err(_) => Some(Dictionary::new()),
    }
}

fn unique_key(dict: &Dictionary, base: &str) -> Vec<u8> {
    let mut n = 1;
    loop {
        let key = format!("{}{}", base, n).into_bytes();
        if !dict.has(&key) {
            return key;
        }
        n += 1;
    }
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let page = match doc.get_object(page_id).and_then(|obj| obj.as_dict()) {
        Ok(page) => page,
        Err(_) => return Vec::new(),
    };
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        // An indirect array is spliced in; nesting it would not be valid Contents
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

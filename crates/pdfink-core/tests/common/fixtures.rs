//! Minimal PDFs built in memory with lopdf

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One page per `(width, height)`, each with an empty content stream.
pub fn blank_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for &(width, height) in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture");
    buffer
}

pub fn page_operations(pdf: &[u8], page: u32) -> Vec<Operation> {
    let doc = Document::load_mem(pdf).expect("load output");
    let page_id = doc.get_pages()[&page];
    let content = doc.get_page_content(page_id).expect("page content");
    Content::decode(&content).expect("decode content").operations
}

pub fn numbers(op: &Operation) -> Vec<f64> {
    op.operands
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        })
        .collect()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}

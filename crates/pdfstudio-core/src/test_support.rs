//! PDF fixtures built in memory for tests
//!
//! Compiled into unit tests, and for other crates' tests through the
//! `test-support` feature.

use crate::engine::{PageSize, US_LETTER};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

fn font_resources() -> Object {
    let font = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Times-Roman".to_vec())),
    ]);
    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Dictionary(font));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    Object::Dictionary(resources)
}

fn letter_box() -> Object {
    media_box(US_LETTER)
}

fn media_box(size: PageSize) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(size.width as f32),
        Object::Real(size.height as f32),
    ])
}

/// Content stream id for a page that shows "Page N"
fn page_content(doc: &mut Document, page_number: usize) -> ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    format!("Page {}", page_number).into_bytes(),
                    lopdf::StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()))
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A US Letter PDF whose page N shows the text "Page N"
pub fn create_test_pdf(num_pages: usize) -> Vec<u8> {
    create_sized_pdf(&vec![US_LETTER; num_pages])
}

/// One page per entry of `sizes`; page N shows the text "Page N"
pub fn create_sized_pdf(sizes: &[PageSize]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for (i, &size) in sizes.iter().enumerate() {
        let content_id = page_content(&mut doc, i + 1);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", media_box(size)),
            ("Resources", font_resources()),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(sizes.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    finish(doc, pages_id)
}

/// Two pages under a nested tree. The second page inherits a 300x400
/// MediaBox, its resources and a 90 degree rotation from the root node.
pub fn create_nested_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let root_id = doc.new_object_id();
    let branch_id = doc.new_object_id();

    let first_content = page_content(&mut doc, 1);
    let first = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(root_id)),
        ("MediaBox", letter_box()),
        ("Contents", Object::Reference(first_content)),
    ]));

    let second_content = page_content(&mut doc, 2);
    let second = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(branch_id)),
        ("Contents", Object::Reference(second_content)),
    ]));

    let branch = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Parent", Object::Reference(root_id)),
        ("Count", Object::Integer(1)),
        ("Kids", Object::Array(vec![Object::Reference(second)])),
    ]);
    doc.objects.insert(branch_id, Object::Dictionary(branch));

    let root = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(2)),
        (
            "Kids",
            Object::Array(vec![Object::Reference(first), Object::Reference(branch_id)]),
        ),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(300),
                Object::Integer(400),
            ]),
        ),
        ("Resources", font_resources()),
        ("Rotate", Object::Integer(90)),
    ]);
    doc.objects.insert(root_id, Object::Dictionary(root));
    finish(doc, root_id)
}

/// Decoded content operations of the page at zero-based `index`
pub fn page_operations(doc: &Document, index: usize) -> Vec<Operation> {
    let page_id = doc.get_pages()[&(index as u32 + 1)];
    let bytes = doc.get_page_content(page_id).unwrap();
    Content::decode(&bytes).unwrap().operations
}

/// Every string shown with Tj on a page, joined by spaces
pub fn page_text(doc: &Document, index: usize) -> String {
    page_operations(doc, index)
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first()?.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn number(object: &Object) -> f32 {
    match object {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("expected a number, got {:?}", other),
    }
}

/// Strings shown with Tj on the 1-based `page_number` of a saved PDF
pub fn shown_strings(bytes: &[u8], page_number: usize) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    page_operations(&doc, page_number - 1)
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first()?.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// (x, y) of every text matrix set on the 1-based `page_number` of a saved PDF
pub fn text_origins(bytes: &[u8], page_number: usize) -> Vec<(f64, f64)> {
    let doc = Document::load_mem(bytes).unwrap();
    page_operations(&doc, page_number - 1)
        .iter()
        .filter(|op| op.operator == "Tm")
        .map(|op| (number(&op.operands[4]) as f64, number(&op.operands[5]) as f64))
        .collect()
}

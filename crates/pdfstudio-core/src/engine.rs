//! Document engine on top of lopdf
//!
//! Every document is normalized on load: the page tree is flattened into a
//! single `Pages` node and inheritable attributes are copied onto each page,
//! so pages can be reordered, duplicated and removed by rewriting one `Kids`
//! array.

use crate::error::PdfStudioError;
use crate::image::{ColorSpace, ImageFilter, RasterImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

pub const US_LETTER: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

pub const A4: PageSize = PageSize {
    width: 595.28,
    height: 841.89,
};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Deeper trees than this are treated as corrupt
const MAX_TREE_DEPTH: usize = 64;

const IMAGE_RESOURCE: &[u8] = b"StudioIm1";

/// Line advance as a multiple of the font size for multi-line text
const LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Standard 14 fonts the engine can draw with, all WinAnsi encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(self) -> &'static [u8] {
        match self {
            StandardFont::Helvetica => b"Helvetica",
            StandardFont::HelveticaBold => b"Helvetica-Bold",
        }
    }

    fn resource_name(self) -> &'static [u8] {
        match self {
            StandardFont::Helvetica => b"StudioF1",
            StandardFont::HelveticaBold => b"StudioF2",
        }
    }
}

/// Text to draw on a page, positioned at its baseline in PDF space
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub font: StandardFont,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    /// RGB, each component in 0..=1
    pub color: [f64; 3],
    pub opacity: f64,
    /// Counter-clockwise rotation around the baseline origin
    pub rotation_degrees: f64,
}

impl TextPlacement {
    /// Opaque black Helvetica text without rotation
    pub fn new(text: impl Into<String>, x: f64, y: f64, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font: StandardFont::Helvetica,
            x,
            y,
            font_size,
            color: [0.0, 0.0, 0.0],
            opacity: 1.0,
            rotation_degrees: 0.0,
        }
    }

    pub fn with_font(mut self, font: StandardFont) -> Self {
        self.font = font;
        self
    }

    pub fn with_color(mut self, color: [f64; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }
}

/// A loaded, mutable PDF
pub struct PdfDocument {
    doc: Document,
    pages_root: ObjectId,
    font_ids: BTreeMap<StandardFont, ObjectId>,
    opacity_states: BTreeMap<u32, ObjectId>,
    /// Pages whose original content is already wrapped in q/Q
    isolated: HashSet<ObjectId>,
}

impl PdfDocument {
    /// Parse PDF bytes and normalize the page tree
    pub fn load(bytes: &[u8]) -> Result<Self, PdfStudioError> {
        let doc =
            Document::load_mem(bytes).map_err(|e| PdfStudioError::DocumentLoad(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfStudioError::DocumentLoad(
                "Document is password protected, unlock it first".into(),
            ));
        }

        let pages_root = find_pages_root(&doc)?;
        let mut document = Self {
            doc,
            pages_root,
            font_ids: BTreeMap::new(),
            opacity_states: BTreeMap::new(),
            isolated: HashSet::new(),
        };
        document.flatten_page_tree().map_err(|e| match e {
            PdfStudioError::Commit(msg) => PdfStudioError::DocumentLoad(msg),
            other => other,
        })?;

        debug!(pages = document.page_count(), "Loaded document");
        Ok(document)
    }

    /// An empty document with a catalog and an empty page tree
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_root = doc.new_object_id();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ]);
        doc.objects.insert(pages_root, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_root)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            doc,
            pages_root,
            font_ids: BTreeMap::new(),
            opacity_states: BTreeMap::new(),
            isolated: HashSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object ids in document order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// Object id of the page at zero-based `index`
    pub fn page_id(&self, index: usize) -> Result<ObjectId, PdfStudioError> {
        self.page_ids()
            .get(index)
            .copied()
            .ok_or_else(|| self.missing_page(index))
    }

    /// Width and height of the MediaBox, in points
    pub fn page_size(&self, index: usize) -> Result<PageSize, PdfStudioError> {
        let page = self.page_dict(self.page_id(index)?)?;
        let rect = page
            .get(b"MediaBox")
            .ok()
            .and_then(|media_box| self.read_rect(media_box));

        match rect {
            Some([x1, y1, x2, y2]) => Ok(PageSize {
                width: (x2 - x1).abs(),
                height: (y2 - y1).abs(),
            }),
            None => {
                warn!(page = index + 1, "Page has no usable MediaBox, assuming US Letter");
                Ok(US_LETTER)
            }
        }
    }

    /// Current page rotation, normalized to 0, 90, 180 or 270
    pub fn rotation(&self, index: usize) -> Result<i64, PdfStudioError> {
        let page = self.page_dict(self.page_id(index)?)?;
        let degrees = page
            .get(b"Rotate")
            .ok()
            .and_then(|value| self.read_number(value))
            .unwrap_or(0.0);
        Ok(normalize_rotation(degrees as i64))
    }

    pub fn set_rotation(&mut self, index: usize, degrees: i64) -> Result<(), PdfStudioError> {
        if degrees % 90 != 0 {
            return Err(PdfStudioError::InvalidInput(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }
        let page_id = self.page_id(index)?;
        self.page_dict_mut(page_id)?
            .set("Rotate", Object::Integer(normalize_rotation(degrees)));
        Ok(())
    }

    /// Keep exactly the pages at `indices`, in that order.
    ///
    /// An index may repeat; repeats share content and resources with the first
    /// copy but do not carry its annotations. Bookmarks are dropped since they
    /// may point at pages that no longer exist.
    pub fn copy_pages(&mut self, indices: &[usize]) -> Result<(), PdfStudioError> {
        if indices.is_empty() {
            return Err(PdfStudioError::InvalidInput("No pages selected".into()));
        }

        let source = self.page_ids();
        let mut used = HashSet::new();
        let mut selected = Vec::with_capacity(indices.len());
        for &index in indices {
            let page_id = *source.get(index).ok_or_else(|| self.missing_page(index))?;
            if used.insert(page_id) {
                selected.push(page_id);
            } else {
                selected.push(self.duplicate_page(page_id)?);
            }
        }

        self.set_page_list(&selected)?;
        self.detach_outlines();
        debug!(from = source.len(), to = selected.len(), "Copied pages");
        Ok(())
    }

    /// Remove the page at `index`; the last remaining page cannot be removed
    pub fn remove_page(&mut self, index: usize) -> Result<(), PdfStudioError> {
        let count = self.page_count();
        if index >= count {
            return Err(self.missing_page(index));
        }
        if count == 1 {
            return Err(PdfStudioError::InvalidPage(
                "Cannot delete the only page of a document".into(),
            ));
        }
        let keep: Vec<usize> = (0..count).filter(|&i| i != index).collect();
        self.copy_pages(&keep)
    }

    /// Insert an empty page so that it ends up at `index` (clamped to the end).
    /// Returns the index the page landed at.
    pub fn insert_blank_page(&mut self, index: usize, size: PageSize) -> Result<usize, PdfStudioError> {
        let mut pages = self.page_ids();
        let at = index.min(pages.len());

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_root)),
            ("MediaBox", rect_object(size.width, size.height)),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);
        let page_id = self.doc.add_object(page);
        pages.insert(at, page_id);
        self.set_page_list(&pages)?;
        Ok(at)
    }

    /// Append a page sized to the image that shows the image edge to edge
    pub fn add_image_page(&mut self, image: &RasterImage) -> Result<usize, PdfStudioError> {
        let mut xobject = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(image.width as i64)),
            ("Height", Object::Integer(image.height as i64)),
            ("ColorSpace", Object::Name(image.color_space.pdf_name().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(image.filter.pdf_name().to_vec())),
        ]);
        // Adobe writes CMYK JPEGs inverted
        if image.filter == ImageFilter::DctDecode && image.color_space == ColorSpace::DeviceCmyk {
            xobject.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].iter().map(|&v| Object::Integer(v)).collect()),
            );
        }
        if let Some(mask) = &image.soft_mask {
            let mask_dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(image.width as i64)),
                ("Height", Object::Integer(image.height as i64)),
                ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
                ("Filter", Object::Name(b"FlateDecode".to_vec())),
            ]);
            let mask_id = self.doc.add_object(Stream::new(mask_dict, mask.clone()));
            xobject.set("SMask", Object::Reference(mask_id));
        }
        let image_id = self.doc.add_object(Stream::new(xobject, image.data.clone()));

        let width = image.width as f64;
        let height = image.height as f64;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![real(width), real(0.0), real(0.0), real(height), real(0.0), real(0.0)],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.add_content_stream(content)?;

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_root)),
            ("MediaBox", rect_object(width, height)),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = self.doc.add_object(page);

        let mut pages = self.page_ids();
        pages.push(page_id);
        self.set_page_list(&pages)?;
        Ok(pages.len() - 1)
    }

    /// Draw text on the page at `index` in one of the standard fonts.
    ///
    /// Text the font cannot encode is rejected before the page is touched.
    /// The page's existing content is wrapped in q/Q first so a graphics state
    /// it leaves behind cannot displace the new text.
    pub fn draw_text(&mut self, index: usize, placement: &TextPlacement) -> Result<(), PdfStudioError> {
        let lines = encode_lines(&placement.text)?;
        let page_id = self.page_id(index)?;
        self.isolate_page_content(page_id)?;

        let font = placement.font;
        let font_id = self.font_object(font);
        self.register_resource(page_id, b"Font", font.resource_name(), font_id)?;

        let opacity_state = if placement.opacity < 1.0 {
            let (name, state_id) = self.opacity_state(placement.opacity);
            self.register_resource(page_id, b"ExtGState", &name, state_id)?;
            Some(name)
        } else {
            None
        };

        let content = Content {
            operations: text_operations(
                placement,
                &lines,
                font.resource_name(),
                opacity_state.as_deref(),
            ),
        };
        let stream_id = self.add_content_stream(content)?;
        self.append_content(page_id, stream_id)
    }

    /// Write non-empty values into the document information dictionary
    pub fn set_metadata(&mut self, title: Option<&str>, author: Option<&str>) -> Result<(), PdfStudioError> {
        let existing = self
            .doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok()
            .filter(|&id| self.doc.get_object(id).and_then(Object::as_dict).is_ok());

        let info_id = match existing {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        let info = self
            .doc
            .get_object_mut(info_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfStudioError::Commit(e.to_string()))?;
        for (key, value) in [(&b"Title"[..], title), (&b"Author"[..], author)] {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                info.set(key, text_string(value));
            }
        }
        Ok(())
    }

    /// Read a text entry from the document information dictionary
    pub fn info_string(&self, key: &[u8]) -> Option<String> {
        let info_id = self.doc.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
        let info = self.doc.get_object(info_id).and_then(Object::as_dict).ok()?;
        let bytes = info.get(key).and_then(Object::as_str).ok()?;
        let text = decode_text_string(bytes);
        (!text.is_empty()).then_some(text)
    }

    /// Append every page of `other` after the pages of this document
    pub fn append_document(&mut self, other: PdfDocument) -> Result<(), PdfStudioError> {
        let offset = self.doc.max_id;
        let other_max_id = other.doc.max_id;
        let mut pages = self.page_ids();
        let remap = |id: ObjectId| (id.0 + offset, id.1);

        pages.extend(other.page_ids().into_iter().map(remap));
        self.isolated.extend(other.isolated.iter().copied().map(remap));

        for (id, object) in other.doc.objects {
            self.doc.objects.insert(remap(id), remap_object_refs(object, offset));
        }
        self.doc.max_id = offset + other_max_id;

        self.set_page_list(&pages)?;
        self.detach_outlines();
        Ok(())
    }

    /// Serialize, dropping objects nothing refers to any more
    pub fn save(&mut self) -> Result<Vec<u8>, PdfStudioError> {
        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfStudioError::Commit(format!("Save failed: {}", e)))?;
        Ok(buffer)
    }

    /// The underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.doc
    }

    fn flatten_page_tree(&mut self) -> Result<(), PdfStudioError> {
        let page_ids = self.page_ids();
        for &page_id in &page_ids {
            let inherited = self.inherited_attributes(page_id);
            let page = self.page_dict_mut(page_id)?;
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
        self.set_page_list(&page_ids)
    }

    /// Values this page inherits because it does not define them itself
    fn inherited_attributes(&self, page_id: ObjectId) -> Vec<(&'static [u8], Object)> {
        let mut found = Vec::new();
        let Ok(page) = self.page_dict(page_id) else {
            return found;
        };

        let mut missing: Vec<&'static [u8]> =
            INHERITABLE.iter().copied().filter(|key| !page.has(key)).collect();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

        for _ in 0..MAX_TREE_DEPTH {
            let Some(node_id) = parent else { break };
            if missing.is_empty() {
                break;
            }
            let Ok(node) = self.doc.get_object(node_id).and_then(Object::as_dict) else {
                break;
            };
            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    found.push((*key, value.clone()));
                    false
                }
                Err(_) => true,
            });
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
        found
    }

    /// Make `page_ids` the complete, flat list of pages
    fn set_page_list(&mut self, page_ids: &[ObjectId]) -> Result<(), PdfStudioError> {
        let root = self.pages_root;
        for &page_id in page_ids {
            self.page_dict_mut(page_id)?
                .set("Parent", Object::Reference(root));
        }

        let pages = self
            .doc
            .get_object_mut(root)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PdfStudioError::Commit("Page tree root is not a dictionary".into()))?;
        pages.set(
            "Kids",
            Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
        );
        pages.set("Count", Object::Integer(page_ids.len() as i64));
        for key in INHERITABLE {
            pages.remove(key);
        }
        Ok(())
    }

    fn duplicate_page(&mut self, page_id: ObjectId) -> Result<ObjectId, PdfStudioError> {
        let mut page = self.page_dict(page_id)?.clone();
        page.remove(b"Annots");
        let copy_id = self.doc.add_object(page);
        if self.isolated.contains(&page_id) {
            self.isolated.insert(copy_id);
        }
        Ok(copy_id)
    }

    fn detach_outlines(&mut self) {
        let catalog = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .and_then(|id| self.doc.get_object_mut(id))
            .and_then(Object::as_dict_mut);
        if let Ok(catalog) = catalog {
            if catalog.remove(b"Outlines").is_some() {
                debug!("Dropped document outline after page changes");
            }
        }
    }

    fn isolate_page_content(&mut self, page_id: ObjectId) -> Result<(), PdfStudioError> {
        if !self.isolated.insert(page_id) {
            return Ok(());
        }
        let existing = self.content_refs(page_id)?;
        if existing.is_empty() {
            return Ok(());
        }

        let open = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = self.doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open));
        contents.extend(existing.into_iter().map(Object::Reference));
        contents.push(Object::Reference(close));
        self.page_dict_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    fn append_content(&mut self, page_id: ObjectId, stream_id: ObjectId) -> Result<(), PdfStudioError> {
        let mut contents = self.content_refs(page_id)?;
        contents.push(stream_id);
        self.page_dict_mut(page_id)?.set(
            "Contents",
            Object::Array(contents.into_iter().map(Object::Reference).collect()),
        );
        Ok(())
    }

    /// Content stream ids of a page, following an indirect Contents array
    fn content_refs(&self, page_id: ObjectId) -> Result<Vec<ObjectId>, PdfStudioError> {
        let page = self.page_dict(page_id)?;
        Ok(match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => reference_ids(items),
                _ => vec![*id],
            },
            Ok(Object::Array(items)) => reference_ids(items),
            _ => Vec::new(),
        })
    }

    fn add_content_stream(&mut self, content: Content) -> Result<ObjectId, PdfStudioError> {
        let bytes = content
            .encode()
            .map_err(|e| PdfStudioError::Commit(format!("Failed to encode content: {}", e)))?;
        Ok(self.doc.add_object(Stream::new(Dictionary::new(), bytes)))
    }

    /// Add `name -> target` to one category of the page's resources.
    ///
    /// Resources are copied onto the page first so shared dictionaries used by
    /// other pages are left alone.
    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        name: &[u8],
        target: ObjectId,
    ) -> Result<(), PdfStudioError> {
        let page = self.page_dict(page_id)?;
        let mut resources = self.owned_dict(page.get(b"Resources").ok());
        let mut entries = self.owned_dict(resources.get(category).ok());

        entries.set(name, Object::Reference(target));
        resources.set(category, Object::Dictionary(entries));
        self.page_dict_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn owned_dict(&self, object: Option<&Object>) -> Dictionary {
        match object {
            Some(Object::Dictionary(dict)) => dict.clone(),
            Some(Object::Reference(id)) => self
                .doc
                .get_object(*id)
                .and_then(Object::as_dict)
                .map(Clone::clone)
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        }
    }

    fn font_object(&mut self, font: StandardFont) -> ObjectId {
        if let Some(&id) = self.font_ids.get(&font) {
            return id;
        }
        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(font.base_font().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]);
        let id = self.doc.add_object(dict);
        self.font_ids.insert(font, id);
        id
    }

    /// Resource name and object of an ExtGState with the given fill/stroke alpha
    fn opacity_state(&mut self, opacity: f64) -> (Vec<u8>, ObjectId) {
        let percent = (opacity.clamp(0.0, 1.0) * 100.0).round() as u32;
        let name = format!("StudioGS{}", percent).into_bytes();
        if let Some(&id) = self.opacity_states.get(&percent) {
            return (name, id);
        }

        let alpha = real(percent as f64 / 100.0);
        let state = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"ExtGState".to_vec())),
            ("ca", alpha.clone()),
            ("CA", alpha),
        ]);
        let id = self.doc.add_object(state);
        self.opacity_states.insert(percent, id);
        (name, id)
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary, PdfStudioError> {
        self.doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|_| PdfStudioError::Commit(format!("Page object {:?} is not a dictionary", page_id)))
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, PdfStudioError> {
        self.doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PdfStudioError::Commit(format!("Page object {:?} is not a dictionary", page_id)))
    }

    fn read_rect(&self, object: &Object) -> Option<[f64; 4]> {
        let items = match object {
            Object::Array(items) => items,
            Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_array).ok()?,
            _ => return None,
        };
        if items.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, item) in rect.iter_mut().zip(items) {
            *slot = self.read_number(item)?;
        }
        Some(rect)
    }

    fn read_number(&self, object: &Object) -> Option<f64> {
        match object {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            Object::Reference(id) => match self.doc.get_object(*id).ok()? {
                Object::Integer(i) => Some(*i as f64),
                Object::Real(r) => Some(*r as f64),
                _ => None,
            },
            _ => None,
        }
    }

    fn missing_page(&self, index: usize) -> PdfStudioError {
        PdfStudioError::InvalidPage(format!(
            "Page {} does not exist (document has {} pages)",
            index + 1,
            self.page_count()
        ))
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Map any rotation onto 0, 90, 180 or 270
pub fn normalize_rotation(degrees: i64) -> i64 {
    degrees.rem_euclid(360)
}

fn find_pages_root(doc: &Document) -> Result<ObjectId, PdfStudioError> {
    let catalog = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_dict)
        .map_err(|_| PdfStudioError::DocumentLoad("Document has no catalog".into()))?;
    catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| PdfStudioError::DocumentLoad("Catalog has no page tree".into()))
}

/// Shift every reference inside `obj` by `offset` object numbers
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| remap_object_refs(item, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict_refs(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict_refs(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn reference_ids(items: &[Object]) -> Vec<ObjectId> {
    items.iter().filter_map(|item| item.as_reference().ok()).collect()
}

fn remap_dict_refs(dict: &mut Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        let taken = std::mem::replace(value, Object::Null);
        *value = remap_object_refs(taken, offset);
    }
}

/// `lines` are the already encoded lines of `placement.text`
fn text_operations(
    placement: &TextPlacement,
    lines: &[Vec<u8>],
    font: &[u8],
    opacity_state: Option<&[u8]>,
) -> Vec<Operation> {
    let [r, g, b] = placement.color;
    let (sin, cos) = placement.rotation_degrees.to_radians().sin_cos();

    let mut ops = vec![Operation::new("q", vec![])];
    if let Some(state) = opacity_state {
        ops.push(Operation::new("gs", vec![Object::Name(state.to_vec())]));
    }
    ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.to_vec()), real(placement.font_size)],
    ));
    ops.push(Operation::new("TL", vec![real(placement.font_size * LINE_HEIGHT)]));
    ops.push(Operation::new(
        "Tm",
        vec![
            real(cos),
            real(sin),
            real(-sin),
            real(cos),
            real(placement.x),
            real(placement.y),
        ],
    ));
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(line.clone(), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn rect_object(width: f64, height: f64) -> Object {
    Object::Array(vec![real(0.0), real(0.0), real(width), real(height)])
}

/// Encode text for a WinAnsiEncoding font.
///
/// Fails on the first character the encoding has no code for.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, PdfStudioError> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => Ok(c as u8),
            '\t' => Ok(b' '),
            '€' => Ok(0x80),
            '‚' => Ok(0x82),
            '„' => Ok(0x84),
            '…' => Ok(0x85),
            '‘' => Ok(0x91),
            '’' => Ok(0x92),
            '“' => Ok(0x93),
            '”' => Ok(0x94),
            '•' => Ok(0x95),
            '–' => Ok(0x96),
            '—' => Ok(0x97),
            '™' => Ok(0x99),
            other => Err(PdfStudioError::InvalidInput(format!(
                "Character '{}' (U+{:04X}) cannot be drawn with the built-in Helvetica font",
                other, other as u32
            ))),
        })
        .collect()
}

fn encode_lines(text: &str) -> Result<Vec<Vec<u8>>, PdfStudioError> {
    text.lines().map(encode_win_ansi).collect()
}

/// PDF text string: PDFDocEncoding-compatible bytes for ASCII, UTF-16BE otherwise
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_nested_pdf, create_test_pdf, number, page_operations, page_text};
    use pretty_assertions::assert_eq;

    /// (resource name, BaseFont) for every font the page references
    fn page_base_fonts(doc: &PdfDocument, index: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        let inner = doc.inner();
        let page = inner.get_object(doc.page_id(index).unwrap()).and_then(Object::as_dict).unwrap();
        let resources = doc.owned_dict(page.get(b"Resources").ok());
        let fonts = doc.owned_dict(resources.get(b"Font").ok());
        fonts
            .iter()
            .map(|(name, value)| {
                let font = doc.owned_dict(Some(value));
                let base = font.get(b"BaseFont").and_then(Object::as_name).unwrap().to_vec();
                (name.clone(), base)
            })
            .collect()
    }

    fn reload(doc: &mut PdfDocument) -> PdfDocument {
        let bytes = doc.save().unwrap();
        PdfDocument::load(&bytes).unwrap()
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            PdfDocument::load(b"not a pdf"),
            Err(PdfStudioError::DocumentLoad(_))
        ));
    }

    #[test]
    fn test_page_count_and_size() {
        let doc = PdfDocument::load(&create_test_pdf(3)).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.page_size(0).unwrap(), US_LETTER);
        assert!(matches!(doc.page_size(3), Err(PdfStudioError::InvalidPage(_))));
    }

    #[test]
    fn test_copy_pages_reorders() {
        let mut doc = PdfDocument::load(&create_test_pdf(3)).unwrap();
        doc.copy_pages(&[2, 0, 1]).unwrap();
        let doc = reload(&mut doc);
        let texts: Vec<String> = (0..3).map(|i| page_text(doc.inner(), i)).collect();
        assert_eq!(texts, vec!["Page 3", "Page 1", "Page 2"]);
    }

    #[test]
    fn test_copy_pages_allows_duplicates() {
        let mut doc = PdfDocument::load(&create_test_pdf(2)).unwrap();
        doc.copy_pages(&[1, 1, 0, 1]).unwrap();
        let doc = reload(&mut doc);
        assert_eq!(doc.page_count(), 4);
        assert_eq!(page_text(doc.inner(), 0), "Page 2");
        assert_eq!(page_text(doc.inner(), 3), "Page 2");
    }

    #[test]
    fn test_copy_pages_rejects_unknown_index() {
        let mut doc = PdfDocument::load(&create_test_pdf(2)).unwrap();
        assert!(matches!(doc.copy_pages(&[0, 5]), Err(PdfStudioError::InvalidPage(_))));
        assert!(matches!(doc.copy_pages(&[]), Err(PdfStudioError::InvalidInput(_))));
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_remove_page() {
        let mut doc = PdfDocument::load(&create_test_pdf(3)).unwrap();
        doc.remove_page(1).unwrap();
        let doc = reload(&mut doc);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(page_text(doc.inner(), 1), "Page 3");
    }

    #[test]
    fn test_remove_only_page_fails() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        assert!(matches!(doc.remove_page(0), Err(PdfStudioError::InvalidPage(_))));
    }

    #[test]
    fn test_insert_blank_page_clamps_index() {
        let mut doc = PdfDocument::load(&create_test_pdf(2)).unwrap();
        assert_eq!(doc.insert_blank_page(99, A4).unwrap(), 2);
        assert_eq!(doc.insert_blank_page(0, A4).unwrap(), 0);
        let doc = reload(&mut doc);
        assert_eq!(doc.page_count(), 4);
        let size = doc.page_size(0).unwrap();
        assert!((size.width - 595.28).abs() < 0.01);
        assert!((size.height - 841.89).abs() < 0.01);
        assert_eq!(page_text(doc.inner(), 1), "Page 1");
    }

    #[test]
    fn test_rotation_is_normalized() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        assert_eq!(doc.rotation(0).unwrap(), 0);
        doc.set_rotation(0, -90).unwrap();
        assert_eq!(doc.rotation(0).unwrap(), 270);
        doc.set_rotation(0, 450).unwrap();
        assert_eq!(doc.rotation(0).unwrap(), 90);
        assert!(matches!(doc.set_rotation(0, 45), Err(PdfStudioError::InvalidInput(_))));
    }

    #[test]
    fn test_draw_text_appends_content() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.draw_text(0, &TextPlacement::new("Hello (world)", 50.0, 700.0, 14.0))
            .unwrap();
        let doc = reload(&mut doc);

        let page_id = doc.page_id(0).unwrap();
        let shown: Vec<Vec<u8>> = page_operations(doc.inner(), 0)
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands[0].as_str().ok().map(|s| s.to_vec()))
            .collect();
        assert_eq!(shown, vec![b"Page 1".to_vec(), b"Hello (world)".to_vec()]);

        let font = doc
            .inner()
            .get_object(page_id)
            .and_then(Object::as_dict)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(font.has(StandardFont::Helvetica.resource_name()));
        assert!(font.has(b"F1"));
    }

    #[test]
    fn test_bold_text_registers_second_font() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.draw_text(0, &TextPlacement::new("plain", 1.0, 1.0, 12.0)).unwrap();
        doc.draw_text(
            0,
            &TextPlacement::new("bold", 1.0, 20.0, 12.0).with_font(StandardFont::HelveticaBold),
        )
        .unwrap();
        let doc = reload(&mut doc);

        let mut base_fonts = page_base_fonts(&doc, 0);
        base_fonts.sort();
        assert_eq!(
            base_fonts,
            vec![
                (b"F1".to_vec(), b"Times-Roman".to_vec()),
                (b"StudioF1".to_vec(), b"Helvetica".to_vec()),
                (b"StudioF2".to_vec(), b"Helvetica-Bold".to_vec()),
            ]
        );
    }

    #[test]
    fn test_unencodable_text_leaves_page_untouched() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        let page_id = doc.page_id(0).unwrap();
        let before = doc.content_refs(page_id).unwrap();

        let err = doc
            .draw_text(0, &TextPlacement::new("ok\n日本語 ✓", 1.0, 1.0, 12.0))
            .unwrap_err();
        assert!(matches!(&err, PdfStudioError::InvalidInput(msg) if msg.contains('日')));
        assert_eq!(doc.content_refs(page_id).unwrap(), before);
        assert!(doc.font_ids.is_empty());
    }

    #[test]
    fn test_draw_text_wraps_existing_content_once() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.draw_text(0, &TextPlacement::new("a", 1.0, 1.0, 12.0)).unwrap();
        doc.draw_text(0, &TextPlacement::new("b", 2.0, 2.0, 12.0)).unwrap();
        let page_id = doc.page_id(0).unwrap();
        // q, original, Q, first text, second text
        assert_eq!(doc.content_refs(page_id).unwrap().len(), 5);
    }

    #[test]
    fn test_multiline_text_uses_line_advance() {
        let placement = TextPlacement::new("one\ntwo", 0.0, 0.0, 10.0);
        let lines = encode_lines(&placement.text).unwrap();
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec()]);
        let ops = text_operations(&placement, &lines, b"F", None);
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(
            operators,
            vec!["q", "rg", "BT", "Tf", "TL", "Tm", "Tj", "T*", "Tj", "ET", "Q"]
        );
    }

    #[test]
    fn test_translucent_text_uses_ext_gstate() {
        let placement = TextPlacement::new("Draft", 0.0, 0.0, 50.0).with_opacity(0.3);
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.draw_text(0, &placement).unwrap();
        let (name, _) = doc.opacity_state(0.3);
        assert_eq!(name, b"StudioGS30".to_vec());
        assert_eq!(doc.opacity_states.len(), 1);
    }

    #[test]
    fn test_rotated_text_matrix() {
        let ops = text_operations(
            &TextPlacement::new("x", 10.0, 20.0, 12.0).with_rotation(90.0),
            &[b"x".to_vec()],
            b"F",
            None,
        );
        let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
        let values: Vec<f32> = tm.operands.iter().map(number).collect();
        assert!(values[0].abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert_eq!(&values[4..], &[10.0, 20.0]);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.set_metadata(Some("Quarterly Report"), Some("  ")).unwrap();
        doc.set_metadata(None, Some("Zoë")).unwrap();
        let doc = reload(&mut doc);
        assert_eq!(doc.info_string(b"Title").as_deref(), Some("Quarterly Report"));
        assert_eq!(doc.info_string(b"Author").as_deref(), Some("Zoë"));
    }

    #[test]
    fn test_append_document() {
        let mut first = PdfDocument::load(&create_test_pdf(2)).unwrap();
        let second = PdfDocument::load(&create_test_pdf(3)).unwrap();
        first.append_document(second).unwrap();
        let doc = reload(&mut first);
        assert_eq!(doc.page_count(), 5);
        assert_eq!(page_text(doc.inner(), 1), "Page 2");
        assert_eq!(page_text(doc.inner(), 2), "Page 1");
    }

    #[test]
    fn test_inherited_media_box_is_materialized() {
        let bytes = create_nested_pdf();
        let mut doc = PdfDocument::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_size(1).unwrap(), PageSize { width: 300.0, height: 400.0 });
        assert_eq!(doc.rotation(1).unwrap(), 90);

        doc.copy_pages(&[1]).unwrap();
        let doc = reload(&mut doc);
        assert_eq!(doc.page_size(0).unwrap(), PageSize { width: 300.0, height: 400.0 });
        assert_eq!(doc.rotation(0).unwrap(), 90);
    }

    #[test]
    fn test_new_document_takes_image_pages() {
        let image = RasterImage::from_bytes(&crate::image::test_images::jpeg_header(200, 100, 3)).unwrap();
        let mut doc = PdfDocument::new();
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.add_image_page(&image).unwrap(), 0);
        let doc = reload(&mut doc);
        assert_eq!(doc.page_size(0).unwrap(), PageSize { width: 200.0, height: 100.0 });
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(
            encode_win_ansi("Café €5").unwrap(),
            vec![b'C', b'a', b'f', 0xE9, b' ', 0x80, b'5']
        );
        assert!(matches!(
            encode_win_ansi("日本"),
            Err(PdfStudioError::InvalidInput(msg)) if msg.contains("U+65E5")
        ));
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(630), 270);
    }
}

//! Output PDF assembly with lopdf.
//!
//! Two ways a page can enter the output:
//!
//! * **Structural import** ([`OutputDocument::import_pages`]) deep-copies a
//!   source page and every object it reaches (content streams, fonts,
//!   images, annotations) under fresh object ids. Nothing is re-encoded, so
//!   text stays selectable and vectors stay sharp.
//! * **Raster embedding** ([`OutputDocument::add_raster_page`]) wraps a
//!   rendered page in an RGB image XObject on a page whose MediaBox is the
//!   source page's native size, so the output page has the original
//!   dimensions whatever the raster resolution.
//!
//! An import is staged in full before anything is written into the output.
//! A source that fails halfway leaves the output exactly as it was, which
//! lets the caller fall back to rasterising the whole source.

use crate::cancel::{checkpoint, CancelFlag};
use crate::config::PagesConfig;
use crate::error::{PdfPagesError, StructuralError};
use crate::pipeline::encode::deflate_pixels;
use crate::pipeline::render::{render_for_export, PageRasterizer, RasterImage};
use crate::progress::PageProgress;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Deeper page trees than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, the PDF default when no MediaBox is found anywhere.
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Parse a buffer for structural copying.
///
/// Encrypted documents are refused, including owner-restricted ones that
/// lopdf decrypts on load with the empty user password. Copying their pages
/// would drop the restrictions from the output.
pub fn load_structural(bytes: &[u8]) -> Result<Document, StructuralError> {
    let doc = Document::load_mem(bytes)?;
    if doc.was_encrypted() || doc.is_encrypted() || doc.trailer.has(b"Encrypt") {
        return Err(StructuralError::Encrypted);
    }
    Ok(doc)
}

/// The PDF under construction.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy 1-based pages of `source`, in the order given.
    ///
    /// On error the output is unchanged.
    pub fn import_pages(
        &mut self,
        source: &Document,
        page_numbers: &[u32],
    ) -> Result<(), StructuralError> {
        let page_ids = source.get_pages();
        let mut importer = Importer::new(source, self.doc.max_id + 1);

        let mut wanted = Vec::with_capacity(page_numbers.len());
        for &number in page_numbers {
            let id = *page_ids
                .get(&number)
                .ok_or(StructuralError::MissingPage(number))?;
            wanted.push((id, importer.reserve_page(id)));
        }
        for &(old, new) in &wanted {
            importer.import_page(old, new)?;
        }

        let Importer {
            mut staged,
            next_id,
            ..
        } = importer;
        for &(_, new) in &wanted {
            if let Some(Object::Dictionary(page)) = staged.get_mut(&new) {
                page.set("Parent", self.pages_id);
            }
        }
        debug!(
            "Imported {} pages ({} objects)",
            wanted.len(),
            staged.len()
        );
        self.doc.objects.extend(staged);
        self.doc.max_id = next_id - 1;
        self.kids.extend(wanted.into_iter().map(|(_, new)| new));
        Ok(())
    }

    /// Append one rendered page at the page's native size.
    pub fn add_raster_page(&mut self, raster: &RasterImage) -> Result<(), PdfPagesError> {
        let page = raster.page_number;
        let (width, height) = (raster.native.width, raster.native.height);

        let pixels = deflate_pixels(&raster.image).map_err(|e| PdfPagesError::RenderFailed {
            page,
            detail: format!("compressing raster failed: {e}"),
        })?;
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => raster.image.width() as i64,
                "Height" => raster.image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            pixels,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        // Unit square scaled to the full page: the image is stretched to
        // exactly the native page box.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width),
                        0.into(),
                        0.into(),
                        Object::Real(height),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfPagesError::Internal(format!("encoding page content: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id);
        debug!(
            "Embedded raster page {} ({}x{} px on {}x{} pt)",
            page,
            raster.image.width(),
            raster.image.height(),
            width,
            height
        );
        Ok(())
    }

    /// Close the page tree and serialise.
    pub fn finish(mut self, compress: bool) -> Result<Vec<u8>, PdfPagesError> {
        let count = self.kids.len() as i64;
        let kids: Vec<Object> = self.kids.iter().copied().map(Object::Reference).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("edgequake-pdfpages ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        if compress {
            self.doc.compress();
        }
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| PdfPagesError::Internal(format!("serialising output PDF: {e}")))?;
        Ok(buf)
    }
}

/// Structurally copy pages of one source into `output`.
///
/// `pages` is `None` for every page in document order.
pub(crate) fn append_structural(
    output: &mut OutputDocument,
    source: &Document,
    pages: Option<&[usize]>,
) -> Result<usize, StructuralError> {
    let numbers: Vec<u32> = match pages {
        Some(pages) => pages.iter().map(|&p| p as u32).collect(),
        None => source.get_pages().keys().copied().collect(),
    };
    output.import_pages(source, &numbers)?;
    Ok(numbers.len())
}

/// Render pages of `doc` one at a time and embed each as a raster page.
///
/// `done` counts pages finished across the whole operation so progress and
/// cancellation stay continuous over several sources.
#[allow(clippy::too_many_arguments)]
pub(crate) fn append_rasterized(
    output: &mut OutputDocument,
    doc: &dyn PageRasterizer,
    pages: &[usize],
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
    done: &mut usize,
    total: usize,
) -> Result<(), PdfPagesError> {
    for &page in pages {
        checkpoint(cancel, *done, total)?;
        let raster = render_for_export(doc, page, config)?;
        output.add_raster_page(&raster)?;
        drop(raster);
        *done += 1;
        progress.on_page(*done, total);
    }
    Ok(())
}

/// Deep copier from one source document into staged output objects.
struct Importer<'a> {
    source: &'a Document,
    map: HashMap<ObjectId, ObjectId>,
    staged: BTreeMap<ObjectId, Object>,
    pending: Vec<ObjectId>,
    next_id: u32,
}

impl<'a> Importer<'a> {
    fn new(source: &'a Document, first_id: u32) -> Self {
        Self {
            source,
            map: HashMap::new(),
            staged: BTreeMap::new(),
            pending: Vec::new(),
            next_id: first_id,
        }
    }

    fn fresh_id(&mut self) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        id
    }

    /// Claim an output id for a page before any object is copied, so links
    /// between selected pages resolve to their copies.
    fn reserve_page(&mut self, old: ObjectId) -> ObjectId {
        if let Some(&new) = self.map.get(&old) {
            return new;
        }
        let new = self.fresh_id();
        self.map.insert(old, new);
        new
    }

    fn import_page(&mut self, old: ObjectId, new: ObjectId) -> Result<(), StructuralError> {
        if self.staged.contains_key(&new) {
            return Ok(());
        }
        let mut page = self.source.get_dictionary(old)?.clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited(self.source, &page, key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        if !page.has(b"MediaBox") {
            let media_box: Vec<Object> = DEFAULT_MEDIA_BOX.iter().map(|&v| v.into()).collect();
            page.set("MediaBox", media_box);
        }
        page.remove(b"Parent");

        let page = self.rewrite_dict(page);
        self.staged.insert(new, Object::Dictionary(page));
        self.drain();
        Ok(())
    }

    /// Copy every object reached so far, following new references as they
    /// are discovered. Dangling references become null.
    fn drain(&mut self) {
        while let Some(old) = self.pending.pop() {
            let new = self.map[&old];
            let object = match self.source.get_object(old) {
                Ok(object) => self.rewrite(object.clone()),
                Err(_) => Object::Null,
            };
            self.staged.insert(new, object);
        }
    }

    fn rewrite(&mut self, object: Object) -> Object {
        match object {
            Object::Reference(id) => self.rewrite_reference(id),
            Object::Array(items) => {
                Object::Array(items.into_iter().map(|item| self.rewrite(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.rewrite_dict(dict)),
            Object::Stream(mut stream) => {
                stream.dict = self.rewrite_dict(stream.dict);
                Object::Stream(stream)
            }
            other => other,
        }
    }

    fn rewrite_dict(&mut self, mut dict: Dictionary) -> Dictionary {
        for (_, value) in dict.iter_mut() {
            let taken = std::mem::replace(value, Object::Null);
            *value = self.rewrite(taken);
        }
        dict
    }

    fn rewrite_reference(&mut self, old: ObjectId) -> Object {
        if let Some(&new) = self.map.get(&old) {
            return Object::Reference(new);
        }
        let Ok(target) = self.source.get_object(old) else {
            return Object::Null;
        };
        // The page tree belongs to the output, and pages that were not
        // selected must not be dragged in through links.
        if matches!(type_name(target), Some(b"Pages" | b"Catalog" | b"Page")) {
            return Object::Null;
        }
        let new = self.fresh_id();
        self.map.insert(old, new);
        self.pending.push(old);
        Object::Reference(new)
    }
}

fn type_name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Dictionary(dict) => dict.get(b"Type").and_then(|t| t.as_name()).ok(),
        _ => None,
    }
}

/// Walk `/Parent` links looking for an inherited attribute.
fn inherited<'d>(source: &'d Document, page: &Dictionary, key: &[u8]) -> Option<&'d Object> {
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = source.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

//! Shared fixtures for unit tests: an in-memory rasteriser that never touches
//! pdfium, and small lopdf-built documents.

use crate::error::PdfPagesError;
use crate::pipeline::load::SourceBytes;
use crate::pipeline::render::{DocumentOpener, PageRasterizer, PageSize, RasterImage};
use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// Renders every page as a solid grey image of the requested size.
pub(crate) struct FakeDocument {
    name: String,
    sizes: Vec<PageSize>,
    failing: HashSet<usize>,
    renders: Cell<usize>,
}

impl FakeDocument {
    pub(crate) fn new(name: &str, sizes: Vec<(f32, f32)>) -> Self {
        Self {
            name: name.to_string(),
            sizes: sizes
                .into_iter()
                .map(|(width, height)| PageSize { width, height })
                .collect(),
            failing: HashSet::new(),
            renders: Cell::new(0),
        }
    }

    /// Make rasterising `page_number` fail.
    pub(crate) fn failing_on(mut self, page_number: usize) -> Self {
        self.failing.insert(page_number);
        self
    }

    pub(crate) fn render_count(&self) -> usize {
        self.renders.get()
    }

    fn size(&self, page_number: usize) -> Result<PageSize, PdfPagesError> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.sizes.get(i))
            .copied()
            .ok_or(PdfPagesError::PageOutOfRange {
                page: page_number,
                total: self.sizes.len(),
            })
    }
}

impl PageRasterizer for FakeDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_size(&self, page_number: usize) -> Result<PageSize, PdfPagesError> {
        self.size(page_number)
    }

    fn rasterize(&self, page_number: usize, scale: f32) -> Result<RasterImage, PdfPagesError> {
        let native = self.size(page_number)?;
        if self.failing.contains(&page_number) {
            return Err(PdfPagesError::RenderFailed {
                page: page_number,
                detail: "fake render failure".into(),
            });
        }
        self.renders.set(self.renders.get() + 1);
        let (w, h) = native.pixels_at(scale);
        Ok(RasterImage {
            page_number,
            image: RgbImage::from_pixel(w, h, Rgb([200, 200, 200])),
            native,
        })
    }
}

/// Opens any buffer as a [`FakeDocument`] of the registered page sizes.
#[derive(Default)]
pub(crate) struct FakeOpener {
    documents: HashMap<String, Vec<(f32, f32)>>,
}

impl FakeOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, name: &str, sizes: Vec<(f32, f32)>) -> Self {
        self.documents.insert(name.to_string(), sizes);
        self
    }
}

impl DocumentOpener for FakeOpener {
    fn open<'s>(
        &'s self,
        bytes: SourceBytes,
        _password: Option<&str>,
    ) -> Result<Box<dyn PageRasterizer + 's>, PdfPagesError> {
        match self.documents.get(bytes.name()) {
            Some(sizes) => Ok(Box::new(FakeDocument::new(bytes.name(), sizes.clone()))),
            None => Err(PdfPagesError::ParseFailed {
                name: bytes.name().to_string(),
                detail: "unknown to the fake opener".into(),
            }),
        }
    }
}

/// A valid PDF whose pages have the given sizes and show "Page N".
pub(crate) fn build_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = build_document(sizes);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Like [`build_pdf`], encrypted with RC4-128 and only printing allowed.
///
/// An empty `user_password` gives an owner-restricted file that any reader
/// opens without asking; lopdf decrypts those silently on load.
pub(crate) fn build_encrypted_pdf(sizes: &[(f32, f32)], user_password: &str) -> Vec<u8> {
    let mut doc = build_document(sizes);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(b"0123456789abcdef".to_vec()),
            Object::string_literal(b"0123456789abcdef".to_vec()),
        ],
    );
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::PRINTABLE,
    };
    let state = EncryptionState::try_from(version).unwrap();
    doc.encrypt(&state).unwrap();

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn build_document(sizes: &[(f32, f32)]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (i, (w, h)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![36.into(), 36.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {}", i + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(*w), Object::Real(*h)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Two pages that take their MediaBox and Resources from the page tree root.
pub(crate) fn build_pdf_with_inherited_attributes() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for i in 0..2 {
        let text = format!("BT /F1 10 Tf 20 20 Td (Inherited {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 2,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 420.into(), 595.into()],
            "Rotate" => 90,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Starts like a PDF, but nothing after the header parses.
pub(crate) const CORRUPT_PDF: &[u8] = b"%PDF-1.7\n this is not an object graph\n%%EOF\n";

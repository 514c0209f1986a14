pub mod api;
pub mod audit;
pub mod clock;
pub mod config;
pub mod document;
mod error;
pub mod finalize;
mod image_insert_to_page;
mod image_xobject;
mod page_content;
mod pdf_object;
pub mod placement;
pub mod public_link;
mod rectangle;
pub mod repository;
pub mod server;
pub mod service;
pub mod storage;
mod text_insert_to_page;

use image_insert_to_page::InsertImageToPage;
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream,
};
use page_content::PageContent;
use pdf_object::PdfObjectDeref;
use placement::{
    PlacementContent, SignaturePlacement, IMAGE_HEIGHT, IMAGE_WIDTH, TEXT_FONT_SIZE,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use text_insert_to_page::InsertTextToPage;

pub use error::Error;
pub use lopdf;
pub use rectangle::Rectangle;

pub type UserId = i64;
pub type DocumentId = i64;
pub type PlacementId = i64;
pub type AuditEntryId = i64;

/// A PDF loaded in memory that signatures can be drawn onto.
#[derive(Debug, Clone)]
pub struct PDFSigningDocument {
    raw_document: Document,
    /// Link between the hash of an image payload and the objectId of the image.
    /// This is used to reduce the amount of copies of the images in the pdf file.
    image_signature_object_id: HashMap<String, ObjectId>,
    signature_font_id: Option<ObjectId>,
    /// Pages whose original content was already wrapped in `q`/`Q`.
    isolated_pages: HashSet<ObjectId>,
}

impl PDFSigningDocument {
    pub fn new(raw_document: Document) -> Self {
        PDFSigningDocument {
            raw_document,
            image_signature_object_id: HashMap::new(),
            signature_font_id: None,
            isolated_pages: HashSet::new(),
        }
    }

    pub fn load(pdf_data: &[u8]) -> Result<Self, Error> {
        Ok(Self::new(Document::load_mem(pdf_data)?))
    }

    pub fn page_count(&self) -> usize {
        self.raw_document.get_pages().len()
    }

    /// Object id of the 1-indexed `page`.
    pub fn page_id(&self, page: u32) -> Result<ObjectId, Error> {
        let pages = self.raw_document.get_pages();
        pages.get(&page).copied().ok_or(Error::PageOutOfRange {
            page,
            page_count: pages.len(),
        })
    }

    /// Visible area of a page, looked up through the page tree.
    /// Pages without a usable `MediaBox` are taken to be US Letter.
    pub fn media_box(&self, page_id: ObjectId) -> Result<Rectangle, Error> {
        let corners = pdf_object::find_inherited(&self.raw_document, page_id, b"MediaBox")?
            .and_then(|media_box| media_box.as_array().ok())
            .map(|values| {
                values
                    .iter()
                    .map(|value| match value.deref(&self.raw_document)? {
                        Object::Integer(value) => Ok(*value as f64),
                        Object::Real(value) => Ok(*value as f64),
                        other => Err(Error::Other(format!(
                            "PDF Error: MediaBox entry is not a number: {:?}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<f64>, Error>>()
            })
            .transpose()?;
        match corners.as_deref() {
            Some([x1, y1, x2, y2]) => Ok(Rectangle::from_corners((*x1, *y1), (*x2, *y2))),
            _ => {
                log::warn!("Page {:?} has no usable MediaBox, assuming US Letter.", page_id);
                Ok(Rectangle::from_corners((0.0, 0.0), (612.0, 792.0)))
            }
        }
    }

    /// Draw one signature onto its page.
    /// Placement coordinates are measured from the top left corner of the page, y downwards.
    pub fn apply_placement(&mut self, placement: &SignaturePlacement) -> Result<(), Error> {
        let page_id = self.page_id(placement.page)?;
        match &placement.content {
            PlacementContent::Image { media_type, data } => {
                if media_type != "image/png" {
                    return Err(Error::Validation(format!(
                        "unsupported signature image type `{}`",
                        media_type
                    )));
                }
                let rect = self.media_box(page_id)?.box_from_top_left(
                    placement.x,
                    placement.y,
                    IMAGE_WIDTH,
                    IMAGE_HEIGHT,
                );
                let image_hash = format!("{:x}", Sha256::digest(data));
                let image_name = format!("SigImg{}", &image_hash[..16]);
                // The same drawn signature placed several times is embedded once.
                let image_id = match self.image_signature_object_id.get(&image_hash) {
                    Some(image_id) => *image_id,
                    None => {
                        let image_id = self.embed_png(data)?;
                        self.image_signature_object_id.insert(image_hash, image_id);
                        image_id
                    }
                };
                self.draw_image(page_id, &image_name, image_id, rect)?;
            }
            PlacementContent::Text(text) => {
                let origin = self
                    .media_box(page_id)?
                    .point_from_top_left(placement.x, placement.y);
                self.add_text(text, page_id, origin, TEXT_FONT_SIZE)?;
            }
        }
        log::debug!(
            "Drew placement {} on page {} of document {}.",
            placement.id,
            placement.page,
            placement.document_id
        );
        Ok(())
    }

    pub fn save_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        let mut pdf_file_data = Vec::new();
        self.raw_document.save_to(&mut pdf_file_data)?;
        Ok(pdf_file_data)
    }

    /// Give the page its own `Resources` dictionary, copying an inherited one if present,
    /// so adding entries does not hide resources the existing content relies on.
    fn page_resources_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, Error> {
        let page = self.raw_document.get_object(page_id)?.as_dict()?;
        let own_resources = page.get(b"Resources").ok().cloned();
        let resources_id = match own_resources {
            Some(Object::Reference(resources_id)) => Some(resources_id),
            Some(_) => None,
            None => {
                let inherited =
                    pdf_object::find_inherited(&self.raw_document, page_id, b"Resources")?
                        .and_then(|resources| resources.as_dict().ok())
                        .cloned()
                        .unwrap_or_else(Dictionary::new);
                self.raw_document
                    .get_object_mut(page_id)?
                    .as_dict_mut()?
                    .set("Resources", Object::Dictionary(inherited));
                None
            }
        };
        let resources = match resources_id {
            Some(resources_id) => self.raw_document.get_object_mut(resources_id)?,
            None => self
                .raw_document
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .get_mut(b"Resources")?,
        };
        Ok(resources.as_dict_mut()?)
    }

    /// Wrap the current page content in `q`/`Q` so new drawing starts from a clean graphics state.
    fn isolate_page_content(&mut self, page_id: ObjectId) -> Result<(), Error> {
        let page = self.raw_document.get_object(page_id)?.as_dict()?;
        let existing = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
            Ok(Object::Array(streams)) => streams.clone(),
            _ => Vec::new(),
        };
        let contents = if existing.is_empty() {
            existing
        } else {
            let save_id = self
                .raw_document
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            // Leading newline in case the last original stream does not end in whitespace.
            let restore_id = self
                .raw_document
                .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
            contents.push(Object::Reference(restore_id));
            contents
        };
        self.raw_document
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(contents));
        self.isolated_pages.insert(page_id);
        Ok(())
    }
}

impl PageContent for PDFSigningDocument {
    fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.raw_document.add_object(object)
    }

    fn add_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        object_id: ObjectId,
    ) -> Result<(), Error> {
        let category_ref = {
            let resources = self.page_resources_mut(page_id)?;
            let existing = resources
                .get(category.as_bytes())
                .ok()
                .map(|entry| entry.get_object_id());
            match existing {
                Some(category_id) => category_id,
                None => {
                    resources.set(category, Dictionary::new());
                    None
                }
            }
        };
        let category_dict = match category_ref {
            // The category dictionary is shared with other pages, so it is extended in place.
            Some(category_id) => self.raw_document.get_object_mut(category_id)?,
            None => self.page_resources_mut(page_id)?.get_mut(category.as_bytes())?,
        };
        category_dict
            .as_dict_mut()?
            .set(name, Object::Reference(object_id));
        Ok(())
    }

    fn add_to_page_content(
        &mut self,
        page_id: ObjectId,
        content: Content<Vec<Operation>>,
    ) -> Result<(), Error> {
        if !self.isolated_pages.contains(&page_id) {
            self.isolate_page_content(page_id)?;
        }
        let mut data = content.encode()?;
        // Readers concatenate content streams, keep the last operator delimited.
        data.push(b'\n');
        let stream_id = self
            .raw_document
            .add_object(Stream::new(Dictionary::new(), data));
        let page = self.raw_document.get_object_mut(page_id)?.as_dict_mut()?;
        match page.get_mut(b"Contents") {
            Ok(Object::Array(streams)) => streams.push(Object::Reference(stream_id)),
            _ => page.set("Contents", Object::Array(vec![Object::Reference(stream_id)])),
        }
        Ok(())
    }
}

impl InsertImageToPage for PDFSigningDocument {}

impl InsertTextToPage for PDFSigningDocument {
    fn signature_font_id(&self) -> Option<ObjectId> {
        self.signature_font_id
    }

    fn set_signature_font_id(&mut self, font_id: ObjectId) {
        self.signature_font_id = Some(font_id);
    }
}

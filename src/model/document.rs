//! Uploaded document and media detection

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Pdf,
}

/// Location of an object in the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentRef {
    pub key: String,
}

impl DocumentRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Folder part of the key including the trailing slash, or empty at the root
    pub fn folder(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[..=idx],
            None => "",
        }
    }
}

/// A single submitted document. Immutable once received.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: String,
    pub media_kind: MediaKind,
    /// Known for PDFs only
    pub page_count: Option<usize>,
    pub content: Vec<u8>,
}

impl UploadedDocument {
    /// Classify and wrap raw upload bytes.
    ///
    /// Returns `None` when the content is neither a PDF nor an image.
    pub fn from_upload(file_name: &str, content_type: &str, content: Vec<u8>) -> Option<Self> {
        let media_kind = detect_media_kind(file_name, content_type)?;
        let page_count = match media_kind {
            MediaKind::Pdf => count_pdf_pages(&content),
            MediaKind::Image => None,
        };

        Some(Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            media_kind,
            page_count,
            content,
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.media_kind == MediaKind::Pdf
    }

    /// SHA256 of the raw content, hex encoded
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.content);
        format!("{:x}", hasher.finalize())
    }
}

/// PDF wins if either the content type or the extension says so
pub fn detect_media_kind(file_name: &str, content_type: &str) -> Option<MediaKind> {
    let content_type = content_type.to_lowercase();
    let file_name = file_name.to_lowercase();

    if content_type.contains("pdf") || file_name.ends_with(".pdf") {
        return Some(MediaKind::Pdf);
    }

    let image_ext = [".jpg", ".jpeg", ".png"]
        .iter()
        .any(|ext| file_name.ends_with(ext));
    if content_type.starts_with("image/") || image_ext {
        return Some(MediaKind::Image);
    }

    None
}

fn count_pdf_pages(content: &[u8]) -> Option<usize> {
    match lopdf::Document::load_mem(content) {
        Ok(doc) => Some(doc.get_pages().len()),
        Err(e) => {
            tracing::debug!(error = %e, "Could not read PDF page count");
            None
        }
    }
}

/// Minimal PDF with `pages` empty A4 pages
#[cfg(test)]
pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
    use lopdf::{Document, Object, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            });
            Object::Reference(page_id)
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

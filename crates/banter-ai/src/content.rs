//! Attachment normalization.
//!
//! Turns a text prompt plus zero or more uploaded files into the content
//! payload the Messages API expects: attachment blocks in upload order,
//! followed by one trailing text block. A pure transform, no I/O.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use banter_common::AttachmentError;

use crate::{AttachmentSource, ContentBlock, TurnContent};

/// One uploaded file: its original name and raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Build the content payload for one user turn.
///
/// With no files the text passes through untouched. Otherwise each file
/// becomes a base64 block in input order, and the text (or a single
/// space when empty -- the API rejects empty text blocks) trails them.
pub fn normalize(text: &str, files: &[Attachment]) -> Result<TurnContent, AttachmentError> {
    if files.is_empty() {
        return Ok(TurnContent::Text(text.to_string()));
    }

    let mut blocks = Vec::with_capacity(files.len() + 1);
    for file in files {
        blocks.push(block_for(file)?);
    }

    let trailing = if text.is_empty() { " " } else { text };
    blocks.push(ContentBlock::Text {
        text: trailing.to_string(),
    });

    Ok(TurnContent::Blocks(blocks))
}

/// Whether a filename's extension is an accepted attachment format.
pub fn is_supported(filename: &str) -> bool {
    matches!(
        extension_of(filename).as_deref(),
        Some("pdf" | "jpeg" | "png" | "webp")
    )
}

fn block_for(file: &Attachment) -> Result<ContentBlock, AttachmentError> {
    let ext = extension_of(&file.filename)
        .ok_or_else(|| AttachmentError::UnsupportedType(file.filename.clone()))?;

    let data = BASE64.encode(&file.bytes);
    match ext.as_str() {
        "pdf" => Ok(ContentBlock::Document {
            source: AttachmentSource::base64("application/pdf", data),
        }),
        "jpeg" | "png" | "webp" => Ok(ContentBlock::Image {
            source: AttachmentSource::base64(format!("image/{ext}"), data),
        }),
        _ => Err(AttachmentError::UnsupportedType(file.filename.clone())),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

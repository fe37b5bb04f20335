use std::fs;
use std::path::Path;

use crate::error::UploadError;
use crate::interaction::{ImageSubtype, ImageUpload};

pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Accepts a file from disk the way the page's file picker does: the type
/// filter is applied to the name first, and only then are the bytes read.
pub fn accept_upload(path: &Path) -> Result<ImageUpload, UploadError> {
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_string();
    let subtype = subtype_for_name(&file_name).ok_or_else(|| UploadError::UnsupportedType {
        file_name: file_name.clone(),
    })?;
    let bytes = fs::read(path).map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageUpload {
        file_name,
        subtype,
        bytes,
    })
}

/// Same filter for content that is already in memory.
pub fn accept_upload_bytes(
    file_name: impl Into<String>,
    bytes: Vec<u8>,
) -> Result<ImageUpload, UploadError> {
    let file_name = file_name.into();
    let subtype = subtype_for_name(&file_name).ok_or_else(|| UploadError::UnsupportedType {
        file_name: file_name.clone(),
    })?;
    Ok(ImageUpload {
        file_name,
        subtype,
        bytes,
    })
}

fn subtype_for_name(file_name: &str) -> Option<ImageSubtype> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|value| value.to_str())?;
    if !ACCEPTED_EXTENSIONS
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    {
        return None;
    }
    ImageSubtype::from_extension(ext)
}

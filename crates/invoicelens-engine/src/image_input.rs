use image::ImageFormat;
use invoicelens_contracts::interaction::{ImageSubtype, ImageUpload};
use sha2::{Digest, Sha256};

use crate::error::DecodeError;

/// An upload that decoded cleanly. `bytes` is the original buffer, which is
/// also what goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub file_name: String,
    pub subtype: ImageSubtype,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.subtype.mime_type()
    }

    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

/// Decodes the buffered upload. The subtype is taken from the content rather
/// than the file name, so a JPEG saved as `.png` is still sent as JPEG.
pub fn decode_image(upload: Option<&ImageUpload>) -> Result<DecodedImage, DecodeError> {
    let Some(upload) = upload else {
        return Err(DecodeError::NoFileUploaded);
    };
    let format = image::guess_format(&upload.bytes).map_err(|source| DecodeError::Image {
        file_name: upload.file_name.clone(),
        source,
    })?;
    let subtype = match format {
        ImageFormat::Jpeg => ImageSubtype::Jpeg,
        ImageFormat::Png => ImageSubtype::Png,
        _ => {
            return Err(DecodeError::UnsupportedContent {
                file_name: upload.file_name.clone(),
            })
        }
    };
    let decoded = image::load_from_memory_with_format(&upload.bytes, format).map_err(|source| {
        DecodeError::Image {
            file_name: upload.file_name.clone(),
            source,
        }
    })?;

    Ok(DecodedImage {
        file_name: upload.file_name.clone(),
        subtype,
        width: decoded.width(),
        height: decoded.height(),
        bytes: upload.bytes.clone(),
    })
}


#[cfg(test)]
mod tests {
    use image::ImageFormat;
    use invoicelens_contracts::interaction::{ImageSubtype, ImageUpload};

    use super::fixtures::encoded_image;
    use super::decode_image;
    use crate::error::DecodeError;

    fn upload(name: &str, subtype: ImageSubtype, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            subtype,
            bytes,
        }
    }

    #[test]
    fn decodes_jpeg_dimensions_and_keeps_buffer() -> anyhow::Result<()> {
        let bytes = encoded_image(32, 24, ImageFormat::Jpeg);
        let source = upload("invoice.jpg", ImageSubtype::Jpeg, bytes.clone());
        let decoded = decode_image(Some(&source))?;
        assert_eq!(decoded.subtype, ImageSubtype::Jpeg);
        assert_eq!(decoded.mime_type(), "image/jpeg");
        assert_eq!((decoded.width, decoded.height), (32, 24));
        assert_eq!(decoded.bytes, bytes);
        assert_eq!(decoded.sha256_hex().len(), 64);
        Ok(())
    }

    #[test]
    fn content_wins_over_extension() -> anyhow::Result<()> {
        let source = upload(
            "mislabelled.jpg",
            ImageSubtype::Jpeg,
            encoded_image(4, 4, ImageFormat::Png),
        );
        let decoded = decode_image(Some(&source))?;
        assert_eq!(decoded.subtype, ImageSubtype::Png);
        Ok(())
    }

    #[test]
    fn absent_upload_is_file_not_found() {
        let err = decode_image(None).unwrap_err();
        assert!(matches!(err, DecodeError::NoFileUploaded));
        assert_eq!(err.to_string(), "No file uploaded");
    }

    #[test]
    fn bmp_content_behind_png_name_is_rejected() {
        let source = upload(
            "scan.png",
            ImageSubtype::Png,
            encoded_image(4, 4, ImageFormat::Bmp),
        );
        assert!(matches!(
            decode_image(Some(&source)),
            Err(DecodeError::UnsupportedContent { .. })
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let source = upload("broken.png", ImageSubtype::Png, b"not an image".to_vec());
        assert!(matches!(
            decode_image(Some(&source)),
            Err(DecodeError::Image { .. })
        ));
    }
}

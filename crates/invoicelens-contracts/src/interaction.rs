use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSubtype {
    Jpeg,
    Png,
}

impl ImageSubtype {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// Raw bytes of an accepted upload, read exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub subtype: ImageSubtype,
    pub bytes: Vec<u8>,
}

/// What the page holds when submit is pressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionInputs {
    pub prompt: String,
    pub upload: Option<ImageUpload>,
}

/// A validated submission: the prompt plus an attached image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRequest {
    pub prompt: String,
    pub image: ImageUpload,
}

/// The document appended to the store after a successful model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub input_text: String,
    pub response_text: String,
}

impl InteractionRecord {
    pub fn new(input_text: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            response_text: response_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{ImageSubtype, InteractionRecord};

    #[test]
    fn subtype_accepts_only_jpeg_and_png_extensions() {
        assert_eq!(ImageSubtype::from_extension("JPG"), Some(ImageSubtype::Jpeg));
        assert_eq!(ImageSubtype::from_extension("jpeg"), Some(ImageSubtype::Jpeg));
        assert_eq!(ImageSubtype::from_extension("png"), Some(ImageSubtype::Png));
        assert_eq!(ImageSubtype::from_extension("bmp"), None);
        assert_eq!(ImageSubtype::from_extension("webp"), None);
        assert_eq!(ImageSubtype::Png.mime_type(), "image/png");
        assert_eq!(ImageSubtype::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn record_serializes_to_two_fields() -> anyhow::Result<()> {
        let record = InteractionRecord::new("What is the total?", "Total: $42.00");
        let value: Value = serde_json::to_value(&record)?;
        assert_eq!(
            value,
            json!({
                "input_text": "What is the total?",
                "response_text": "Total: $42.00",
            })
        );
        Ok(())
    }
}

use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_DATABASE: &str = "invoice";
pub const DEFAULT_COLLECTION: &str = "invoice details";

/// Instruction sent ahead of every uploaded invoice.
pub const INVOICE_INSTRUCTION: &str = "You are an expert in understanding invoices.\n\
You will receive input images as invoices &\n\
you will have to answer questions based on the input image.";

/// Process-wide settings, read once at startup and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub google_api_key: String,
    pub mongo_uri: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub database: String,
    pub collection: String,
}

impl AppConfig {
    /// Builds the config from an arbitrary variable source.
    ///
    /// The credential is checked before the connection string so the first
    /// missing value is the one reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let google_api_key = read("GOOGLE_API_KEY")
            .or_else(|| read("GEMINI_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;
        let mongo_uri = read("MONGO_URI").ok_or(ConfigError::MissingMongoUri)?;

        Ok(Self {
            google_api_key,
            mongo_uri,
            gemini_api_base: read("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            gemini_model: read("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            database: read("MONGO_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            collection: read("MONGO_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("google_api_key", &"<redacted>")
            .field("mongo_uri", &"<redacted>")
            .field("gemini_api_base", &self.gemini_api_base)
            .field("gemini_model", &self.gemini_model)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish()
    }
}

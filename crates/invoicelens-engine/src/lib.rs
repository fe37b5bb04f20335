use std::time::Instant;

use anyhow::Result;
use invoicelens_contracts::error::ValidationError;
use invoicelens_contracts::interaction::{
    ImageUpload, InteractionRecord, InteractionRequest, SubmissionInputs,
};
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub mod error;
pub mod gemini;
pub mod image_input;
pub mod mongo;

pub use error::{DecodeError, SubmitError, UpstreamError};
pub use gemini::GeminiModel;
pub use image_input::{decode_image, DecodedImage};
pub use mongo::MongoRecordStore;

/// The three parts sent to the model, in wire order.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub instruction: &'a str,
    pub image: &'a DecodedImage,
    pub prompt: &'a str,
}

pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;
    fn generate_text(&self, request: &ModelRequest<'_>) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
}

/// Append-only sink for interaction records.
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;
    fn insert(&self, record: &InteractionRecord) -> Result<StoredRecord>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingSubmission,
    Processing,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub image: DecodedImage,
    pub record: InteractionRecord,
    pub stored: StoredRecord,
}

pub fn collect_inputs(prompt: &str, upload: Option<&ImageUpload>) -> SubmissionInputs {
    SubmissionInputs {
        prompt: prompt.to_string(),
        upload: upload.cloned(),
    }
}

/// Presence check only. The prompt may be empty.
pub fn validate(inputs: SubmissionInputs) -> Result<InteractionRequest, ValidationError> {
    match inputs.upload {
        Some(image) => Ok(InteractionRequest {
            prompt: inputs.prompt,
            image,
        }),
        None => Err(ValidationError::ImageRequired),
    }
}

/// Sequences one submission: validate, decode, call the model, show the
/// response, persist. Holds no state from one submission to the next.
pub struct Orchestrator<'a> {
    model: &'a dyn GenerativeModel,
    store: &'a dyn RecordStore,
    instruction: String,
    state: SessionState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        model: &'a dyn GenerativeModel,
        store: &'a dyn RecordStore,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            model,
            store,
            instruction: instruction.into(),
            state: SessionState::AwaitingSubmission,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn invoke_model(
        &self,
        prompt: &str,
        image: &DecodedImage,
        instruction: &str,
    ) -> Result<String, UpstreamError> {
        let request = ModelRequest {
            instruction,
            image,
            prompt,
        };
        let started = Instant::now();
        info!(model = self.model.name(), mime = image.mime_type(), "model call started");
        let text = self
            .model
            .generate_text(&request)
            .map_err(|err| UpstreamError::Model {
                model: self.model.name().to_string(),
                source: err.into(),
            })?;
        info!(
            model = self.model.name(),
            latency_ms = started.elapsed().as_millis() as u64,
            response_chars = text.chars().count(),
            "model call finished"
        );
        Ok(text)
    }

    pub fn persist(&self, prompt: &str, response_text: &str) -> Result<StoredRecord, UpstreamError> {
        let record = InteractionRecord::new(prompt, response_text);
        let stored = self
            .store
            .insert(&record)
            .map_err(|err| UpstreamError::Store {
                store: self.store.name().to_string(),
                source: err.into(),
            })?;
        info!(store = self.store.name(), record_id = %stored.id, "record inserted");
        Ok(stored)
    }

    /// Runs one submission end to end. `on_response` sees the model output
    /// before the record is written, so the page can render it even when the
    /// insert later fails.
    pub fn submit<F>(
        &mut self,
        inputs: SubmissionInputs,
        on_response: F,
    ) -> Result<SubmissionOutcome, SubmitError>
    where
        F: FnOnce(&str),
    {
        let submission_id = Uuid::new_v4();
        let span = info_span!("submission", id = %submission_id);
        let _entered = span.enter();

        let request = match validate(inputs) {
            Ok(request) => request,
            Err(err) => {
                warn!("submission rejected: {err}");
                return Err(err.into());
            }
        };

        self.state = SessionState::Processing;
        let result = self.process(submission_id, request, on_response);
        self.state = SessionState::AwaitingSubmission;
        if let Err(err) = &result {
            warn!("submission failed: {err}");
        }
        result
    }

    fn process<F>(
        &self,
        submission_id: Uuid,
        request: InteractionRequest,
        on_response: F,
    ) -> Result<SubmissionOutcome, SubmitError>
    where
        F: FnOnce(&str),
    {
        let image = decode_image(Some(&request.image))?;
        info!(
            file = %image.file_name,
            width = image.width,
            height = image.height,
            sha256 = %image.sha256_hex(),
            "upload decoded"
        );
        let response_text = self.invoke_model(&request.prompt, &image, &self.instruction)?;
        on_response(&response_text);
        let stored = self.persist(&request.prompt, &response_text)?;
        Ok(SubmissionOutcome {
            submission_id,
            image,
            record: InteractionRecord::new(request.prompt, response_text),
            stored,
        })
    }
}

use std::io::{self, BufRead, Write};
use std::path::Path;

use invoicelens_contracts::chat::{parse_intent, Action, CHAT_HELP_COMMANDS};
use invoicelens_contracts::error::UploadError;
use invoicelens_contracts::interaction::ImageUpload;
use invoicelens_contracts::upload::accept_upload;
use invoicelens_engine::{collect_inputs, decode_image, Orchestrator, SubmitError};
use tracing::{info, warn};

pub(crate) const PAGE_TITLE: &str = "Gemini Application";
pub(crate) const SUBMIT_LABEL: &str = "Tell me about the image";
pub(crate) const SAVED_MESSAGE: &str = "Response saved to MongoDB.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitReport {
    Saved,
    Rejected,
    Failed,
}

/// The page's widget state: the prompt field and the file picker.
pub(crate) struct Page<W: Write> {
    out: W,
    prompt: String,
    upload: Option<ImageUpload>,
}

impl<W: Write> Page<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            prompt: String::new(),
            upload: None,
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    pub(crate) fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{PAGE_TITLE}")?;
        writeln!(self.out, "{}", "=".repeat(PAGE_TITLE.len()))
    }

    pub(crate) fn set_prompt(&mut self, text: &str) -> io::Result<()> {
        self.prompt = text.to_string();
        writeln!(self.out, "Input Prompt: {}", self.prompt)
    }

    /// Runs a file through the upload control. A refused file leaves the
    /// current attachment as it was.
    pub(crate) fn attach(&mut self, path: &Path) -> io::Result<bool> {
        match accept_upload(path) {
            Ok(upload) => {
                info!(file = %upload.file_name, bytes = upload.bytes.len(), "upload accepted");
                self.echo_upload(&upload)?;
                self.upload = Some(upload);
                Ok(true)
            }
            Err(err @ UploadError::UnsupportedType { .. }) => {
                warn!("upload refused: {err}");
                self.error_banner(&err.to_string())?;
                Ok(false)
            }
            Err(err) => {
                warn!("upload failed: {err}");
                self.error_banner(&format!("{:#}", anyhow::Error::new(err)))?;
                Ok(false)
            }
        }
    }

    pub(crate) fn clear_upload(&mut self) -> io::Result<()> {
        self.upload = None;
        writeln!(self.out, "Image cleared.")
    }

    pub(crate) fn submit(&mut self, orchestrator: &mut Orchestrator<'_>) -> io::Result<SubmitReport> {
        writeln!(self.out, "[{SUBMIT_LABEL}]")?;
        let inputs = collect_inputs(&self.prompt, self.upload.as_ref());

        let mut response_shown: io::Result<()> = Ok(());
        let out = &mut self.out;
        let result = orchestrator.submit(inputs, |text| {
            response_shown = render_response(out, text);
        });
        response_shown?;

        match result {
            Ok(_) => {
                self.success_banner(SAVED_MESSAGE)?;
                Ok(SubmitReport::Saved)
            }
            Err(SubmitError::Validation(err)) => {
                self.error_banner(&err.to_string())?;
                Ok(SubmitReport::Rejected)
            }
            Err(err) => {
                self.error_banner(&format!("{:#}", anyhow::Error::new(err)))?;
                Ok(SubmitReport::Failed)
            }
        }
    }

    pub(crate) fn help(&mut self) -> io::Result<()> {
        writeln!(self.out, "Commands: {}", CHAT_HELP_COMMANDS.join(" "))?;
        writeln!(
            self.out,
            "Any other line sets the input prompt; use /prompt for text that starts with a command."
        )?;
        writeln!(self.out, "Quote upload paths that contain spaces or quotes.")
    }

    fn echo_upload(&mut self, upload: &ImageUpload) -> io::Result<()> {
        match decode_image(Some(upload)) {
            Ok(image) => writeln!(
                self.out,
                "Uploaded Image. {} ({}, {}x{})",
                image.file_name,
                image.subtype.as_str(),
                image.width,
                image.height
            ),
            Err(err) => writeln!(
                self.out,
                "Uploaded Image. {} (preview unavailable: {err})",
                upload.file_name
            ),
        }
    }

    fn error_banner(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "[error] {message}")
    }

    fn success_banner(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "[success] {message}")
    }
}

fn render_response<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    writeln!(out, "The Response is")?;
    writeln!(out, "{text}")
}

/// One-shot submission. A refused upload means submit is never pressed.
pub(crate) fn run_once<W: Write>(
    page: &mut Page<W>,
    orchestrator: &mut Orchestrator<'_>,
    prompt: &str,
    image: Option<&Path>,
) -> io::Result<Option<SubmitReport>> {
    page.header()?;
    page.set_prompt(prompt)?;
    if let Some(path) = image {
        if !page.attach(path)? {
            return Ok(None);
        }
    }
    page.submit(orchestrator).map(Some)
}

pub(crate) fn chat_loop<R: BufRead, W: Write>(
    page: &mut Page<W>,
    orchestrator: &mut Orchestrator<'_>,
    input: R,
) -> io::Result<()> {
    page.header()?;
    page.help()?;
    for line in input.lines() {
        let line = line?;
        let intent = parse_intent(&line);
        match intent.action {
            Action::Noop => {}
            Action::SetPrompt => page.set_prompt(&intent.arg)?,
            Action::Upload => {
                if intent.arg.is_empty() {
                    page.error_banner("/upload requires a path")?;
                } else {
                    page.attach(Path::new(&intent.arg))?;
                }
            }
            Action::ClearUpload => page.clear_upload()?,
            Action::Submit => {
                page.submit(orchestrator)?;
            }
            Action::Help => page.help()?,
            Action::Quit => break,
        }
        page.out.flush()?;
    }
    Ok(())
}

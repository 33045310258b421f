use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::prescription::ValidationError;
use common::model::share::ErrorPayload;
use thiserror::Error;

/// Shown instead of encoding details, which mean nothing to the person at the form.
const ENCODING_MESSAGE: &str =
    "The prescription contains characters that cannot be printed. Please remove special symbols or emoji and try again.";
const RENDER_MESSAGE: &str = "Could not generate the prescription PDF.";
const STORAGE_MESSAGE: &str = "The prescription was generated but could not be saved.";

/// Everything that can stop a prescription from being produced.
#[derive(Error, Debug)]
pub enum PrescriptionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Text holds a character the built-in PDF fonts cannot encode.
    #[error("unsupported character {character:?} (U+{:04X}) in {field}", code_point(.character))]
    Encoding {
        field: &'static str,
        character: char,
    },
    #[error("PDF rendering failed: {0}")]
    Render(String),
    #[error("could not store prescription: {0}")]
    Storage(#[from] std::io::Error),
}

impl PrescriptionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Encoding { .. } => "encoding",
            Self::Render(_) => "render",
            Self::Storage(_) => "storage",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Encoding { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Render(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show at the form. Only validation messages are specific.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Encoding { .. } => ENCODING_MESSAGE.to_string(),
            Self::Render(_) => RENDER_MESSAGE.to_string(),
            Self::Storage(_) => STORAGE_MESSAGE.to_string(),
        }
    }

    /// Logs the failure at a level matching its cause and converts it into a
    /// JSON `ErrorPayload` response.
    pub fn to_response(&self) -> HttpResponse {
        match self {
            Self::Validation(e) => log::debug!("Rejected prescription form: {}", e),
            Self::Encoding { .. } => log::warn!("Prescription not rendered: {}", self),
            Self::Render(_) | Self::Storage(_) => log::error!("Prescription failed: {}", self),
        }
        HttpResponse::build(self.status_code()).json(ErrorPayload {
            kind: self.kind().to_string(),
            message: self.user_message(),
        })
    }
}

fn code_point(c: &char) -> u32 {
    *c as u32
}

impl PrescriptionError {
    /// Wraps a PDF library failure.
    pub fn render(e: impl std::fmt::Display) -> Self {
        PrescriptionError::Render(e.to_string())
    }
}

/// Answers a body the JSON extractor rejected (malformed, wrong field type,
/// over the size limit) with an `ErrorPayload` of kind `request`.
pub fn request_body_error(err: JsonPayloadError) -> actix_web::Error {
    log::debug!("Rejected request body: {}", err);
    let response = HttpResponse::build(err.status_code()).json(ErrorPayload {
        kind: "request".to_string(),
        message: err.to_string(),
    });
    InternalError::from_response(err, response).into()
}

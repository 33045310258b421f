//! # Prescription Service Module
//!
//! Routes everything under `/api/prescriptions` to the handlers that turn a
//! filled-in prescription form into a PDF and into a shareable link.
//!
//! ## Sub-modules:
//! - `document`: validate, render and optionally save; shared by both render endpoints.
//! - `pdf`: the slip layout and PDF drawing, plus the download endpoint.
//! - `metrics`: Helvetica glyph widths, wrapping and the WinAnsi check.
//! - `link`: base64 `data:` URI packaging and the share endpoints.
//! - `save`: the optional local copy.

mod document;
mod link;
mod metrics;
mod pdf;
mod save;

use crate::error::request_body_error;
use actix_web::web::{post, scope, JsonConfig};
use actix_web::Scope;

/// The base path for all prescription endpoints.
const API_PATH: &str = "/api/prescriptions";

/// Configures and returns the Actix `Scope` for the prescription routes.
///
/// # Registered Routes:
///
/// *   **`POST /pdf`**:
///     - **Handler**: `pdf::process`
///     - **Description**: Renders the JSON `PrescriptionRequest` and returns the
///       PDF as an attachment named `<patient>_Prescription.pdf`.
///
/// *   **`POST /link`**:
///     - **Handler**: `link::process`
///     - **Description**: Renders the same request and returns a `SharePayload`
///       whose `link` is the whole PDF as a `data:application/pdf;base64,` URI.
///
/// *   **`POST /open`**:
///     - **Handler**: `link::open`
///     - **Description**: Decodes a shareable link and serves the PDF inline.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/pdf", post().to(pdf::process))
        .route("/link", post().to(link::process))
        .route("/open", post().to(link::open))
}

/// JSON extractor settings for the prescription endpoints.
///
/// Bodies over `limit` bytes, malformed JSON and fields of the wrong type are
/// answered with an `ErrorPayload` of kind `request`.
pub fn json_config(limit: usize) -> JsonConfig {
    JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| request_body_error(err))
}

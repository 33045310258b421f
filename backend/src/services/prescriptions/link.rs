//! # Shareable Link Service
//!
//! Packages rendered PDF bytes as a self-contained
//! `data:application/pdf;base64,...` URI that a doctor can paste into any
//! messaging app, and backs two endpoints:
//!
//! - `POST /api/prescriptions/link` renders the form and answers with a
//!   `SharePayload` holding the link (plus a `wa.me` URL when a phone number
//!   was supplied).
//! - `POST /api/prescriptions/open` takes a link back and serves the PDF
//!   inline, for browsers that refuse to navigate to `data:` URIs.
//!
//! The link carries the whole document and no checksum. Cutting it short
//! silently yields a broken PDF, so clients must always show it in full.

use crate::config::AppConfig;
use crate::error::PrescriptionError;
use crate::services::prescriptions::document;
use actix_web::http::header::{ContentDisposition, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::prescription::PrescriptionRecord;
use common::model::share::{ErrorPayload, SharePayload};
use common::requests::{OpenLinkRequest, PrescriptionRequest};
use thiserror::Error;

/// Everything before the base64 payload.
pub const DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

const WHATSAPP_BASE: &str = "https://wa.me/";

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link does not start with 'data:application/pdf;base64,'")]
    MissingPrefix,
    #[error("link payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Encodes `bytes` with the standard base64 alphabet, unwrapped, behind
/// [`DATA_URI_PREFIX`].
pub fn to_shareable_link(bytes: &[u8]) -> String {
    let mut link = String::with_capacity(DATA_URI_PREFIX.len() + bytes.len().div_ceil(3) * 4);
    link.push_str(DATA_URI_PREFIX);
    BASE64.encode_string(bytes, &mut link);
    link
}

/// Reverses [`to_shareable_link`]. Surrounding whitespace is ignored.
pub fn from_shareable_link(link: &str) -> Result<Vec<u8>, LinkError> {
    let payload = link
        .trim()
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or(LinkError::MissingPrefix)?;
    Ok(BASE64.decode(payload)?)
}

/// Text sent to the patient along with the link.
pub fn share_message(record: &PrescriptionRecord, link: &str) -> String {
    format!(
        "Prescription for {} from {} ({}): {}",
        record.patient_name,
        record.doctor_name,
        record.formatted_visit_date(),
        link
    )
}

/// `https://wa.me/<digits>?text=<message>`; `phone` is a normalized `+<digits>` number.
pub fn whatsapp_share_url(phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let text: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("{}{}?text={}", WHATSAPP_BASE, digits, text)
}

/// Actix web handler for `POST /api/prescriptions/link`.
///
/// # Returns
/// - `200 OK` with a `SharePayload` JSON body on success.
/// - The `PrescriptionError` status with a JSON `ErrorPayload` otherwise.
pub async fn process(
    config: web::Data<AppConfig>,
    payload: web::Json<PrescriptionRequest>,
) -> impl Responder {
    match build_share_payload(&config, payload.into_inner()).await {
        Ok(share) => HttpResponse::Ok().json(share),
        Err(e) => e.to_response(),
    }
}

async fn build_share_payload(
    config: &AppConfig,
    request: PrescriptionRequest,
) -> Result<SharePayload, PrescriptionError> {
    let (record, rendered) = document::prepare(config, request, document::today()).await?;
    let link = to_shareable_link(&rendered.bytes);
    let whatsapp_url = record
        .patient_phone
        .as_deref()
        .map(|phone| whatsapp_share_url(phone, &share_message(&record, &link)));

    Ok(SharePayload {
        file_name: rendered.file_name,
        byte_len: rendered.bytes.len(),
        page_count: rendered.page_count,
        link,
        saved_to: rendered.saved_to.map(|p| p.display().to_string()),
        whatsapp_url,
    })
}

/// Actix web handler for `POST /api/prescriptions/open`.
///
/// # Returns
/// - `200 OK` with the decoded PDF, displayed inline.
/// - `400 Bad Request` with an `ErrorPayload` if the link cannot be decoded.
pub async fn open(payload: web::Json<OpenLinkRequest>) -> impl Responder {
    match from_shareable_link(&payload.link) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Inline,
                parameters: vec![],
            })
            .body(bytes),
        Err(e) => {
            log::debug!("Rejected shareable link: {}", e);
            HttpResponse::BadRequest().json(ErrorPayload {
                kind: "link".to_string(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn link_has_prefix_and_round_trips() {
        let bytes = b"%PDF-1.3\n\x00\xff binary tail";
        let link = to_shareable_link(bytes);
        assert!(link.starts_with("data:application/pdf;base64,"));
        assert!(!link.contains('\n'));
        assert_eq!(from_shareable_link(&link).unwrap(), bytes);
    }

    #[test]
    fn uses_standard_alphabet_with_padding() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet, "-_8=" in the URL-safe one.
        assert_eq!(to_shareable_link(&[0xfb, 0xff]), format!("{}+/8=", DATA_URI_PREFIX));
        assert_eq!(to_shareable_link(&[]), DATA_URI_PREFIX);
    }

    #[test]
    fn length_is_prefix_plus_four_thirds() {
        let bytes = vec![7u8; 3000];
        assert_eq!(to_shareable_link(&bytes).len(), DATA_URI_PREFIX.len() + 4000);
    }

    #[test]
    fn wrong_prefix_or_truncation_is_rejected() {
        assert!(matches!(
            from_shareable_link("data:text/plain;base64,AAAA"),
            Err(LinkError::MissingPrefix)
        ));
        let link = to_shareable_link(b"hello world");
        let cut = &link[..link.len() - 3];
        assert!(matches!(from_shareable_link(cut), Err(LinkError::InvalidBase64(_))));
    }

    #[test]
    fn whatsapp_url_encodes_message() {
        let record = PrescriptionRecord::new(
            "Dr. A. Guide",
            "Jane Doe",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            "Rest",
        )
        .unwrap();
        let message = share_message(&record, "data:application/pdf;base64,QQ==");
        assert_eq!(
            message,
            "Prescription for Jane Doe from Dr. A. Guide (January 05, 2025): data:application/pdf;base64,QQ=="
        );

        let url = whatsapp_share_url("+15551234567", &message);
        assert!(url.starts_with("https://wa.me/15551234567?text=Prescription+for+Jane+Doe"));
        assert!(url.ends_with("base64%2CQQ%3D%3D"));
    }
}

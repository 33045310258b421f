use serde::{Deserialize, Serialize};

/// Response of `POST /api/prescriptions/link`.
///
/// `link` is the complete `data:application/pdf;base64,...` URI. Clients must
/// display it in full: a truncated link decodes to a corrupt PDF and nothing
/// on the receiving end can tell.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SharePayload {
    /// Suggested download name, `<patient>_Prescription.pdf`.
    pub file_name: String,
    pub link: String,
    /// Size of the PDF before encoding.
    pub byte_len: usize,
    pub page_count: usize,
    /// Where the server kept a local copy, when local saving is enabled.
    pub saved_to: Option<String>,
    /// `wa.me` URL prefilled with the link, when a phone number was given.
    pub whatsapp_url: Option<String>,
}

/// Body of every non-2xx answer from the prescription endpoints.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorPayload {
    /// `validation`, `encoding`, `render`, `storage`, `link` or `request`.
    pub kind: String,
    pub message: String,
}

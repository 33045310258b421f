use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Doctor name used when the form leaves the field blank.
pub const DEFAULT_DOCTOR: &str = "Dr. A. Guide";

/// Suffix appended to every derived PDF file name.
const FILE_NAME_SUFFIX: &str = "_Prescription.pdf";

/// Long-form date pattern printed on the slip, e.g. `January 05, 2025`.
const LONG_DATE_FORMAT: &str = "%B %d, %Y";

/// Reasons a submitted form is refused before anything is rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Patient name is required")]
    MissingPatientName,
    #[error("Medication list is required")]
    MissingMedication,
    /// The optional phone number is present but not in `+<digits>` form.
    #[error("Phone number '{0}' must start with '+' and contain 7 to 15 digits")]
    InvalidPhone(String),
}

/// A validated prescription, ready to be rendered.
///
/// Records are built fresh from each form submission through
/// `PrescriptionRequest::into_record` and are never mutated afterwards.
/// Holding one guarantees that `patient_name` and `medication_text` are
/// non-empty and that `doctor_name` has been defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub doctor_name: String,
    pub patient_name: String,
    pub visit_date: NaiveDate,
    /// Free text, may span several lines. Printed verbatim.
    pub medication_text: String,
    /// Normalized `+<digits>` number, if the doctor supplied one.
    pub patient_phone: Option<String>,
}

impl PrescriptionRecord {
    /// Builds a record, applying the same rules as form submission.
    pub fn new(
        doctor_name: &str,
        patient_name: &str,
        visit_date: NaiveDate,
        medication_text: &str,
    ) -> Result<Self, ValidationError> {
        if is_blank(patient_name) {
            return Err(ValidationError::MissingPatientName);
        }
        if is_blank(medication_text) {
            return Err(ValidationError::MissingMedication);
        }
        let doctor_name = if is_blank(doctor_name) {
            DEFAULT_DOCTOR
        } else {
            doctor_name.trim()
        };

        Ok(Self {
            doctor_name: doctor_name.to_string(),
            patient_name: patient_name.trim().to_string(),
            visit_date,
            medication_text: medication_text.to_string(),
            patient_phone: None,
        })
    }

    /// Attaches a phone number, normalizing it first. Blank input clears it.
    pub fn with_phone(mut self, phone: &str) -> Result<Self, ValidationError> {
        self.patient_phone = normalize_phone(phone)?;
        Ok(self)
    }

    /// File name offered for download, see [`file_name_for`].
    pub fn file_name(&self) -> String {
        file_name_for(&self.patient_name)
    }

    /// Visit date in the long form printed on the slip.
    pub fn formatted_visit_date(&self) -> String {
        format_long_date(self.visit_date)
    }
}

/// Derives `<name>_Prescription.pdf`, replacing every space with an underscore.
/// No other character is touched.
pub fn file_name_for(patient_name: &str) -> String {
    format!("{}{}", patient_name.replace(' ', "_"), FILE_NAME_SUFFIX)
}

pub fn format_long_date(date: NaiveDate) -> String {
    date.format(LONG_DATE_FORMAT).to_string()
}

/// Strips common separators and checks the `+` prefix and digit count.
/// Returns `Ok(None)` for blank input.
pub fn normalize_phone(raw: &str) -> Result<Option<String>, ValidationError> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    if compact.is_empty() {
        return Ok(None);
    }

    let digits = match compact.strip_prefix('+') {
        Some(rest) => rest,
        None => return Err(ValidationError::InvalidPhone(raw.to_string())),
    };
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone(raw.to_string()));
    }
    Ok(Some(compact))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

use crate::model::prescription::{PrescriptionRecord, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
/// Request payload for the prescription endpoints, as typed into the form.
/// Missing fields deserialize as empty and are rejected by `into_record`.
pub struct PrescriptionRequest {
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    /// ISO `YYYY-MM-DD`. Today when absent.
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub medication_text: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
}

impl PrescriptionRequest {
    /// Validates the form and fills in the defaults.
    ///
    /// `default_doctor` replaces a missing or blank doctor name and `today`
    /// replaces a missing visit date.
    pub fn into_record(
        self,
        default_doctor: &str,
        today: NaiveDate,
    ) -> Result<PrescriptionRecord, ValidationError> {
        let doctor = self
            .doctor_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| default_doctor.to_string());

        let record = PrescriptionRecord::new(
            &doctor,
            &self.patient_name,
            self.visit_date.unwrap_or(today),
            &self.medication_text,
        )?;

        match self.patient_phone {
            Some(phone) => record.with_phone(&phone),
            None => Ok(record),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
/// Request payload for `POST /api/prescriptions/open`.
pub struct OpenLinkRequest {
    /// A complete `data:application/pdf;base64,...` link.
    pub link: String,
}

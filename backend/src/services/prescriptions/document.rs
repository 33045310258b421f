//! The validate, render, save pipeline shared by the prescription endpoints.

use crate::config::AppConfig;
use crate::error::PrescriptionError;
use crate::services::prescriptions::{pdf, save};
use chrono::{Local, NaiveDate};
use common::model::prescription::PrescriptionRecord;
use common::requests::PrescriptionRequest;
use log::info;
use std::path::{Path, PathBuf};

/// PDF bytes and the name they are offered under. Never kept past the request.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Location of the local copy, if one was written.
    pub saved_to: Option<PathBuf>,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Renders `record` and, when `save_dir` is set, writes a local copy.
///
/// All or nothing: a failed save discards the rendered bytes.
pub fn produce(
    record: &PrescriptionRecord,
    save_dir: Option<&Path>,
) -> Result<RenderedDocument, PrescriptionError> {
    let pdf::RenderedPdf { bytes, page_count } = pdf::render_prescription(record)?;
    let file_name = record.file_name();
    let saved_to = match save_dir {
        Some(dir) => Some(save::write_copy(dir, &file_name, &bytes)?),
        None => None,
    };

    info!("Rendered {} ({} page(s), {} bytes)", file_name, page_count, bytes.len());
    Ok(RenderedDocument {
        file_name,
        bytes,
        page_count,
        saved_to,
    })
}

/// Validates `request` and renders it on the blocking pool.
///
/// Returns the validated record alongside the document so callers can use
/// fields such as the phone number.
pub async fn prepare(
    config: &AppConfig,
    request: PrescriptionRequest,
    today: NaiveDate,
) -> Result<(PrescriptionRecord, RenderedDocument), PrescriptionError> {
    let record = request.into_record(&config.default_doctor, today)?;

    let task_record = record.clone();
    let save_dir = config.save_dir.clone();
    let rendered = tokio::task::spawn_blocking(move || produce(&task_record, save_dir.as_deref()))
        .await
        .map_err(|e| PrescriptionError::Render(format!("render task failed: {}", e)))??;

    Ok((record, rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::prescription::ValidationError;

    fn request(patient: &str, medication: &str) -> PrescriptionRequest {
        PrescriptionRequest {
            patient_name: patient.into(),
            medication_text: medication.into(),
            visit_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn prepare_renders_with_config_defaults() {
        let config = AppConfig {
            default_doctor: "Dr. Configured".into(),
            ..AppConfig::default()
        };
        let (record, rendered) = prepare(&config, request("Jane Doe", "Aspirin"), today())
            .await
            .unwrap();

        assert_eq!(record.doctor_name, "Dr. Configured");
        assert_eq!(rendered.file_name, "Jane_Doe_Prescription.pdf");
        assert!(rendered.bytes.starts_with(b"%PDF-"));
        assert_eq!(rendered.page_count, 1);
        assert_eq!(rendered.saved_to, None);
    }

    #[test]
    fn produce_counts_every_page() {
        let list: Vec<String> = (1..=90).map(|i| format!("{i}. Folic acid 5mg daily")).collect();
        let record = PrescriptionRecord::new(
            "",
            "Jane Doe",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            &list.join("\n"),
        )
        .unwrap();
        let rendered = produce(&record, None).unwrap();

        assert!(rendered.page_count >= 2);
        let doc = lopdf::Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), rendered.page_count);
    }

    #[actix_web::test]
    async fn prepare_stops_at_validation() {
        let err = prepare(&AppConfig::default(), request("Jane Doe", " "), today())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PrescriptionError::Validation(ValidationError::MissingMedication)
        ));
    }

    #[actix_web::test]
    async fn prepare_writes_local_copy_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            save_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        let (_, rendered) = prepare(&config, request("Jane Doe", "Aspirin"), today())
            .await
            .unwrap();

        let path = rendered.saved_to.expect("copy should be written");
        assert_eq!(path, dir.path().join("Jane_Doe_Prescription.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), rendered.bytes);
    }

    #[test]
    fn produce_fails_whole_when_save_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let record = PrescriptionRecord::new(
            "",
            "../Jane",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            "Aspirin",
        )
        .unwrap();
        assert!(matches!(
            produce(&record, Some(dir.path())),
            Err(PrescriptionError::Storage(_))
        ));
    }
}

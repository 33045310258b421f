//! # Prescription PDF Renderer
//!
//! Turns a validated `PrescriptionRecord` into the bytes of an A4 PDF and
//! serves them from `POST /api/prescriptions/pdf`.
//!
//! ## Workflow
//!
//! 1.  **Text preparation**: every field goes through `metrics::printable_text`.
//!     The built-in Helvetica faces only cover WinAnsi, so anything else stops
//!     the render with `PrescriptionError::Encoding` before a page exists.
//!
//! 2.  **Layout**: `plan_pages` lays the slip out top to bottom with fixed row
//!     heights: doctor header, subtitle, rule, visit date, patient, the
//!     "Rx" heading and the wrapped medication text. A row that would cross
//!     the bottom margin opens a new page, so long lists paginate instead of
//!     running off the sheet.
//!
//! 3.  **Drawing**: `render_prescription` replays the plan with `printpdf`,
//!     adding a "Page N of M" footer when the slip needs more than one page.
//!
//! Output is deterministic. The document id is derived from the record and
//! the timestamps from the visit date. After saving, the trailer `/ID` pair
//! is rewritten with `lopdf` to that same id, so the same record always
//! produces the same bytes.

use crate::config::AppConfig;
use crate::error::PrescriptionError;
use crate::services::prescriptions::document;
use crate::services::prescriptions::metrics::{printable_text, text_width_mm, wrap_text, Face};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use common::model::prescription::PrescriptionRecord;
use common::requests::PrescriptionRequest;
use lopdf::{Object, StringFormat};
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, Greyscale, IndirectFontRef, Line, Mm,
    PdfConformance, PdfDocument, PdfLayerReference, Point,
};
use std::io::BufWriter;
use time::{Month, OffsetDateTime};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const FOOTER_BASELINE_MM: f32 = 10.0;

const SUBTITLE: &str = "Prescription Record";
const RX_HEADING: &str = "Rx / Medications & Instructions";
const PATIENT_LABEL: &str = "Patient: ";

/// Font size and row height (mm) of each kind of row.
const HEADER: (f32, f32) = (20.0, 10.0);
const SUBTITLE_ROW: (f32, f32) = (11.0, 6.0);
const DETAIL_ROW: (f32, f32) = (11.0, 6.5);
const PATIENT_ROW: (f32, f32) = (12.0, 7.0);
const HEADING_ROW: (f32, f32) = (13.0, 8.0);
const BODY_ROW: (f32, f32) = (11.0, 5.5);
const FOOTER_SIZE: f32 = 8.0;

/// Actix web handler for `POST /api/prescriptions/pdf`.
///
/// Validates the form, renders the slip and answers with the PDF as an
/// attachment named `<patient>_Prescription.pdf`.
///
/// # Returns
/// - `200 OK` with `application/pdf` bytes on success.
/// - The `PrescriptionError` status with a JSON `ErrorPayload` otherwise.
pub async fn process(
    config: web::Data<AppConfig>,
    payload: web::Json<PrescriptionRequest>,
) -> impl Responder {
    match document::prepare(&config, payload.into_inner(), document::today()).await {
        Ok((_, rendered)) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(rendered.file_name)],
            })
            .body(rendered.bytes),
        Err(e) => e.to_response(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
    Right,
    /// Left aligned, shifted right by the given width.
    Indent(f32),
}

/// One drawing instruction, positioned in millimetres from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawOp {
    Text {
        text: String,
        face: Face,
        size_pt: f32,
        x_mm: f32,
        y_mm: f32,
    },
    Rule {
        y_mm: f32,
    },
}

/// Cursor-driven page builder. `cursor` is the top of the next free row.
struct Layout {
    pages: Vec<Vec<DrawOp>>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < MARGIN_MM {
            self.pages.push(Vec::new());
            self.cursor = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
        if self.cursor < MARGIN_MM {
            self.ensure_room(0.0);
        }
    }

    /// Places a row made of consecutive runs sharing one baseline.
    fn row(&mut self, runs: &[(&str, Face)], (size_pt, height): (f32, f32), align: Align) {
        self.ensure_room(height);
        let total: f32 = runs
            .iter()
            .map(|(text, face)| text_width_mm(text, *face, size_pt))
            .sum();
        let mut x_mm = match align {
            Align::Left => MARGIN_MM,
            Align::Center => MARGIN_MM + (CONTENT_WIDTH_MM - total).max(0.0) / 2.0,
            Align::Right => MARGIN_MM + (CONTENT_WIDTH_MM - total).max(0.0),
            Align::Indent(offset) => MARGIN_MM + offset,
        };
        let y_mm = self.cursor - height * 0.75;
        for (text, face) in runs {
            if !text.is_empty() {
                self.push(DrawOp::Text {
                    text: text.to_string(),
                    face: *face,
                    size_pt,
                    x_mm,
                    y_mm,
                });
            }
            x_mm += text_width_mm(text, *face, size_pt);
        }
        self.cursor -= height;
    }

    /// Wraps `text` to the content width and lays out one row per line.
    fn paragraph(&mut self, text: &str, face: Face, metrics: (f32, f32), align: Align) {
        for line in wrap_text(text, face, metrics.0, CONTENT_WIDTH_MM) {
            self.row(&[(line.as_str(), face)], metrics, align);
        }
    }

    fn rule(&mut self, height: f32) {
        self.ensure_room(height);
        let y_mm = self.cursor - height / 2.0;
        self.push(DrawOp::Rule { y_mm });
        self.cursor -= height;
    }
}

/// Single-line fields never carry line breaks onto the slip.
fn single_line(text: &str, field: &'static str) -> Result<String, PrescriptionError> {
    Ok(printable_text(text, field)?.replace('\n', " "))
}

/// Lays the record out into pages of drawing instructions.
pub(crate) fn plan_pages(record: &PrescriptionRecord) -> Result<Vec<Vec<DrawOp>>, PrescriptionError> {
    let doctor = single_line(&record.doctor_name, "doctor name")?;
    let patient = single_line(&record.patient_name, "patient name")?;
    let medication = printable_text(&record.medication_text, "medication text")?;
    let date_line = format!("Date: {}", record.formatted_visit_date());

    let mut layout = Layout::new();
    layout.paragraph(&doctor, Face::Bold, HEADER, Align::Center);
    layout.row(&[(SUBTITLE, Face::Regular)], SUBTITLE_ROW, Align::Center);
    layout.rule(6.0);
    layout.row(&[(date_line.as_str(), Face::Regular)], DETAIL_ROW, Align::Right);

    let label_width = text_width_mm(PATIENT_LABEL, Face::Bold, PATIENT_ROW.0);
    let mut patient_rows = wrap_text(&patient, Face::Regular, PATIENT_ROW.0, CONTENT_WIDTH_MM - label_width)
        .into_iter();
    let first = patient_rows.next().unwrap_or_default();
    layout.row(&[(PATIENT_LABEL, Face::Bold), (first.as_str(), Face::Regular)], PATIENT_ROW, Align::Left);
    for rest in patient_rows {
        layout.row(&[(rest.as_str(), Face::Regular)], PATIENT_ROW, Align::Indent(label_width));
    }

    layout.gap(6.0);
    layout.row(&[(RX_HEADING, Face::Bold)], HEADING_ROW, Align::Left);
    layout.gap(1.5);
    layout.paragraph(&medication, Face::Regular, BODY_ROW, Align::Left);

    Ok(layout.pages)
}

/// The record fields hashed into the PDF's document id.
fn document_id(record: &PrescriptionRecord) -> String {
    let visit_date = record.visit_date.to_string();
    let mut context = md5::Context::new();
    for part in [
        record.doctor_name.as_str(),
        record.patient_name.as_str(),
        visit_date.as_str(),
        record.medication_text.as_str(),
    ] {
        context.consume(part.as_bytes());
        context.consume([0u8]);
    }
    format!("{:x}", context.finalize())
}

/// Midnight UTC of the visit date, used for every PDF timestamp.
fn visit_timestamp(record: &PrescriptionRecord) -> Result<OffsetDateTime, PrescriptionError> {
    use chrono::Datelike;

    let date = record.visit_date;
    let month = Month::try_from(date.month() as u8).map_err(PrescriptionError::render)?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(PrescriptionError::render)?;
    Ok(day.midnight().assume_utc())
}

fn draw(layer: &PdfLayerReference, ops: &[DrawOp], regular: &IndirectFontRef, bold: &IndirectFontRef) {
    for op in ops {
        match op {
            DrawOp::Text {
                text,
                face,
                size_pt,
                x_mm,
                y_mm,
            } => {
                let font = match face {
                    Face::Regular => regular,
                    Face::Bold => bold,
                };
                layer.use_text(text.as_str(), *size_pt, Mm(*x_mm), Mm(*y_mm), font);
            }
            DrawOp::Rule { y_mm } => {
                layer.set_outline_color(Color::Greyscale(Greyscale::new(0.35, None)));
                layer.set_outline_thickness(0.8);
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(MARGIN_MM), Mm(*y_mm)), false),
                        (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(*y_mm)), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }
}

/// PDF bytes plus the number of pages they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Renders `record` into PDF bytes.
///
/// Fails with `Encoding` if a field holds a character outside WinAnsi, or
/// `Render` if `printpdf` refuses the document. Nothing is returned on
/// failure.
pub fn render_prescription(record: &PrescriptionRecord) -> Result<RenderedPdf, PrescriptionError> {
    let pages = plan_pages(record)?;
    let stamp = visit_timestamp(record)?;
    let id = document_id(record);

    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("Prescription for {}", record.patient_name),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_document_id(id.clone())
        .with_creation_date(stamp)
        .with_mod_date(stamp)
        .with_metadata_date(stamp);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(PrescriptionError::render)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(PrescriptionError::render)?;

    let total = pages.len();
    for (index, ops) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };
        draw(&layer, ops, &regular, &bold);

        if total > 1 {
            let footer = format!("Page {} of {}", index + 1, total);
            let x_mm = MARGIN_MM + (CONTENT_WIDTH_MM - text_width_mm(&footer, Face::Regular, FOOTER_SIZE)) / 2.0;
            layer.use_text(footer, FOOTER_SIZE, Mm(x_mm), Mm(FOOTER_BASELINE_MM), &regular);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(PrescriptionError::render)?;
    let saved = buf.into_inner().map_err(PrescriptionError::render)?;

    Ok(RenderedPdf {
        bytes: with_stable_trailer_id(&saved, &id)?,
        page_count: total,
    })
}

/// Rewrites the trailer `/ID` pair as `[id id]`.
///
/// `printpdf` fills the second entry with a random instance id on every save,
/// which would make two renders of the same record differ.
fn with_stable_trailer_id(bytes: &[u8], id: &str) -> Result<Vec<u8>, PrescriptionError> {
    let mut doc = lopdf::Document::load_mem(bytes).map_err(PrescriptionError::render)?;
    let entry = || Object::String(id.as_bytes().to_vec(), StringFormat::Literal);
    doc.trailer.set("ID", Object::Array(vec![entry(), entry()]));

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out).map_err(PrescriptionError::render)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(medication: &str) -> PrescriptionRecord {
        PrescriptionRecord::new(
            "Dr. A. Guide",
            "Jane Doe",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            medication,
        )
        .unwrap()
    }

    fn page_text(bytes: &[u8]) -> (usize, String) {
        let doc = lopdf::Document::load_mem(bytes).expect("PDF should parse");
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let text = doc.extract_text(&pages).expect("text should extract");
        (pages.len(), text)
    }

    fn texts(ops: &[DrawOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                DrawOp::Rule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn renders_the_expected_strings() {
        let rendered = render_prescription(&record("Paracetamol 500mg twice daily")).unwrap();
        assert!(rendered.bytes.starts_with(b"%PDF-"));
        assert_eq!(rendered.page_count, 1);

        let (pages, text) = page_text(&rendered.bytes);
        assert_eq!(pages, 1);
        for expected in [
            "Dr. A. Guide",
            "Jane Doe",
            "Paracetamol 500mg twice daily",
            "January 05, 2025",
            "Prescription Record",
        ] {
            assert!(text.contains(expected), "missing {expected:?} in {text:?}");
        }
    }

    #[test]
    fn same_record_gives_identical_bytes() {
        let r = record("Amoxicillin 250mg\nthree times a day");
        assert_eq!(render_prescription(&r).unwrap(), render_prescription(&r).unwrap());
    }

    #[test]
    fn trailer_id_is_the_record_id_twice() {
        let r = record("Amoxicillin 250mg");
        let rendered = render_prescription(&r).unwrap();
        let doc = lopdf::Document::load_mem(&rendered.bytes).unwrap();

        let expected = document_id(&r).into_bytes();
        let ids = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(ids.len(), 2);
        for id in ids {
            assert_eq!(id.as_str().unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn different_records_get_different_ids() {
        assert_ne!(document_id(&record("A")), document_id(&record("B")));
        assert_eq!(document_id(&record("A")).len(), 32);
    }

    #[test]
    fn layout_order_matches_the_slip() {
        let pages = plan_pages(&record("Ibuprofen 200mg")).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            texts(&pages[0]),
            vec![
                "Dr. A. Guide",
                "Prescription Record",
                "Date: January 05, 2025",
                "Patient: ",
                "Jane Doe",
                "Rx / Medications & Instructions",
                "Ibuprofen 200mg",
            ]
        );
        assert!(pages[0].iter().any(|op| matches!(op, DrawOp::Rule { .. })));
    }

    #[test]
    fn everything_stays_inside_the_margins() {
        let long = "Metformin 850mg with breakfast and dinner, monitor glucose weekly ".repeat(12);
        let pages = plan_pages(&record(&long)).unwrap();
        for op in pages.iter().flatten() {
            if let DrawOp::Text { text, face, size_pt, x_mm, y_mm } = op {
                assert!(*x_mm >= MARGIN_MM - 1e-3);
                assert!(x_mm + text_width_mm(text, *face, *size_pt) <= PAGE_WIDTH_MM - MARGIN_MM + 1e-3);
                assert!(*y_mm >= MARGIN_MM - 1e-3 && *y_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
            }
        }
    }

    #[test]
    fn long_lists_continue_on_new_pages() {
        let list: Vec<String> = (1..=80).map(|i| format!("{i}. Vitamin D 1000 IU daily")).collect();
        let r = record(&list.join("\n"));

        let pages = plan_pages(&r).unwrap();
        assert!(pages.len() >= 2);
        let drawn: Vec<&str> = pages.iter().flat_map(|p| texts(p)).collect();
        assert!(drawn.contains(&"1. Vitamin D 1000 IU daily"));
        assert!(drawn.contains(&"80. Vitamin D 1000 IU daily"));

        let rendered = render_prescription(&r).unwrap();
        assert_eq!(rendered.page_count, pages.len());
        let (count, text) = page_text(&rendered.bytes);
        assert_eq!(count, pages.len());
        assert!(text.contains(&format!("Page 1 of {}", count)));
    }

    #[test]
    fn unsupported_characters_fail_without_output() {
        let err = render_prescription(&record("Take 1 💊 daily")).unwrap_err();
        assert!(matches!(
            err,
            PrescriptionError::Encoding { field: "medication text", character: '💊' }
        ));
    }

    #[test]
    fn accented_names_render() {
        let r = PrescriptionRecord::new(
            "Dra. Núñez",
            "Zoë Müller",
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            "Café con leche – no",
        )
        .unwrap();
        let rendered = render_prescription(&r).unwrap();
        let (_, text) = page_text(&rendered.bytes);
        for expected in ["Dra. Núñez", "Zoë Müller", "Café con leche – no", "December 31, 2024"] {
            assert!(text.contains(expected), "missing {expected:?} in {text:?}");
        }
    }
}

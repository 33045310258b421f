//! Glyph widths and line wrapping for the built-in Helvetica faces.
//!
//! The standard PDF fonts are not embedded, so their advance widths are taken
//! from the Adobe font metrics for Helvetica and Helvetica-Bold (units of
//! 1/1000 em). Every WinAnsi character has its own entry, so a wrapped row
//! never runs past the right margin.

use crate::error::PrescriptionError;

const PT_TO_MM: f32 = 25.4 / 72.0;
/// Widest Helvetica glyph ('@'). Only reached for text that bypassed `printable_text`.
const FALLBACK_WIDTH: u16 = 1015;
const TAB_AS_SPACES: &str = "    ";

/// Helvetica advance widths for ASCII 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold advance widths for ASCII 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Helvetica advance widths for Latin-1 0xA0..=0xFF.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // nbsp..'¯'
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // '°'..'¿'
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 'À'..'Ï'
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 'Ð'..'ß'
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 'à'..'ï'
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 'ð'..'ÿ'
];

/// Helvetica-Bold advance widths for Latin-1 0xA0..=0xFF.
const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// Characters WinAnsiEncoding assigns to the 0x80..=0x9F block, with their
/// Helvetica and Helvetica-Bold widths.
const WIN_ANSI_EXTRAS: [(char, u16, u16); 27] = [
    ('€', 556, 556),
    ('‚', 222, 278),
    ('ƒ', 556, 556),
    ('„', 333, 500),
    ('…', 1000, 1000),
    ('†', 556, 556),
    ('‡', 556, 556),
    ('ˆ', 333, 333),
    ('‰', 1000, 1000),
    ('Š', 667, 667),
    ('‹', 333, 333),
    ('Œ', 1000, 1000),
    ('Ž', 611, 611),
    ('‘', 222, 278),
    ('’', 222, 278),
    ('“', 333, 500),
    ('”', 333, 500),
    ('•', 350, 350),
    ('–', 556, 556),
    ('—', 1000, 1000),
    ('˜', 333, 333),
    ('™', 1000, 1000),
    ('š', 500, 556),
    ('›', 333, 333),
    ('œ', 944, 944),
    ('ž', 500, 500),
    ('Ÿ', 667, 667),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    fn width_units(self, c: char) -> u16 {
        let (ascii, latin1) = match self {
            Face::Regular => (&HELVETICA, &HELVETICA_LATIN1),
            Face::Bold => (&HELVETICA_BOLD, &HELVETICA_BOLD_LATIN1),
        };
        match c as u32 {
            code @ 0x20..=0x7E => ascii[(code - 0x20) as usize],
            code @ 0xA0..=0xFF => latin1[(code - 0xA0) as usize],
            _ => WIN_ANSI_EXTRAS
                .iter()
                .find(|(extra, _, _)| *extra == c)
                .map(|&(_, regular, bold)| match self {
                    Face::Regular => regular,
                    Face::Bold => bold,
                })
                .unwrap_or(FALLBACK_WIDTH),
        }
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width_mm(text: &str, face: Face, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(face.width_units(c))).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Whether the built-in fonts can print `c`.
pub fn is_win_ansi(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF)
        || WIN_ANSI_EXTRAS.iter().any(|(extra, _, _)| *extra == c)
}

/// Expands tabs, drops carriage returns and rejects anything the fonts cannot encode.
///
/// Line feeds are kept so the caller can split paragraphs.
pub fn printable_text(text: &str, field: &'static str) -> Result<String, PrescriptionError> {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => out.push('\n'),
            '\t' => out.push_str(TAB_AS_SPACES),
            c if is_win_ansi(c) => out.push(c),
            character => return Err(PrescriptionError::Encoding { field, character }),
        }
    }
    Ok(out)
}

/// Splits `text` into rows no wider than `max_width_mm`.
///
/// Each `\n` starts a new row and an empty source line yields an empty row.
/// Words are separated at spaces; a word longer than a whole row is cut
/// between characters.
pub fn wrap_text(text: &str, face: Face, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let mut rows = Vec::new();
    for line in text.split('\n') {
        wrap_line(line.trim_end(), face, size_pt, max_width_mm, &mut rows);
    }
    rows
}

fn wrap_line(line: &str, face: Face, size_pt: f32, max_width_mm: f32, rows: &mut Vec<String>) {
    let fits = |s: &str| text_width_mm(s, face, size_pt) <= max_width_mm;

    if fits(line) {
        rows.push(line.to_string());
        return;
    }

    // Leading indentation is kept on the first row only.
    let indent_len = line.len() - line.trim_start().len();
    let mut current = line[..indent_len].to_string();

    for word in line[indent_len..].split(' ').filter(|w| !w.is_empty()) {
        let candidate = if current.trim().is_empty() {
            format!("{}{}", current, word)
        } else {
            format!("{} {}", current, word)
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.trim().is_empty() {
            rows.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current = word.to_string();
            continue;
        }
        for c in word.chars() {
            current.push(c);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                rows.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.trim().is_empty() {
        rows.push(current);
    }
}

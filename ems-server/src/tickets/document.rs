//! PDF ticket with a scannable QR code
//!
//! Attached to confirmation emails as `ticket-<number>.pdf` and served to
//! admins from `/api/admin/tickets/{ticket_number}/document`. The QR code
//! encodes the signed payload from [`super::qr_payload`]; each dark module is
//! drawn as a filled square so the code stays sharp at any print size.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect};
use qrcode::{Color, EcLevel, QrCode};
use shared::util::format_millis;

use crate::error::BoxError;

/// Everything printed on one ticket
#[derive(Debug, Clone)]
pub struct TicketDocument<'a> {
    pub event_name: &'a str,
    pub event_venue: &'a str,
    pub event_date: &'a str,
    pub attendee_name: &'a str,
    pub company: Option<&'a str>,
    pub ticket_type_name: &'a str,
    pub ticket_number: &'a str,
    pub qr_payload: &'a str,
    pub registration_id: i64,
    pub issued_at: i64,
}

pub const CONTENT_TYPE: &str = "application/pdf";

// A4 portrait
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
/// Printed QR side length, quiet zone included
const QR_SIDE: f32 = 70.0;
/// Modules of white border required by scanners
const QUIET_ZONE: usize = 4;

/// Dark/light module grid of a QR code, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    pub width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    /// Encode `payload` with medium error correction (survives a crumpled
    /// print-out).
    pub fn encode(payload: &str) -> Result<Self, BoxError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
        let width = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();
        Ok(Self { width, dark })
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark.get(y * self.width + x).copied().unwrap_or(false)
    }

    pub fn dark_count(&self) -> usize {
        self.dark.iter().filter(|d| **d).count()
    }
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, size: f32, y: f32, value: &str) {
    layer.use_text(value, size, Mm(MARGIN), Mm(y), font);
}

fn draw_qr(layer: &PdfLayerReference, matrix: &QrMatrix, left: f32, bottom: f32) {
    let modules = matrix.width + 2 * QUIET_ZONE;
    let module = QR_SIDE / modules as f32;
    let top = bottom + QR_SIDE;

    for y in 0..matrix.width {
        for x in 0..matrix.width {
            if !matrix.is_dark(x, y) {
                continue;
            }
            let llx = left + (x + QUIET_ZONE) as f32 * module;
            let ury = top - (y + QUIET_ZONE) as f32 * module;
            layer.add_rect(Rect::new(
                Mm(llx),
                Mm(ury - module),
                Mm(llx + module),
                Mm(ury),
            ));
        }
    }
}

/// Render one ticket as a single-page PDF.
pub fn render_ticket_pdf(doc: &TicketDocument<'_>) -> Result<Vec<u8>, BoxError> {
    let matrix = QrMatrix::encode(doc.qr_payload)?;

    let title = format!("{} ticket {}", doc.event_name, doc.ticket_number);
    let (pdf, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_W), Mm(PAGE_H), "ticket");
    let layer = pdf.get_page(page).get_layer(layer);
    let bold = pdf.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let regular = pdf.add_builtin_font(BuiltinFont::Helvetica)?;

    let mut y = PAGE_H - MARGIN - 8.0;
    text(&layer, &bold, 22.0, y, doc.event_name);
    y -= 9.0;
    text(&layer, &regular, 12.0, y, doc.event_venue);
    y -= 6.0;
    text(&layer, &regular, 12.0, y, doc.event_date);

    y -= 16.0;
    let mut fields = vec![("Attendee", doc.attendee_name.to_string())];
    if let Some(company) = doc.company.filter(|c| !c.is_empty()) {
        fields.push(("Company", company.to_string()));
    }
    fields.push(("Ticket type", doc.ticket_type_name.to_string()));
    fields.push(("Ticket no.", doc.ticket_number.to_string()));
    fields.push(("Booking ref.", doc.registration_id.to_string()));
    fields.push(("Issued", format_millis(doc.issued_at)));
    for (label, value) in &fields {
        text(&layer, &bold, 11.0, y, label);
        layer.use_text(value.as_str(), 11.0, Mm(MARGIN + 35.0), Mm(y), &regular);
        y -= 7.0;
    }

    let qr_bottom = y - 8.0 - QR_SIDE;
    draw_qr(&layer, &matrix, (PAGE_W - QR_SIDE) / 2.0, qr_bottom);

    y = qr_bottom - 8.0;
    text(&layer, &regular, 10.0, y, "Present this code at the entrance.");
    y -= 5.0;
    text(
        &layer,
        &regular,
        10.0,
        y,
        "Each ticket admits one person once. Do not share this code.",
    );
    y -= 5.0;
    // Manual entry fallback when the scanner cannot read the code
    text(&layer, &regular, 8.0, y, doc.qr_payload);

    Ok(pdf.save_to_bytes()?)
}

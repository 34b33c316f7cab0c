// src/services/pdf.rs
//
// Renders the year-end tax receipt as a single-page PDF.

use crate::{
    config::OrganizationInfo,
    errors::{AppError, AppResult},
    models::{Donor, Receipt},
};
use lopdf::{Document, Object, Stream, dictionary};
use rust_decimal::Decimal;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 56.0;

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

struct Line {
    text: String,
    size: f32,
    bold: bool,
    align: Align,
    /// Extra space above the line, in points
    gap: f32,
}

impl Line {
    fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
            bold: false,
            align: Align::Left,
            gap: 0.0,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    fn after(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }
}

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

fn receipt_lines(org: &OrganizationInfo, donor: &Donor, receipt: &Receipt) -> Vec<Line> {
    let mut lines = vec![
        Line::new("Official Donation Receipt", 20.0).bold().centered(),
        Line::new(&org.name, 12.0).centered().after(10.0),
        Line::new(&org.address, 12.0).centered(),
        Line::new(
            format!("CRA Registration #: {}", org.registration_number),
            12.0,
        )
        .centered(),
        Line::new(format!("Receipt Number: {}", receipt.receipt_number), 10.0).after(24.0),
        Line::new(
            format!("Issue Date: {}", receipt.issued_at.format("%Y-%m-%d")),
            10.0,
        ),
        Line::new(format!("Fiscal Year: {}", receipt.fiscal_year), 10.0),
        Line::new("Donor Information:", 12.0).bold().after(18.0),
        Line::new(donor.full_name(), 10.0),
        Line::new(&donor.address, 10.0),
        Line::new(
            format!("{}, {} {}", donor.city, donor.province, donor.postal_code),
            10.0,
        ),
    ];
    if let Some(email) = donor.email.as_deref().filter(|e| !e.is_empty()) {
        lines.push(Line::new(format!("Email: {}", email), 10.0));
    }
    lines.extend([
        Line::new("Donation Details:", 12.0).bold().after(18.0),
        Line::new(
            format!(
                "Period: January 1 - December 31, {}",
                receipt.fiscal_year
            ),
            10.0,
        ),
        Line::new(
            format!("Total Donations: {}", format_money(receipt.total_amount)),
            10.0,
        ),
        Line::new(
            format!(
                "Eligible Amount for Tax Receipt: {}",
                format_money(receipt.tax_deductible)
            ),
            10.0,
        ),
        Line::new(
            "This official donation receipt is for income tax purposes.",
            10.0,
        )
        .after(24.0),
        Line::new(
            "This organization is registered as a charitable organization under the Income Tax Act (Canada).",
            10.0,
        ),
        Line::new("Thank you for your generous support!", 8.0)
            .centered()
            .after(30.0),
        Line::new(
            format!("For questions, contact: {}", org.contact_email),
            8.0,
        )
        .centered(),
    ]);
    lines
}

/// PDF string literals only need the delimiters escaped; anything outside
/// printable ASCII is replaced since the standard fonts cannot show it.
fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn content_stream(lines: &[Line]) -> String {
    let mut content = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        y -= line.gap + line.size * 1.4;
        // Helvetica averages roughly half an em per glyph
        let width = line.text.chars().count() as f32 * line.size * 0.5;
        let x = match line.align {
            Align::Left => MARGIN,
            Align::Center => ((PAGE_WIDTH - width) / 2.0).max(MARGIN),
        };
        let font = if line.bold { "F2" } else { "F1" };
        content.push_str("BT\n");
        content.push_str(&format!("/{} {} Tf\n", font, line.size));
        content.push_str(&format!("{:.1} {:.1} Td\n", x, y));
        content.push_str(&format!("({}) Tj\n", escape_pdf_string(&line.text)));
        content.push_str("ET\n");
    }
    content
}

pub fn render_receipt(
    org: &OrganizationInfo,
    donor: &Donor,
    receipt: &Receipt,
) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let regular_id = doc.new_object_id();
    let bold_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    // Fonts
    doc.objects.insert(
        regular_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        }),
    );
    doc.objects.insert(
        bold_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        }),
    );

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        }),
    );

    let content = content_stream(&receipt_lines(org, donor, receipt));
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(dictionary! {}, content.into_bytes())),
    );

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Pdf(e.to_string()))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReceiptType;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn org() -> OrganizationInfo {
        OrganizationInfo {
            name: "Halton-Peel Buddhist Cultural Society".to_string(),
            address: "1 Temple Rd, Mississauga, ON".to_string(),
            registration_number: "123456789RR0001".to_string(),
            contact_email: "info@temple.org".to_string(),
        }
    }

    fn donor() -> Donor {
        Donor {
            id: Uuid::new_v4(),
            user_id: None,
            primary_donor_id: None,
            first_name: "Amara".to_string(),
            last_name: "Silva (Jr)".to_string(),
            email: Some("amara@example.com".to_string()),
            mobile: None,
            landline: None,
            address: "22 Lake St".to_string(),
            city: "Oakville".to_string(),
            province: "ON".to_string(),
            postal_code: "L6J 1A1".to_string(),
            country: "Canada".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            id: Uuid::new_v4(),
            receipt_number: "YE2024-ABCDEF12".to_string(),
            donor_id: Uuid::new_v4(),
            receipt_type: ReceiptType::TaxReceipt,
            fiscal_year: 2024,
            total_amount: dec!(75.00),
            tax_deductible: dec!(73.00),
            issued_at: Utc.with_ymd_and_hms(2025, 1, 15, 2, 0, 0).unwrap(),
            file_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renders_a_loadable_single_page_pdf() {
        let bytes = render_receipt(&org(), &donor(), &receipt()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn receipt_text_carries_amounts_and_escapes_parentheses() {
        let content = content_stream(&receipt_lines(&org(), &donor(), &receipt()));
        assert!(content.contains("(Receipt Number: YE2024-ABCDEF12) Tj"));
        assert!(content.contains("Eligible Amount for Tax Receipt: $73.00"));
        assert!(content.contains("Amara Silva \\(Jr\\)"));
    }

    #[test]
    fn non_ascii_is_replaced() {
        assert_eq!(escape_pdf_string("Café (a\\b)"), "Caf? \\(a\\\\b\\)");
    }
}

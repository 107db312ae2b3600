use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::format::MoneyFormat;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    /// Header band, table header and the inverted totals block.
    pub accent: Rgb,
    /// Client box border and title.
    pub highlight: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
    pub rule: Rgb,
    pub on_accent: Rgb,
    /// Alternating row tint, client box and footer background.
    pub tint: Rgb,
}

impl Palette {
    pub fn navy() -> Self {
        Palette {
            accent: Rgb(0.05, 0.1, 0.22),
            highlight: Rgb(0.0, 0.45, 0.75),
            text: Rgb(0.05, 0.05, 0.05),
            muted: Rgb(0.4, 0.4, 0.4),
            rule: Rgb(0.9, 0.9, 0.9),
            on_accent: Rgb::WHITE,
            tint: Rgb(0.98, 0.98, 0.99),
        }
    }

    pub fn mono() -> Self {
        Palette {
            accent: Rgb(0.15, 0.15, 0.15),
            highlight: Rgb(0.3, 0.3, 0.3),
            text: Rgb(0.0, 0.0, 0.0),
            muted: Rgb(0.45, 0.45, 0.45),
            rule: Rgb(0.85, 0.85, 0.85),
            on_accent: Rgb::WHITE,
            tint: Rgb(0.96, 0.96, 0.96),
        }
    }
}

/// Fixed page geometry, in points. A4 portrait only.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub header_height: f32,
    pub continuation_header_height: f32,
    pub client_box_height: f32,
    pub table_header_height: f32,
    pub row_height: f32,
    /// Added to `row_height` for every wrapped description line past the first.
    pub line_height: f32,
    pub footer_height: f32,
    /// Lowest y a row or the totals block may reach.
    pub safe_bottom: f32,
    pub totals_width: f32,
    pub totals_height: f32,
    pub totals_gap: f32,
    /// Column x-offsets measured back from the right margin.
    pub qty_offset: f32,
    pub unit_price_offset: f32,
    pub amount_offset: f32,
    pub cell_padding: f32,
    pub description_chars: usize,
    pub address_chars: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            page_width: 595.0,
            page_height: 842.0,
            margin: 40.0,
            header_height: 100.0,
            continuation_header_height: 50.0,
            client_box_height: 80.0,
            table_header_height: 28.0,
            row_height: 24.0,
            line_height: 12.0,
            footer_height: 80.0,
            safe_bottom: 100.0,
            totals_width: 240.0,
            totals_height: 70.0,
            totals_gap: 16.0,
            qty_offset: 270.0,
            unit_price_offset: 180.0,
            amount_offset: 90.0,
            cell_padding: 8.0,
            description_chars: 45,
            address_chars: 70,
        }
    }
}

impl Geometry {
    pub fn right(&self) -> f32 {
        self.page_width - self.margin
    }

    pub fn qty_x(&self) -> f32 {
        self.right() - self.qty_offset
    }

    pub fn unit_price_x(&self) -> f32 {
        self.right() - self.unit_price_offset
    }

    pub fn amount_x(&self) -> f32 {
        self.right() - self.amount_offset
    }

    /// Cursor position right below a continuation page's header band.
    pub fn continuation_top(&self) -> f32 {
        self.page_height - self.continuation_header_height - 20.0
    }
}

/// Printed strings. French by default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub company: String,
    pub address: String,
    pub tax_id: String,
    pub date: String,
    pub number_prefix: String,
    pub invoice_recipient: String,
    pub quote_recipient: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
    pub total: String,
    pub continued: String,
    pub bank_details: String,
    pub iban: String,
    pub account_holder: String,
    pub payment_note: String,
    /// `{days}` is replaced by the configured validity.
    pub quote_validity: String,
    /// `{page}` and `{pages}` are replaced once the page count is known.
    pub page: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            company: "ENTREPRISE".into(),
            address: "ADRESSE".into(),
            tax_id: "SIRET".into(),
            date: "Date :".into(),
            number_prefix: "N°".into(),
            invoice_recipient: "FACTURÉ À".into(),
            quote_recipient: "DESTINATAIRE DU DEVIS".into(),
            description: "DESCRIPTION".into(),
            quantity: "QTÉ".into(),
            unit_price: "PRIX U.".into(),
            amount: "TOTAL".into(),
            total: "TOTAL HT".into(),
            continued: "(suite)".into(),
            bank_details: "INFORMATIONS BANCAIRES".into(),
            iban: "IBAN :".into(),
            account_holder: "Titulaire :".into(),
            payment_note: "Paiement à réception de facture.".into(),
            quote_validity: "Devis valable {days} jours.".into(),
            page: "Page {page} / {pages}".into(),
        }
    }
}

impl Labels {
    pub fn page_label(&self, page: usize, pages: usize) -> String {
        self.page
            .replace("{page}", &page.to_string())
            .replace("{pages}", &pages.to_string())
    }

    pub fn validity_note(&self, days: u32) -> String {
        self.quote_validity.replace("{days}", &days.to_string())
    }
}

/// The company issuing the documents: header block and payment details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issuer {
    pub brand: String,
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub iban: Option<String>,
    pub account_holder: Option<String>,
}

impl Default for Issuer {
    fn default() -> Self {
        Issuer {
            brand: "FACTURE PDF".into(),
            name: "Votre entreprise".into(),
            address: "1 rue de l'Exemple, 75000 Paris".into(),
            tax_id: "000 000 000 00000".into(),
            iban: None,
            account_holder: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Navy,
    Mono,
}

impl std::str::FromStr for ThemeVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navy" => Ok(ThemeVariant::Navy),
            "mono" => Ok(ThemeVariant::Mono),
            other => Err(Error::Config(format!("unknown theme variant '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub palette: Palette,
    pub geometry: Geometry,
    pub labels: Labels,
    pub money: MoneyFormat,
    pub quote_validity_days: u32,
    /// Printed left of the totals block, e.g. a VAT exemption mention.
    pub legal_note: Option<String>,
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        let palette = match variant {
            ThemeVariant::Navy => Palette::navy(),
            ThemeVariant::Mono => Palette::mono(),
        };
        Theme {
            palette,
            geometry: Geometry::default(),
            labels: Labels::default(),
            money: MoneyFormat::default(),
            quote_validity_days: 30,
            legal_note: Some("TVA non applicable, art. 293 B du CGI".into()),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::new(ThemeVariant::default())
    }
}

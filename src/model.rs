use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "facture", alias = "invoice")]
    Invoice,
    #[serde(rename = "devis", alias = "quote")]
    Quote,
}

impl DocumentKind {
    /// Upper-case label printed in the header badge and used in file names.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "FACTURE",
            DocumentKind::Quote => "DEVIS",
        }
    }

    /// Wire name, as accepted in the `type` query parameter.
    pub fn slug(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "facture",
            DocumentKind::Quote => "devis",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facture" | "invoice" => Ok(DocumentKind::Invoice),
            "devis" | "quote" => Ok(DocumentKind::Quote),
            other => Err(Error::Validation(format!("unknown document kind '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    /// Quote turned into an invoice. Terminal: line items are frozen.
    Converted,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        self == DocumentStatus::Converted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Accepted => "accepted",
            DocumentStatus::Converted => "converted",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "sent" => Ok(DocumentStatus::Sent),
            "accepted" => Ok(DocumentStatus::Accepted),
            "converted" => Ok(DocumentStatus::Converted),
            other => Err(Error::Validation(format!("unknown status '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        LineItem {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// quantity × unit price, rounded half away from zero to the cent.
    ///
    /// Both factors are taken at their shortest decimal form, so `1.005` is
    /// worth 101 cents rather than the 100 its binary value would round to.
    pub fn amount_cents(&self) -> i64 {
        let product = decimal_units(self.quantity).checked_mul(decimal_units(self.unit_price));
        let Some(product) = product else {
            return (self.quantity * self.unit_price * 100.0).round() as i64;
        };
        let divisor = 10i128.pow(2 * DECIMAL_DIGITS - 2);
        let half = divisor / 2;
        let cents = if product >= 0 {
            product.saturating_add(half) / divisor
        } else {
            product.saturating_sub(half) / divisor
        };
        cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), Error> {
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(Error::Validation(format!(
                "line {}: quantity must be a non-negative number",
                index + 1
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(Error::Validation(format!(
                "line {}: unit price must be a non-negative number",
                index + 1
            )));
        }
        Ok(())
    }
}

/// Fractional digits kept from quantities and unit prices.
const DECIMAL_DIGITS: u32 = 6;

/// `value` in millionths, read from its shortest decimal representation.
fn decimal_units(value: f64) -> i128 {
    let text = value.abs().to_string();
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac: String = frac
        .chars()
        .chain(std::iter::repeat('0'))
        .take(DECIMAL_DIGITS as usize)
        .collect();
    let units = format!("{int}{frac}").parse::<i128>().unwrap_or(i128::MAX);
    if value < 0.0 { -units } else { units }
}

pub(crate) fn sum_cents(items: &[LineItem]) -> i64 {
    items.iter().map(LineItem::amount_cents).sum()
}

pub(crate) fn validate_items(items: &[LineItem]) -> Result<(), Error> {
    items
        .iter()
        .enumerate()
        .try_for_each(|(i, item)| item.validate(i))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub number: String,
    pub date: NaiveDate,
    pub kind: DocumentKind,
    pub client_id: String,
    #[serde(default)]
    pub status: DocumentStatus,
    /// Stored total. Display always recomputes from the line items.
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// A document together with the client it references, as resolved for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentRecord {
    pub document: Document,
    pub client: Client,
}

impl DocumentRecord {
    pub fn line_items(&self) -> &[LineItem] {
        &self.document.line_items
    }

    pub fn total_cents(&self) -> i64 {
        sum_cents(self.line_items())
    }

    /// Check a record handed back by the data collaborator before laying it
    /// out. Bad stored data is an upstream failure, not a caller mistake.
    pub fn validate(&self) -> Result<(), Error> {
        let doc = &self.document;
        let bad = |detail: String| Error::Upstream(format!("{} {}: {detail}", doc.kind, doc.id));
        if doc.number.trim().is_empty() {
            return Err(bad("no number".into()));
        }
        if self.client.id != doc.client_id {
            return Err(bad(format!(
                "references client {}, resolved {}",
                doc.client_id, self.client.id
            )));
        }
        validate_items(self.line_items()).map_err(|e| match e {
            Error::Validation(detail) => bad(detail),
            other => other,
        })
    }
}

/// Input of a creation: everything but the number, which is allocated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftDocument {
    pub kind: DocumentKind,
    pub date: NaiveDate,
    pub client_id: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

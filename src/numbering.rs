use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{Document, DocumentKind, DraftDocument, sum_cents};
use crate::store::DocumentStore;

/// How many candidates `allocate` tries before giving up on a busy period.
pub const MAX_ATTEMPTS: usize = 5;

/// Numbering format of one document kind.
///
/// `prefix` is a template: `{year}` expands to the four-digit year and
/// `{month}` to the two-digit month of the document date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingScheme {
    pub prefix: String,
    pub width: usize,
}

impl NumberingScheme {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        NumberingScheme {
            prefix: prefix.into(),
            width,
        }
    }

    /// `2025-10-001`
    pub fn invoice() -> Self {
        NumberingScheme::new("{year}-{month}-", 3)
    }

    /// `D-2025-0001`
    pub fn quote() -> Self {
        NumberingScheme::new("D-{year}-", 4)
    }

    pub fn period_prefix(&self, date: NaiveDate) -> String {
        self.prefix
            .replace("{year}", &format!("{:04}", date.year()))
            .replace("{month}", &format!("{:02}", date.month()))
    }

    /// Next number of the period `date` falls in, given the numbers already used.
    ///
    /// Numbers outside the period, or whose remainder does not end in digits,
    /// are ignored. An empty period starts at 1.
    pub fn next_number<S: AsRef<str>>(&self, date: NaiveDate, existing: &[S]) -> String {
        let prefix = self.period_prefix(date);
        let last = existing
            .iter()
            .filter_map(|n| n.as_ref().strip_prefix(prefix.as_str()))
            .filter_map(trailing_sequence)
            .max()
            .unwrap_or(0);
        format!("{prefix}{:0width$}", last + 1, width = self.width)
    }
}

/// Per-kind schemes, as configured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub invoice: NumberingScheme,
    pub quote: NumberingScheme,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        NumberingConfig {
            invoice: NumberingScheme::invoice(),
            quote: NumberingScheme::quote(),
        }
    }
}

impl NumberingConfig {
    pub fn scheme(&self, kind: DocumentKind) -> &NumberingScheme {
        match kind {
            DocumentKind::Invoice => &self.invoice,
            DocumentKind::Quote => &self.quote,
        }
    }
}

fn trailing_sequence(rest: &str) -> Option<u64> {
    let digits = rest.len() - rest.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    rest[rest.len() - digits..].parse().ok()
}

/// Number `draft` and insert it.
///
/// The store owns uniqueness of `(kind, number)`: when another writer took the
/// candidate first the period is re-read and the next candidate tried. A scan
/// failure aborts the creation.
pub fn allocate(
    store: &dyn DocumentStore,
    draft: &DraftDocument,
    scheme: &NumberingScheme,
) -> Result<Document, Error> {
    allocate_with(store, draft, scheme, |document| {
        store.insert_document(document.clone())?;
        Ok(document)
    })
}

/// Like [`allocate`], with `insert` storing each numbered candidate.
pub(crate) fn allocate_with(
    store: &dyn DocumentStore,
    draft: &DraftDocument,
    scheme: &NumberingScheme,
    mut insert: impl FnMut(Document) -> Result<Document, Error>,
) -> Result<Document, Error> {
    let prefix = scheme.period_prefix(draft.date);
    let id = uuid::Uuid::new_v4().to_string();

    for attempt in 1..=MAX_ATTEMPTS {
        let existing = store.numbers_in_period(draft.kind, &prefix)?;
        let number = scheme.next_number(draft.date, &existing);
        let document = Document {
            id: id.clone(),
            number: number.clone(),
            date: draft.date,
            kind: draft.kind,
            client_id: draft.client_id.clone(),
            status: Default::default(),
            total_amount: sum_cents(&draft.line_items) as f64 / 100.0,
            line_items: draft.line_items.clone(),
        };
        match insert(document) {
            Ok(stored) => {
                log::info!("allocated {} {number} (attempt {attempt})", draft.kind);
                return Ok(stored);
            }
            Err(Error::Conflict(taken)) => {
                log::debug!("{} {taken} taken, retrying", draft.kind);
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict(format!(
        "no free {} number in {prefix} after {MAX_ATTEMPTS} attempts",
        draft.kind
    )))
}

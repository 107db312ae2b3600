use chrono::NaiveDate;

use crate::error::Error;
use crate::model::{
    Document, DocumentKind, DocumentStatus, DraftDocument, LineItem, sum_cents, validate_items,
};
use crate::numbering::{self, NumberingScheme};
use crate::store::DocumentStore;

/// Validate a draft, check its client exists and store it under a fresh number.
pub fn create(
    store: &dyn DocumentStore,
    draft: &DraftDocument,
    scheme: &NumberingScheme,
) -> Result<Document, Error> {
    if draft.client_id.trim().is_empty() {
        return Err(Error::Validation("client id is required".into()));
    }
    validate_items(&draft.line_items)?;
    store.resolve_client(&draft.client_id)?;
    numbering::allocate(store, draft, scheme)
}

/// Replace the line items of a document and recompute its stored total.
pub fn amend(
    store: &dyn DocumentStore,
    kind: DocumentKind,
    id: &str,
    items: Vec<LineItem>,
) -> Result<Document, Error> {
    validate_items(&items)?;
    let document = store.modify_document(kind, id, &mut |document: &mut Document| {
        if document.status.is_terminal() {
            return Err(Error::Validation(format!(
                "{kind} {} is converted and can no longer be amended",
                document.number
            )));
        }
        document.total_amount = sum_cents(&items) as f64 / 100.0;
        document.line_items = items.clone();
        Ok(())
    })?;
    log::info!("amended {kind} {}", document.number);
    Ok(document)
}

/// Turn a quote into a new invoice dated `date`, then mark the quote converted.
///
/// Numbering the invoice and freezing the quote happen in one store step, so
/// a quote never yields more than one invoice.
pub fn convert_quote(
    store: &dyn DocumentStore,
    quote_id: &str,
    date: NaiveDate,
    scheme: &NumberingScheme,
) -> Result<Document, Error> {
    let quote = store.resolve_document(DocumentKind::Quote, quote_id)?.document;
    if quote.status.is_terminal() {
        return Err(Error::Validation(format!(
            "quote {} was already converted",
            quote.number
        )));
    }

    let draft = DraftDocument {
        kind: DocumentKind::Invoice,
        date,
        client_id: quote.client_id.clone(),
        line_items: quote.line_items.clone(),
    };
    let invoice = numbering::allocate_with(store, &draft, scheme, |invoice| {
        store.convert_quote(quote_id, invoice)
    })?;
    log::info!("converted quote {} into invoice {}", quote.number, invoice.number);
    Ok(invoice)
}

/// Move a document to `status`. Converted is reached only through
/// [`convert_quote`] and never left.
pub fn set_status(
    store: &dyn DocumentStore,
    kind: DocumentKind,
    id: &str,
    status: DocumentStatus,
) -> Result<Document, Error> {
    store.modify_document(kind, id, &mut |document: &mut Document| {
        if status == document.status {
            return Ok(());
        }
        if document.status.is_terminal() {
            return Err(Error::Validation(format!(
                "{kind} {} is converted, its status is final",
                document.number
            )));
        }
        if status.is_terminal() {
            return Err(Error::Validation(format!(
                "{kind} {} can only become converted through a conversion",
                document.number
            )));
        }
        document.status = status;
        Ok(())
    })
}

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use facture_pdf::{
    Client, ComposeContext, Document, DocumentKind, DocumentRecord, DocumentStatus, DocumentStore,
    FontBook, Issuer, JsonStore, LineItem, Theme,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn client(id: &str, name: &str) -> Client {
    Client {
        id: id.to_string(),
        name: name.to_string(),
        address: "1 Rue X".to_string(),
        email: None,
        phone: None,
        tax_id: None,
    }
}

/// `n` single-line items priced 10.00, 11.00, 12.00, ...
pub fn items(n: usize) -> Vec<LineItem> {
    (0..n)
        .map(|i| LineItem::new(format!("Prestation {}", i + 1), 1.0, 10.0 + i as f64))
        .collect()
}

pub fn document(kind: DocumentKind, id: &str, number: &str, items: Vec<LineItem>) -> Document {
    Document {
        id: id.to_string(),
        number: number.to_string(),
        date: date(2025, 10, 14),
        kind,
        client_id: "c-1".to_string(),
        status: DocumentStatus::Draft,
        total_amount: 0.0,
        line_items: items,
    }
}

pub fn record(kind: DocumentKind, number: &str, items: Vec<LineItem>) -> DocumentRecord {
    DocumentRecord {
        document: document(kind, "doc-1", number, items),
        client: client("c-1", "Acme"),
    }
}

/// The invoice used across the end-to-end tests: one line, 2 × 100.00.
pub fn acme_invoice() -> DocumentRecord {
    record(
        DocumentKind::Invoice,
        "F-2025-0007",
        vec![LineItem::new("Service A", 2.0, 100.0)],
    )
}

/// In-memory store holding client `c-1` and the given documents.
pub fn store_with(documents: Vec<Document>) -> Arc<JsonStore> {
    let store = JsonStore::in_memory();
    store.insert_client(client("c-1", "Acme")).expect("insert client");
    for document in documents {
        store.insert_document(document).expect("insert document");
    }
    Arc::new(store)
}

pub struct Fixture {
    pub theme: Theme,
    pub issuer: Issuer,
    pub fonts: FontBook,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            theme: Theme::default(),
            issuer: Issuer::default(),
            fonts: FontBook::builtin(),
        }
    }

    pub fn ctx(&self) -> ComposeContext<'_> {
        ComposeContext {
            theme: &self.theme,
            issuer: &self.issuer,
            fonts: &self.fonts,
        }
    }
}

/// Output directory: tests/output/<name>/
pub fn output_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("tests/output").join(name);
    fs::create_dir_all(&dir).expect("create output dir");
    dir
}

/// Fresh, empty directory under tests/output/scratch/.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("tests/output/scratch")
        .join(format!("{name}-{}", uuid::Uuid::new_v4().simple()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

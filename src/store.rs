use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{Client, Document, DocumentKind, DocumentRecord, DocumentStatus, sum_cents};

/// Read side of the data collaborator: everything a render needs.
pub trait DataSource: Send + Sync {
    fn resolve_document(&self, kind: DocumentKind, id: &str) -> Result<DocumentRecord, Error>;

    fn resolve_client(&self, id: &str) -> Result<Client, Error>;
}

/// Write side, used by numbering and the document lifecycle.
pub trait DocumentStore: DataSource {
    /// Numbers of `kind` starting with `prefix`.
    fn numbers_in_period(&self, kind: DocumentKind, prefix: &str) -> Result<Vec<String>, Error>;

    /// Fails with `Error::Conflict` when `(kind, number)` is already taken.
    fn insert_document(&self, document: Document) -> Result<(), Error>;

    /// Apply `change` to the stored document and persist the result in one
    /// step. Nothing is written when `change` fails.
    fn modify_document(
        &self,
        kind: DocumentKind,
        id: &str,
        change: &mut dyn FnMut(&mut Document) -> Result<(), Error>,
    ) -> Result<Document, Error>;

    /// Insert `invoice` and mark quote `quote_id` converted in one step.
    ///
    /// The invoice takes the client and line items the quote holds at that
    /// moment. A quote already converted is `Error::Validation`; a taken
    /// invoice number is `Error::Conflict`.
    fn convert_quote(&self, quote_id: &str, invoice: Document) -> Result<Document, Error>;

    fn insert_client(&self, client: Client) -> Result<(), Error>;

    fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>, Error>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    clients: Vec<Client>,
    #[serde(default)]
    documents: Vec<Document>,
}

impl Snapshot {
    fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    fn document(&self, kind: DocumentKind, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.kind == kind && d.id == id)
    }

    fn document_mut(&mut self, kind: DocumentKind, id: &str) -> Result<&mut Document, Error> {
        self.documents
            .iter_mut()
            .find(|d| d.kind == kind && d.id == id)
            .ok_or_else(|| Error::NotFound(format!("{kind} {id}")))
    }

    fn insert(&mut self, document: Document) -> Result<(), Error> {
        if self
            .documents
            .iter()
            .any(|d| d.kind == document.kind && d.number == document.number)
        {
            return Err(Error::Conflict(document.number));
        }
        if self.document(document.kind, &document.id).is_some() {
            return Err(Error::Validation(format!(
                "{} {} already exists",
                document.kind, document.id
            )));
        }
        self.documents.push(document);
        Ok(())
    }
}

/// Clients and documents kept in one JSON file, or only in memory.
///
/// Mutations are serialized by a mutex and each one rewrites the whole file
/// through a temporary file and a rename, so readers never see a torn file.
pub struct JsonStore {
    path: Option<PathBuf>,
    state: Mutex<Snapshot>,
}

impl JsonStore {
    pub fn in_memory() -> Self {
        JsonStore {
            path: None,
            state: Mutex::new(Snapshot::default()),
        }
    }

    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let snapshot = if path.exists() {
            let data = std::fs::read(&path)
                .map_err(|e| Error::Upstream(format!("{}: {e}", path.display())))?;
            serde_json::from_slice(&data)
                .map_err(|e| Error::Upstream(format!("{}: {e}", path.display())))?
        } else {
            Snapshot::default()
        };
        log::debug!(
            "opened store {} ({} clients, {} documents)",
            path.display(),
            snapshot.clients.len(),
            snapshot.documents.len()
        );
        Ok(JsonStore {
            path: Some(path),
            state: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Snapshot>, Error> {
        self.state
            .lock()
            .map_err(|_| Error::Upstream("store lock poisoned".into()))
    }

    /// Apply `change` to a copy, persist it, then publish it.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Snapshot) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            save(path, &next)?;
        }
        *state = next;
        Ok(out)
    }
}

fn save(path: &Path, snapshot: &Snapshot) -> Result<(), Error> {
    let data = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| Error::Upstream(format!("encoding store: {e}")))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Upstream(format!("{}: {e}", parent.display())))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &data).map_err(|e| Error::Upstream(format!("{}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::Upstream(format!("{}: {e}", path.display())))
}

impl DataSource for JsonStore {
    fn resolve_document(&self, kind: DocumentKind, id: &str) -> Result<DocumentRecord, Error> {
        let state = self.lock()?;
        let document = state
            .document(kind, id)
            .ok_or_else(|| Error::NotFound(format!("{kind} {id}")))?;
        let client = state.client(&document.client_id).ok_or_else(|| {
            Error::NotFound(format!("client {} of {kind} {id}", document.client_id))
        })?;
        Ok(DocumentRecord {
            document: document.clone(),
            client: client.clone(),
        })
    }

    fn resolve_client(&self, id: &str) -> Result<Client, Error> {
        self.lock()?
            .client(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("client {id}")))
    }
}

impl DocumentStore for JsonStore {
    fn numbers_in_period(&self, kind: DocumentKind, prefix: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .lock()?
            .documents
            .iter()
            .filter(|d| d.kind == kind && d.number.starts_with(prefix))
            .map(|d| d.number.clone())
            .collect())
    }

    fn insert_document(&self, document: Document) -> Result<(), Error> {
        self.mutate(|state| state.insert(document))
    }

    fn modify_document(
        &self,
        kind: DocumentKind,
        id: &str,
        change: &mut dyn FnMut(&mut Document) -> Result<(), Error>,
    ) -> Result<Document, Error> {
        self.mutate(|state| {
            let document = state.document_mut(kind, id)?;
            change(document)?;
            Ok(document.clone())
        })
    }

    fn convert_quote(&self, quote_id: &str, mut invoice: Document) -> Result<Document, Error> {
        self.mutate(|state| {
            let quote = state.document_mut(DocumentKind::Quote, quote_id)?;
            if quote.status.is_terminal() {
                return Err(Error::Validation(format!(
                    "quote {} was already converted",
                    quote.number
                )));
            }
            quote.status = DocumentStatus::Converted;
            invoice.client_id = quote.client_id.clone();
            invoice.line_items = quote.line_items.clone();
            invoice.total_amount = sum_cents(&invoice.line_items) as f64 / 100.0;
            state.insert(invoice.clone())?;
            Ok(invoice)
        })
    }

    fn insert_client(&self, client: Client) -> Result<(), Error> {
        self.mutate(|state| {
            match state.clients.iter_mut().find(|c| c.id == client.id) {
                Some(existing) => *existing = client,
                None => state.clients.push(client),
            }
            Ok(())
        })
    }

    fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>, Error> {
        let mut documents: Vec<Document> = self
            .lock()?
            .documents
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));
        Ok(documents)
    }
}

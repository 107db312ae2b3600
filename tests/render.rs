mod common;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use facture_pdf::pdf::compose;
use facture_pdf::{
    Action, ArtifactStore, Client, DataSource, DocumentKind, DocumentRecord, Error,
    FsArtifactStore, RenderOptions, RenderParams, RenderRequest, Renderer, artifact_path,
    file_name, render_to_file,
};

use common::{Fixture, acme_invoice, store_with};

fn acme_renderer() -> Renderer {
    Renderer::new(
        store_with(vec![acme_invoice().document]),
        RenderOptions::default(),
    )
}

fn view(id: &str) -> RenderRequest {
    RenderRequest::new(DocumentKind::Invoice, id, Action::View)
}

#[test]
fn acme_invoice_end_to_end() {
    common::init_logging();
    let fixture = Fixture::new();
    let layout = compose(&acme_invoice(), fixture.ctx()).unwrap();
    assert_eq!(layout.rows.len(), 1);
    assert_eq!(layout.total_cents, 20000);
    assert!(layout.pages[0].contains_text("200,00\u{a0}€"));
    assert!(layout.pages[0].contains_text("Acme"));
    assert!(layout.pages[0].contains_text("1 Rue X"));
    assert!(layout.pages[0].contains_text("N° F-2025-0007"));

    let rendered = acme_renderer().render(&view("doc-1")).unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF-"));
    assert_eq!(rendered.page_count, 1);
    assert_eq!(rendered.file_name, "FACTURE_F-2025-0007.pdf");
    assert_eq!(rendered.content_type(), "application/pdf");
    assert_eq!(
        rendered.content_disposition(),
        "inline; filename=\"FACTURE_F-2025-0007.pdf\""
    );
    assert_eq!(rendered.cache_control(), "no-store");
    assert!(rendered.artifact.is_none());
}

#[test]
fn download_is_an_attachment() {
    let request = RenderRequest::new(DocumentKind::Invoice, "doc-1", Action::Download);
    let rendered = acme_renderer().render(&request).unwrap();
    assert_eq!(
        rendered.content_disposition(),
        "attachment; filename=\"FACTURE_F-2025-0007.pdf\""
    );
}

#[test]
fn writes_a_file() {
    let output = common::output_dir("render").join("acme.pdf");
    let rendered = render_to_file(&acme_invoice(), &Default::default(), &output).unwrap();
    assert_eq!(fs::read(&output).unwrap(), rendered.bytes);
    assert_eq!(rendered.total_cents, 20000);
}

fn params(id: Option<&str>, kind: Option<&str>, action: Option<&str>) -> RenderParams {
    RenderParams {
        id: id.map(str::to_string),
        kind: kind.map(str::to_string),
        action: action.map(str::to_string),
    }
}

#[test]
fn request_defaults() {
    let request = RenderRequest::from_params(&params(Some("doc-1"), None, None)).unwrap();
    assert_eq!(request, view("doc-1"));

    let request =
        RenderRequest::from_params(&params(Some(" q-9 "), Some("devis"), Some("download")))
            .unwrap();
    assert_eq!(
        request,
        RenderRequest::new(DocumentKind::Quote, "q-9", Action::Download)
    );
}

#[test]
fn request_validation() {
    for p in [
        params(None, None, None),
        params(Some("  "), Some("facture"), None),
        params(Some("doc-1"), Some("avoir"), None),
        params(Some("doc-1"), None, Some("print")),
    ] {
        let err = RenderRequest::from_params(&p).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err:?}");
        assert_eq!(err.status_code(), 400);
    }
}

#[test]
fn unknown_document_is_not_found() {
    let err = acme_renderer().render(&view("nope")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
    assert_eq!(err.status_code(), 404);

    // Right id, wrong kind.
    let request = RenderRequest::new(DocumentKind::Quote, "doc-1", Action::View);
    assert!(matches!(
        acme_renderer().render(&request),
        Err(Error::NotFound(_))
    ));
}

struct Unreachable;

impl DataSource for Unreachable {
    fn resolve_document(&self, _: DocumentKind, _: &str) -> Result<DocumentRecord, Error> {
        Err(Error::Upstream("connection reset by peer at 10.0.0.7:5432".into()))
    }

    fn resolve_client(&self, _: &str) -> Result<Client, Error> {
        Err(Error::Upstream("connection reset by peer at 10.0.0.7:5432".into()))
    }
}

#[test]
fn upstream_failure_hides_details() {
    let renderer = Renderer::new(Arc::new(Unreachable), RenderOptions::default());
    let err = renderer.render(&view("doc-1")).unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "internal server error");
}

struct Slow(Duration);

impl DataSource for Slow {
    fn resolve_document(&self, _: DocumentKind, _: &str) -> Result<DocumentRecord, Error> {
        std::thread::sleep(self.0);
        Ok(acme_invoice())
    }

    fn resolve_client(&self, _: &str) -> Result<Client, Error> {
        Ok(acme_invoice().client)
    }
}

#[test]
fn exceeding_the_deadline_is_a_failure() {
    let options = RenderOptions {
        deadline: Duration::from_millis(5),
        ..Default::default()
    };
    let renderer = Renderer::new(Arc::new(Slow(Duration::from_millis(50))), options);
    let err = renderer.render(&view("doc-1")).unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "{err:?}");
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "render timed out");
}

/// Counts uploads, keeps nothing.
#[derive(Default)]
struct CountingBucket(AtomicUsize);

impl ArtifactStore for CountingBucket {
    fn put(&self, _: &str, _: &[u8], _: &str) -> Result<(), Error> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn public_url(&self, _: &str) -> Option<String> {
        None
    }
}

#[test]
fn late_render_stores_no_artifact() {
    let bucket = Arc::new(CountingBucket::default());
    let renderer = Renderer::new(
        Arc::new(Slow(Duration::from_millis(50))),
        RenderOptions::default(),
    )
    .with_artifacts(bucket.clone());

    let cutoff = Instant::now() + Duration::from_millis(10);
    let err = renderer.render_until(&view("doc-1"), cutoff).unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "{err:?}");
    assert_eq!(bucket.0.load(Ordering::SeqCst), 0);

    let rendered = renderer
        .render_until(&view("doc-1"), Instant::now() + Duration::from_secs(30))
        .unwrap();
    assert!(rendered.artifact.is_some());
    assert_eq!(bucket.0.load(Ordering::SeqCst), 1);
}

#[test]
fn artifact_path_layout() {
    let document = acme_invoice().document;
    assert_eq!(artifact_path(&document), "2025/10/FACTURE_F-2025-0007_doc-1.pdf");

    let mut quote = common::document(DocumentKind::Quote, "q/1", "D-2025/0001", vec![]);
    quote.date = common::date(2026, 1, 5);
    assert_eq!(artifact_path(&quote), "2026/01/DEVIS_D-2025-0001_q-1.pdf");
}

#[test]
fn file_names_are_header_safe() {
    assert_eq!(file_name(DocumentKind::Invoice, "F-2025-0007"), "FACTURE_F-2025-0007.pdf");
    assert_eq!(file_name(DocumentKind::Quote, "D 2025/\"7\""), "DEVIS_D_2025__7_.pdf");
}

#[test]
fn rerender_overwrites_with_identical_bytes() {
    common::init_logging();
    let dir = common::scratch_dir("artifacts");
    let store = FsArtifactStore::new(&dir).with_base_url("https://cdn.example.com/pdf/");
    let renderer = acme_renderer().with_artifacts(Arc::new(store));

    let first = renderer.render(&view("doc-1")).unwrap();
    let second = renderer.render(&view("doc-1")).unwrap();

    let artifact = first.artifact.clone().unwrap();
    assert_eq!(artifact.path, "2025/10/FACTURE_F-2025-0007_doc-1.pdf");
    assert_eq!(
        artifact.url.as_deref(),
        Some("https://cdn.example.com/pdf/2025/10/FACTURE_F-2025-0007_doc-1.pdf")
    );
    assert_eq!(second.artifact, first.artifact);
    assert_eq!(first.bytes, second.bytes);

    let stored = fs::read(dir.join(&artifact.path)).unwrap();
    assert_eq!(stored, second.bytes);

    let files: Vec<_> = fs::read_dir(dir.join("2025/10")).unwrap().collect();
    assert_eq!(files.len(), 1, "temporary files left behind");
}

struct BrokenBucket;

impl ArtifactStore for BrokenBucket {
    fn put(&self, _: &str, _: &[u8], _: &str) -> Result<(), Error> {
        Err(Error::Storage("bucket unavailable".into()))
    }

    fn public_url(&self, _: &str) -> Option<String> {
        None
    }
}

#[test]
fn storage_failure_still_returns_bytes() {
    let renderer = acme_renderer().with_artifacts(Arc::new(BrokenBucket));
    let rendered = renderer.render(&view("doc-1")).unwrap();
    assert!(rendered.artifact.is_none());
    assert!(rendered.bytes.starts_with(b"%PDF-"));

    let plain = acme_renderer().render(&view("doc-1")).unwrap();
    assert_eq!(rendered.bytes, plain.bytes);
}

#[test]
fn fs_store_refuses_escaping_paths() {
    let store = FsArtifactStore::new(common::scratch_dir("escape"));
    for path in ["../outside.pdf", "2025//x.pdf", "/abs.pdf"] {
        assert!(matches!(
            store.put(path, b"%PDF-", "application/pdf"),
            Err(Error::Storage(_))
        ));
    }
    assert!(store.public_url("x.pdf").is_none());
}

#[test]
fn multi_page_render() {
    let mut record = acme_invoice();
    record.document.line_items = common::items(70);
    let renderer = Renderer::new(store_with(vec![record.document]), RenderOptions::default());
    let rendered = renderer.render(&view("doc-1")).unwrap();
    assert!(rendered.page_count >= 3);
    assert!(rendered.bytes.starts_with(b"%PDF-"));
}

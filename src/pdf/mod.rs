mod compose;
mod layout;
mod table;
mod writer;

pub use compose::{ComposeContext, DrawOp, Layout, RenderedPage, RowPlacement, Stroke, compose};
pub use layout::wrap;

use crate::error::Error;
use crate::fonts::FontBook;
use crate::model::DocumentRecord;

/// A finished PDF together with what the layout decided.
#[derive(Clone, Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub total_cents: i64,
}

/// Compose and serialize a document in one go.
pub fn render(record: &DocumentRecord, ctx: ComposeContext<'_>) -> Result<RenderedDocument, Error> {
    let t0 = std::time::Instant::now();

    let layout = compose(record, ctx)?;
    let t_layout = t0.elapsed();

    let bytes = writer::write_pdf(&layout, ctx.fonts)?;
    let t_write = t0.elapsed();

    log::info!(
        "Render phases: layout={:.1}ms, write={:.1}ms ({} {}, {} page(s))",
        t_layout.as_secs_f64() * 1000.0,
        (t_write - t_layout).as_secs_f64() * 1000.0,
        record.document.kind,
        record.document.number,
        layout.page_count(),
    );

    Ok(RenderedDocument {
        bytes,
        page_count: layout.page_count(),
        total_cents: layout.total_cents,
    })
}

/// Serialize an already composed layout.
pub fn write(layout: &Layout, fonts: &FontBook) -> Result<Vec<u8>, Error> {
    writer::write_pdf(layout, fonts)
}

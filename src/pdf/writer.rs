use std::collections::{BTreeMap, BTreeSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::error::Error;
use crate::fonts::{FontBook, FontEntry, FontWeight, register_font};

use super::compose::{DrawOp, Layout, Stroke};

/// Serialize a composed layout. Identical layouts give identical bytes.
pub(crate) fn write_pdf(layout: &Layout, fonts: &FontBook) -> Result<Vec<u8>, Error> {
    if layout.pages.is_empty() {
        return Err(Error::Render("layout has no pages".into()));
    }

    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: fonts, subset to the characters each weight actually shows
    let mut used: BTreeMap<FontWeight, BTreeSet<char>> = BTreeMap::new();
    for page in &layout.pages {
        for op in &page.ops {
            if let DrawOp::Text { weight, text, .. } = op {
                used.entry(*weight).or_default().extend(text.chars());
            }
        }
    }
    let mut entries: BTreeMap<FontWeight, FontEntry> = BTreeMap::new();
    for (weight, chars) in &mut used {
        chars.insert(' ');
        let entry = register_font(&mut pdf, fonts, *weight, &mut alloc, chars);
        entries.insert(*weight, entry);
    }
    let t_fonts = t0.elapsed();

    // Phase 2: content streams
    let n = layout.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let geometry_box = page_box(layout);

    for (i, page) in layout.pages.iter().enumerate() {
        let mut content = Content::new();
        for op in &page.ops {
            draw_op(&mut content, op, &entries)?;
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed)
            .filter(Filter::FlateDecode);
    }
    let t_content = t0.elapsed();

    // Phase 3: page tree
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(geometry_box)
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        let mut font_dict = resources.fonts();
        for entry in entries.values() {
            font_dict.pair(Name(entry.pdf_name.as_bytes()), entry.font_ref);
        }
    }

    let bytes = pdf.finish();
    let t_assembly = t0.elapsed();

    log::info!(
        "Write phases: font_embed={:.1}ms, content={:.1}ms, assembly={:.1}ms ({} pages, {} bytes)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_content - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_content).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );

    Ok(bytes)
}

/// Media box shared by all pages: the composer only produces one page size.
fn page_box(layout: &Layout) -> Rect {
    let (w, h) = layout.page_size;
    Rect::new(0.0, 0.0, w, h)
}

fn draw_op(
    content: &mut Content,
    op: &DrawOp,
    entries: &BTreeMap<FontWeight, FontEntry>,
) -> Result<(), Error> {
    match op {
        DrawOp::Text {
            x,
            y,
            size,
            weight,
            color,
            text,
        } => {
            let entry = entries
                .get(weight)
                .ok_or_else(|| Error::Render(format!("no font registered for {weight:?}")))?;
            let bytes = entry.encode(text);
            content
                .begin_text()
                .set_fill_rgb(color.0, color.1, color.2)
                .set_font(Name(entry.pdf_name.as_bytes()), *size)
                .next_line(*x, *y)
                .show(Str(&bytes))
                .end_text();
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        } => {
            content.save_state();
            if let Some(fill) = fill {
                content.set_fill_rgb(fill.0, fill.1, fill.2);
            }
            if let Some(stroke) = stroke {
                set_stroke(content, stroke);
            }
            content.rect(*x, *y, *width, *height);
            match (fill.is_some(), stroke.is_some()) {
                (true, true) => content.fill_nonzero_and_stroke(),
                (true, false) => content.fill_nonzero(),
                (false, true) => content.stroke(),
                (false, false) => content.end_path(),
            };
            content.restore_state();
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        } => {
            content.save_state();
            set_stroke(content, stroke);
            content.move_to(*x1, *y1);
            content.line_to(*x2, *y2);
            content.stroke();
            content.restore_state();
        }
    }
    Ok(())
}

fn set_stroke(content: &mut Content, stroke: &Stroke) {
    content.set_line_width(stroke.width);
    content.set_stroke_rgb(stroke.color.0, stroke.color.1, stroke.color.2);
}

use crate::fonts::FontWeight;
use crate::format::{format_money, format_quantity};
use crate::model::LineItem;
use crate::theme::Geometry;

use super::compose::{ComposeContext, RenderedPage};
use super::layout::{fit_width, right_aligned_x, wrap};

pub(super) struct RowLayout {
    pub(super) lines: Vec<String>,
    pub(super) height: f32,
    pub(super) amount_cents: i64,
}

/// Wrap every description and derive each row's height: the base row height
/// plus one line height per wrapped line past the first.
pub(super) fn row_layouts(items: &[LineItem], geometry: &Geometry) -> Vec<RowLayout> {
    items
        .iter()
        .map(|item| {
            let lines = wrap(&item.description, geometry.description_chars);
            let height = geometry.row_height + (lines.len() - 1) as f32 * geometry.line_height;
            RowLayout {
                lines,
                height,
                amount_cents: item.amount_cents(),
            }
        })
        .collect()
}

pub(super) fn draw_header(page: &mut RenderedPage, ctx: ComposeContext<'_>, top: f32) {
    let g = &ctx.theme.geometry;
    let p = &ctx.theme.palette;
    let labels = &ctx.theme.labels;
    let fonts = ctx.fonts;
    let h = g.table_header_height;
    let baseline = top - 18.0;

    page.rect(
        g.margin - 5.0,
        top - h,
        g.page_width - 2.0 * g.margin + 10.0,
        h,
        Some(p.accent),
        None,
    );
    page.text(
        labels.description.as_str(),
        g.margin + g.cell_padding,
        baseline,
        11.0,
        FontWeight::Bold,
        p.on_accent,
    );
    for (label, anchor) in [
        (&labels.quantity, g.unit_price_x() - g.cell_padding),
        (&labels.unit_price, g.amount_x() - g.cell_padding),
        (&labels.amount, g.right()),
    ] {
        let x = right_aligned_x(fonts, FontWeight::Bold, label, 11.0, anchor);
        page.text(label.as_str(), x, baseline, 11.0, FontWeight::Bold, p.on_accent);
    }
}

pub(super) fn draw_row(
    page: &mut RenderedPage,
    ctx: ComposeContext<'_>,
    top: f32,
    index: usize,
    item: &LineItem,
    layout: &RowLayout,
) {
    let g = &ctx.theme.geometry;
    let p = &ctx.theme.palette;
    let money = &ctx.theme.money;
    let fonts = ctx.fonts;
    let baseline = top - 16.0;

    if index % 2 == 0 {
        page.rect(
            g.margin - 5.0,
            top - layout.height,
            g.page_width - 2.0 * g.margin + 10.0,
            layout.height,
            Some(p.tint),
            None,
        );
    }

    let text_x = g.margin + g.cell_padding;
    let text_w = g.qty_x() - text_x - 4.0;
    for (i, line) in layout.lines.iter().enumerate() {
        let line = fit_width(fonts, FontWeight::Regular, line, 10.0, text_w);
        page.text(
            line,
            text_x,
            baseline - i as f32 * g.line_height,
            10.0,
            FontWeight::Regular,
            p.text,
        );
    }

    let cells = [
        (
            format_quantity(item.quantity, money),
            g.unit_price_x() - g.cell_padding,
            FontWeight::Regular,
        ),
        (
            format_money((item.unit_price * 100.0).round() as i64, money),
            g.amount_x() - g.cell_padding,
            FontWeight::Regular,
        ),
        (
            format_money(layout.amount_cents, money),
            g.right(),
            FontWeight::Bold,
        ),
    ];
    for (text, anchor, weight) in cells {
        let x = right_aligned_x(fonts, weight, &text, 10.0, anchor);
        page.text(text, x, baseline, 10.0, weight, p.text);
    }
}

use crate::error::Error;
use crate::fonts::{FontBook, FontWeight};
use crate::format::{format_date, format_money};
use crate::model::{DocumentKind, DocumentRecord};
use crate::theme::{Issuer, Rgb, Theme};

use super::layout::{clamp_lines, fit_width, right_aligned_x, wrap};
use super::table::{self, RowLayout};

const ISSUER_ADDRESS_LINES: usize = 3;
const CLIENT_ADDRESS_LINES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f32,
}

/// One drawing instruction in PDF user space (origin bottom-left, y up).
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
        color: Rgb,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Stroke>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: Stroke,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedPage {
    pub ops: Vec<DrawOp>,
}

impl RenderedPage {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t == needle)
    }

    pub(super) fn text(
        &mut self,
        text: impl Into<String>,
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
        color: Rgb,
    ) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y,
            size,
            weight,
            color,
            text,
        });
    }

    pub(super) fn rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Stroke>,
    ) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        });
    }

    pub(super) fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: Stroke) {
        self.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        });
    }
}

/// Where a line item ended up.
#[derive(Clone, Debug, PartialEq)]
pub struct RowPlacement {
    pub item_index: usize,
    pub page_index: usize,
    pub top: f32,
    pub bottom: f32,
    pub lines: usize,
    pub amount_cents: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    /// Width and height in points, shared by every page.
    pub page_size: (f32, f32),
    pub pages: Vec<RenderedPage>,
    pub rows: Vec<RowPlacement>,
    pub total_cents: i64,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Everything shared by the drawing operations of one render.
#[derive(Clone, Copy)]
pub struct ComposeContext<'a> {
    pub theme: &'a Theme,
    pub issuer: &'a Issuer,
    pub fonts: &'a FontBook,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Start,
    HeaderDrawn,
    ClientBlockDrawn,
    TableHeaderDrawn,
    RowDrawn,
    TotalsDrawn,
    Finalized,
}

/// Lay out a resolved document into pages.
///
/// Input problems are reported before any page is allocated; a layout that
/// cannot be completed fails as a whole, never with partial pages.
pub fn compose(record: &DocumentRecord, ctx: ComposeContext<'_>) -> Result<Layout, Error> {
    record.validate()?;

    let geometry = &ctx.theme.geometry;
    let rows = table::row_layouts(record.line_items(), geometry);
    let usable = geometry.continuation_top() - geometry.table_header_height - geometry.safe_bottom;
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.height > usable) {
        return Err(Error::Render(format!(
            "line {} needs {:.0}pt, a page holds {:.0}pt",
            i + 1,
            row.height,
            usable
        )));
    }

    let mut composer = Composer::new(record, ctx);
    composer.draw_header()?;
    composer.draw_client_block()?;
    composer.draw_table_header()?;
    for (index, row) in rows.iter().enumerate() {
        composer.draw_row(index, row)?;
    }
    composer.draw_totals()?;
    composer.finalize()
}

struct Composer<'a> {
    ctx: ComposeContext<'a>,
    record: &'a DocumentRecord,
    pages: Vec<RenderedPage>,
    page: RenderedPage,
    cursor_y: f32,
    stage: Stage,
    rows: Vec<RowPlacement>,
    total_cents: i64,
}

impl<'a> Composer<'a> {
    fn new(record: &'a DocumentRecord, ctx: ComposeContext<'a>) -> Self {
        let geometry = &ctx.theme.geometry;
        Composer {
            ctx,
            record,
            pages: Vec::new(),
            page: RenderedPage::default(),
            cursor_y: geometry.page_height - geometry.margin,
            stage: Stage::Start,
            rows: Vec::new(),
            total_cents: record.total_cents(),
        }
    }

    fn advance(&mut self, from: &[Stage], to: Stage) -> Result<(), Error> {
        if !from.contains(&self.stage) {
            return Err(Error::Render(format!(
                "cannot move from {:?} to {:?}",
                self.stage, to
            )));
        }
        self.stage = to;
        Ok(())
    }

    fn draw_header(&mut self) -> Result<(), Error> {
        self.advance(&[Stage::Start], Stage::HeaderDrawn)?;
        let ComposeContext {
            theme,
            issuer,
            fonts,
        } = self.ctx;
        let g = &theme.geometry;
        let p = &theme.palette;
        let labels = &theme.labels;
        let doc = &self.record.document;
        let (w, h, m) = (g.page_width, g.page_height, g.margin);

        self.page
            .rect(0.0, h - g.header_height, w, g.header_height, Some(p.accent), None);

        let badge_w = 260.0;
        let badge_h = 56.0;
        let badge_x = w - m - badge_w;
        let badge_y = h - 32.0 - badge_h;

        let brand = fit_width(fonts, FontWeight::Bold, &issuer.brand, 32.0, badge_x - m - 12.0);
        self.page
            .text(brand, m, h - 50.0, 32.0, FontWeight::Bold, p.on_accent);

        self.page
            .rect(badge_x, badge_y, badge_w, badge_h, Some(p.on_accent), None);
        self.page.text(
            doc.kind.label(),
            badge_x + 15.0,
            badge_y + 34.0,
            10.0,
            FontWeight::Bold,
            p.muted,
        );
        let number = fit_width(
            fonts,
            FontWeight::Bold,
            &format!("{} {}", labels.number_prefix, doc.number),
            16.0,
            badge_w - 30.0,
        );
        self.page.text(
            number,
            badge_x + 15.0,
            badge_y + 16.0,
            16.0,
            FontWeight::Bold,
            p.text,
        );

        // Issuer block: three columns, 180pt apart.
        let mut y = h - g.header_height - 20.0;
        let col_w = 170.0;
        let columns = [m, m + 180.0, m + 360.0];
        for (x, label) in columns
            .iter()
            .zip([&labels.company, &labels.address, &labels.tax_id])
        {
            self.page.text(label.as_str(), *x, y, 9.0, FontWeight::Bold, p.muted);
        }
        y -= 14.0;
        let name = fit_width(fonts, FontWeight::Regular, &issuer.name, 10.0, col_w);
        self.page
            .text(name, columns[0], y, 10.0, FontWeight::Regular, p.text);
        let address_lines = clamp_lines(wrap(&issuer.address, 34), ISSUER_ADDRESS_LINES);
        for (i, line) in address_lines.iter().enumerate() {
            let line = fit_width(fonts, FontWeight::Regular, line, 10.0, col_w);
            self.page.text(
                line,
                columns[1],
                y - i as f32 * 12.0,
                10.0,
                FontWeight::Regular,
                p.text,
            );
        }
        let tax_id = fit_width(fonts, FontWeight::Regular, &issuer.tax_id, 10.0, w - m - columns[2]);
        self.page
            .text(tax_id, columns[2], y, 10.0, FontWeight::Regular, p.text);
        y -= (address_lines.len().max(1) - 1) as f32 * 12.0 + 24.0;

        let date = format!("{} {}", labels.date, format_date(doc.date));
        let x = right_aligned_x(fonts, FontWeight::Regular, &date, 10.0, g.right());
        self.page.text(date, x, y, 10.0, FontWeight::Regular, p.muted);
        self.page.line(
            m,
            y - 12.0,
            g.right(),
            y - 12.0,
            Stroke {
                color: p.rule,
                width: 1.0,
            },
        );

        self.cursor_y = y - 30.0;
        Ok(())
    }

    fn draw_client_block(&mut self) -> Result<(), Error> {
        self.advance(&[Stage::HeaderDrawn], Stage::ClientBlockDrawn)?;
        let ComposeContext { theme, fonts, .. } = self.ctx;
        let g = &theme.geometry;
        let p = &theme.palette;
        let client = &self.record.client;
        let (w, m) = (g.page_width, g.margin);
        let top = self.cursor_y;
        let box_w = w - 2.0 * m;

        let address = clamp_lines(wrap(&client.address, g.address_chars), CLIENT_ADDRESS_LINES);
        let box_h = (66.0 + (address.len() - 1) as f32 * 14.0).max(g.client_box_height);

        self.page.rect(
            m,
            top - box_h,
            box_w,
            box_h,
            Some(p.tint),
            Some(Stroke {
                color: p.highlight,
                width: 1.5,
            }),
        );

        let title = match self.record.document.kind {
            DocumentKind::Invoice => &theme.labels.invoice_recipient,
            DocumentKind::Quote => &theme.labels.quote_recipient,
        };
        self.page
            .text(title.as_str(), m + 15.0, top - 16.0, 10.0, FontWeight::Bold, p.highlight);

        let name = fit_width(fonts, FontWeight::Bold, &client.name, 14.0, box_w / 2.0);
        self.page
            .text(name, m + 15.0, top - 34.0, 14.0, FontWeight::Bold, p.text);

        for (i, line) in address.iter().enumerate() {
            let line = fit_width(fonts, FontWeight::Regular, line, 10.0, box_w - 30.0);
            self.page.text(
                line,
                m + 15.0,
                top - 50.0 - i as f32 * 14.0,
                10.0,
                FontWeight::Regular,
                p.muted,
            );
        }

        let contacts = [
            client.email.clone(),
            client.phone.clone(),
            client
                .tax_id
                .as_ref()
                .map(|id| format!("{} {id}", theme.labels.tax_id)),
        ];
        let anchor = m + box_w - 15.0;
        for (i, contact) in contacts.iter().flatten().enumerate() {
            let contact = fit_width(fonts, FontWeight::Regular, contact, 9.0, box_w / 2.0 - 30.0);
            let x = right_aligned_x(fonts, FontWeight::Regular, &contact, 9.0, anchor);
            self.page.text(
                contact,
                x,
                top - 16.0 - i as f32 * 14.0,
                9.0,
                FontWeight::Regular,
                p.muted,
            );
        }

        self.cursor_y = top - box_h - 24.0;
        Ok(())
    }

    fn draw_table_header(&mut self) -> Result<(), Error> {
        self.advance(&[Stage::ClientBlockDrawn], Stage::TableHeaderDrawn)?;
        self.table_header();
        Ok(())
    }

    fn table_header(&mut self) {
        let top = self.cursor_y;
        table::draw_header(&mut self.page, self.ctx, top);
        self.cursor_y = top - self.ctx.theme.geometry.table_header_height;
    }

    fn draw_row(&mut self, index: usize, row: &RowLayout) -> Result<(), Error> {
        self.advance(&[Stage::TableHeaderDrawn, Stage::RowDrawn], Stage::RowDrawn)?;
        let safe_bottom = self.ctx.theme.geometry.safe_bottom;

        if self.cursor_y - row.height < safe_bottom {
            log::debug!(
                "page break before line {} (cursor={:.1}, row_h={:.1})",
                index + 1,
                self.cursor_y,
                row.height
            );
            self.break_page();
            self.table_header();
            if self.cursor_y - row.height < safe_bottom {
                return Err(Error::Render(format!(
                    "line {} does not fit on a fresh page",
                    index + 1
                )));
            }
        }

        let top = self.cursor_y;
        let item = &self.record.line_items()[index];
        table::draw_row(&mut self.page, self.ctx, top, index, item, row);
        self.rows.push(RowPlacement {
            item_index: index,
            page_index: self.pages.len(),
            top,
            bottom: top - row.height,
            lines: row.lines.len(),
            amount_cents: row.amount_cents,
        });
        self.cursor_y = top - row.height;
        Ok(())
    }

    fn draw_totals(&mut self) -> Result<(), Error> {
        self.advance(&[Stage::TableHeaderDrawn, Stage::RowDrawn], Stage::TotalsDrawn)?;
        let ComposeContext { theme, fonts, .. } = self.ctx;
        let g = &theme.geometry;
        let p = &theme.palette;

        if self.cursor_y - g.totals_gap - g.totals_height < g.safe_bottom {
            log::debug!("page break before totals (cursor={:.1})", self.cursor_y);
            self.break_page();
        } else {
            self.cursor_y -= g.totals_gap;
        }

        let box_x = g.right() - g.totals_width;
        let box_y = self.cursor_y - g.totals_height;
        self.page
            .rect(box_x, box_y, g.totals_width, g.totals_height, Some(p.accent), None);
        self.page.text(
            theme.labels.total.as_str(),
            box_x + 20.0,
            box_y + 44.0,
            12.0,
            FontWeight::Bold,
            p.on_accent,
        );
        let total = format_money(self.total_cents, &theme.money);
        let anchor = box_x + g.totals_width - 20.0;
        let x = right_aligned_x(fonts, FontWeight::Bold, &total, 20.0, anchor);
        self.page
            .text(total, x, box_y + 20.0, 20.0, FontWeight::Bold, p.on_accent);

        if let Some(note) = &theme.legal_note {
            let note = fit_width(fonts, FontWeight::Regular, note, 9.0, box_x - g.margin - 10.0);
            self.page
                .text(note, g.margin, box_y + 28.0, 9.0, FontWeight::Regular, p.muted);
        }

        self.cursor_y = box_y;
        Ok(())
    }

    fn finalize(mut self) -> Result<Layout, Error> {
        self.advance(&[Stage::TotalsDrawn], Stage::Finalized)?;
        self.draw_closing_details();
        self.close_page();

        // Second pass: the page count is known, stamp every page.
        let ComposeContext { theme, fonts, .. } = self.ctx;
        let pages = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = theme.labels.page_label(i + 1, pages);
            let x = right_aligned_x(fonts, FontWeight::Regular, &label, 9.0, theme.geometry.right());
            page.text(label, x, 56.0, 9.0, FontWeight::Regular, theme.palette.muted);
        }

        log::debug!(
            "composed {} {} on {} page(s), {} row(s)",
            self.record.document.kind,
            self.record.document.number,
            pages,
            self.rows.len()
        );

        Ok(Layout {
            page_size: (theme.geometry.page_width, theme.geometry.page_height),
            pages: self.pages,
            rows: self.rows,
            total_cents: self.total_cents,
        })
    }

    /// Payment details for invoices, validity note for quotes. Last page only.
    fn draw_closing_details(&mut self) {
        let ComposeContext { theme, issuer, .. } = self.ctx;
        let labels = &theme.labels;
        let p = &theme.palette;
        let m = theme.geometry.margin;

        match self.record.document.kind {
            DocumentKind::Invoice => match &issuer.iban {
                Some(iban) => {
                    self.page
                        .text(labels.bank_details.as_str(), m, 56.0, 9.0, FontWeight::Bold, p.accent);
                    self.page.text(
                        format!("{} {iban}", labels.iban),
                        m,
                        40.0,
                        10.0,
                        FontWeight::Regular,
                        p.text,
                    );
                    if let Some(holder) = &issuer.account_holder {
                        self.page.text(
                            format!("{} {holder}", labels.account_holder),
                            m,
                            24.0,
                            10.0,
                            FontWeight::Regular,
                            p.muted,
                        );
                    }
                }
                None => {
                    self.page
                        .text(labels.payment_note.as_str(), m, 40.0, 10.0, FontWeight::Regular, p.muted);
                }
            },
            DocumentKind::Quote => {
                self.page.text(
                    labels.validity_note(theme.quote_validity_days),
                    m,
                    40.0,
                    10.0,
                    FontWeight::Regular,
                    p.muted,
                );
            }
        }
    }

    fn break_page(&mut self) {
        self.close_page();
        self.open_continuation_page();
    }

    /// Footer band and brand, then move the page to the finished list.
    fn close_page(&mut self) {
        let ComposeContext {
            theme,
            issuer,
            fonts,
        } = self.ctx;
        let g = &theme.geometry;
        let p = &theme.palette;

        // The band goes underneath whatever the page already holds in that area.
        self.page.ops.insert(
            0,
            DrawOp::Rect {
                x: 0.0,
                y: 0.0,
                width: g.page_width,
                height: g.footer_height,
                fill: Some(p.tint),
                stroke: None,
            },
        );
        let brand = fit_width(fonts, FontWeight::Bold, &issuer.brand, 10.0, 200.0);
        let x = right_aligned_x(fonts, FontWeight::Bold, &brand, 10.0, g.right());
        self.page
            .text(brand, x, 24.0, 10.0, FontWeight::Bold, p.muted);

        self.pages.push(std::mem::take(&mut self.page));
    }

    /// Compact header band carrying brand and number, cursor right below it.
    fn open_continuation_page(&mut self) {
        let ComposeContext {
            theme,
            issuer,
            fonts,
        } = self.ctx;
        let g = &theme.geometry;
        let p = &theme.palette;
        let doc = &self.record.document;
        let h = g.page_height;

        self.page.rect(
            0.0,
            h - g.continuation_header_height,
            g.page_width,
            g.continuation_header_height,
            Some(p.accent),
            None,
        );
        let brand = fit_width(fonts, FontWeight::Bold, &issuer.brand, 16.0, 250.0);
        self.page
            .text(brand, g.margin, h - 32.0, 16.0, FontWeight::Bold, p.on_accent);
        let reference = format!(
            "{} {} {} {}",
            doc.kind.label(),
            theme.labels.number_prefix,
            doc.number,
            theme.labels.continued
        );
        let x = right_aligned_x(fonts, FontWeight::Bold, &reference, 10.0, g.right());
        self.page
            .text(reference, x, h - 30.0, 10.0, FontWeight::Bold, p.on_accent);

        self.cursor_y = g.continuation_top();
    }
}

mod common;

use facture_pdf::pdf::{DrawOp, compose};
use facture_pdf::{
    DocumentKind, Error, FontBook, FontSet, FontWeight, Layout, LineItem, format_money, wrap,
};

use common::{Fixture, record};

fn layout_for(items: Vec<LineItem>) -> Layout {
    let fixture = Fixture::new();
    compose(&record(DocumentKind::Invoice, "2025-10-001", items), fixture.ctx()).unwrap()
}

#[test]
fn one_row_per_single_line_item() {
    for n in [0, 1, 5, 12] {
        let layout = layout_for(common::items(n));
        assert_eq!(layout.rows.len(), n);
        assert!(layout.rows.iter().all(|r| r.lines == 1));
        let drawn: i64 = layout.rows.iter().map(|r| r.amount_cents).sum();
        assert_eq!(drawn, layout.total_cents);
        assert_eq!(layout.page_count(), 1, "{n} items should fit one page");
    }
}

#[test]
fn displayed_total_is_recomputed() {
    let fixture = Fixture::new();
    let mut rec = record(DocumentKind::Invoice, "2025-10-001", common::items(3));
    rec.document.total_amount = 999_999.0;
    let layout = compose(&rec, fixture.ctx()).unwrap();

    // 10.00 + 11.00 + 12.00
    assert_eq!(layout.total_cents, 3300);
    let last = layout.pages.last().unwrap();
    assert!(last.contains_text(&format_money(3300, &fixture.theme.money)));
    assert!(!last.contains_text("999\u{a0}999,00\u{a0}€"));
}

#[test]
fn long_tables_flow_onto_more_pages() {
    common::init_logging();
    let fixture = Fixture::new();
    let layout = layout_for(common::items(60));
    let g = &fixture.theme.geometry;

    assert!(layout.page_count() > 1);
    assert_eq!(layout.rows.len(), 60);

    for (i, row) in layout.rows.iter().enumerate() {
        assert_eq!(row.item_index, i);
        assert!(row.bottom >= g.safe_bottom, "row {i} crosses the safe bottom");
        assert!(row.top <= g.page_height);
        assert!((row.top - row.bottom - g.row_height).abs() < 0.01);
    }
    // Rows only ever move forward a page at a time.
    for pair in layout.rows.windows(2) {
        let step = pair[1].page_index - pair[0].page_index;
        assert!(step <= 1);
        if step == 0 {
            assert!((pair[1].top - pair[0].bottom).abs() < 0.01);
        }
    }

    let drawn: i64 = layout.rows.iter().map(|r| r.amount_cents).sum();
    assert_eq!(drawn, layout.total_cents);
}

#[test]
fn continuation_pages_repeat_the_table_header() {
    let fixture = Fixture::new();
    let layout = layout_for(common::items(60));
    let labels = &fixture.theme.labels;

    for (i, page) in layout.pages.iter().enumerate().skip(1) {
        assert!(
            page.contains_text("FACTURE N° 2025-10-001 (suite)"),
            "page {} lacks the continuation header",
            i + 1
        );
        if layout.rows.iter().any(|r| r.page_index == i) {
            assert!(page.contains_text(&labels.description));
        }
    }
    assert!(!layout.pages[0].contains_text("FACTURE N° 2025-10-001 (suite)"));
}

#[test]
fn every_page_is_labelled_with_the_final_count() {
    let layout = layout_for(common::items(80));
    let n = layout.page_count();
    assert!(n >= 3);

    for (i, page) in layout.pages.iter().enumerate() {
        let labels: Vec<&str> = page.texts().filter(|t| t.starts_with("Page ")).collect();
        assert_eq!(labels, vec![format!("Page {} / {n}", i + 1)]);
    }
}

#[test]
fn wrapped_rows_grow_and_are_never_split() {
    let fixture = Fixture::new();
    let g = &fixture.theme.geometry;
    let long = "Accompagnement à la mise en production de l'application de facturation, \
                reprise des données clients et formation des équipes comptables sur site";
    let expected_lines = wrap(long, g.description_chars).len();
    assert!(expected_lines > 1);

    let items: Vec<LineItem> = (0..30).map(|_| LineItem::new(long, 1.0, 450.0)).collect();
    let layout = layout_for(items);

    assert!(layout.page_count() > 1);
    for row in &layout.rows {
        assert_eq!(row.lines, expected_lines);
        let height = g.row_height + (expected_lines - 1) as f32 * g.line_height;
        assert!((row.top - row.bottom - height).abs() < 0.01);
        assert!(row.bottom >= g.safe_bottom);
    }
}

#[test]
fn even_rows_are_tinted() {
    let fixture = Fixture::new();
    let layout = layout_for(common::items(6));
    let tint = fixture.theme.palette.tint;
    let page = &layout.pages[0];

    for row in &layout.rows {
        let tinted = page.ops.iter().any(|op| {
            matches!(op, DrawOp::Rect { y, height, fill: Some(fill), .. }
                if (*y - row.bottom).abs() < 0.01
                    && (*height - (row.top - row.bottom)).abs() < 0.01
                    && *fill == tint)
        });
        assert_eq!(tinted, row.item_index % 2 == 0, "row {}", row.item_index);
    }
}

#[test]
fn totals_block_is_right_aligned_and_inverted() {
    let fixture = Fixture::new();
    let layout = layout_for(common::items(3));
    let g = &fixture.theme.geometry;
    let accent = fixture.theme.palette.accent;

    let found = layout.pages[0].ops.iter().any(|op| {
        matches!(op, DrawOp::Rect { x, width, height, fill: Some(fill), .. }
            if (*x + *width - g.right()).abs() < 0.01
                && (*width - g.totals_width).abs() < 0.01
                && (*height - g.totals_height).abs() < 0.01
                && *fill == accent)
    });
    assert!(found, "no totals block");
    assert!(layout.pages[0].contains_text("TOTAL HT"));
}

#[test]
fn totals_move_to_a_new_page_when_needed() {
    let fixture = Fixture::new();
    let g = &fixture.theme.geometry;
    for n in 10..60 {
        let layout = layout_for(common::items(n));
        let last_row_page = layout.rows.last().map(|r| r.page_index).unwrap_or(0);
        let totals_page = layout
            .pages
            .iter()
            .position(|p| p.contains_text("TOTAL HT"))
            .unwrap();
        assert_eq!(totals_page, layout.page_count() - 1);
        assert!(totals_page == last_row_page || totals_page == last_row_page + 1);

        for op in &layout.pages[totals_page].ops {
            if let DrawOp::Rect { y, width, .. } = op
                && (*width - g.totals_width).abs() < 0.01
            {
                assert!(*y >= g.safe_bottom, "{n} items: totals below the safe bottom");
            }
        }
    }
}

#[test]
fn quote_footer_shows_validity() {
    let fixture = Fixture::new();
    let rec = record(DocumentKind::Quote, "D-2025-0001", common::items(2));
    let layout = compose(&rec, fixture.ctx()).unwrap();
    let page = &layout.pages[0];

    assert!(page.contains_text("DEVIS"));
    assert!(page.contains_text("DESTINATAIRE DU DEVIS"));
    assert!(page.contains_text("Devis valable 30 jours."));
    assert!(!page.contains_text("FACTURÉ À"));
}

#[test]
fn invoice_footer_shows_bank_details_when_configured() {
    let mut fixture = Fixture::new();
    let rec = record(DocumentKind::Invoice, "2025-10-001", common::items(2));

    let layout = compose(&rec, fixture.ctx()).unwrap();
    assert!(layout.pages[0].contains_text("FACTURÉ À"));
    assert!(layout.pages[0].contains_text("Paiement à réception de facture."));

    fixture.issuer.iban = Some("FR76 3000 6000 0112 3456 7890 189".to_string());
    fixture.issuer.account_holder = Some("Votre entreprise".to_string());
    let layout = compose(&rec, fixture.ctx()).unwrap();
    let page = &layout.pages[0];
    assert!(page.contains_text("INFORMATIONS BANCAIRES"));
    assert!(page.contains_text("IBAN : FR76 3000 6000 0112 3456 7890 189"));
    assert!(page.contains_text("Titulaire : Votre entreprise"));
}

#[test]
fn closing_details_only_on_last_page() {
    let layout = layout_for(common::items(60));
    let note = "Paiement à réception de facture.";
    let pages_with_note: Vec<usize> = layout
        .pages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.contains_text(note))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(pages_with_note, vec![layout.page_count() - 1]);
}

#[test]
fn bad_stored_items_fail_before_layout() {
    let fixture = Fixture::new();
    for bad in [
        LineItem::new("x", -1.0, 10.0),
        LineItem::new("x", 1.0, -0.01),
        LineItem::new("x", f64::NAN, 10.0),
        LineItem::new("x", 1.0, f64::INFINITY),
    ] {
        let rec = record(DocumentKind::Invoice, "2025-10-001", vec![bad]);
        let err = compose(&rec, fixture.ctx()).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)), "{err:?}");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "internal server error");
    }
}

#[test]
fn mismatched_client_is_rejected() {
    let fixture = Fixture::new();
    let mut rec = record(DocumentKind::Invoice, "2025-10-001", common::items(1));
    rec.client.id = "someone-else".to_string();
    assert!(matches!(compose(&rec, fixture.ctx()), Err(Error::Upstream(_))));

    rec.client.id = "c-1".to_string();
    rec.document.number = "  ".to_string();
    assert!(matches!(compose(&rec, fixture.ctx()), Err(Error::Upstream(_))));
}

#[test]
fn row_taller_than_a_page_is_a_render_failure() {
    let fixture = Fixture::new();
    let description = vec!["mot"; 1000].join(" ");
    let rec = record(
        DocumentKind::Invoice,
        "2025-10-001",
        vec![LineItem::new(description, 1.0, 1.0)],
    );
    let err = compose(&rec, fixture.ctx()).unwrap_err();
    assert!(matches!(err, Error::Render(_)), "{err:?}");
    assert_eq!(err.status_code(), 500);
}

#[test]
fn composition_is_deterministic() {
    let fixture = Fixture::new();
    let rec = record(DocumentKind::Invoice, "2025-10-001", common::items(40));
    assert_eq!(
        compose(&rec, fixture.ctx()).unwrap(),
        compose(&rec, fixture.ctx()).unwrap()
    );
}

#[test]
fn missing_font_files_fall_back_to_helvetica() {
    let set = FontSet {
        regular: Some("tests/fixtures/does-not-exist.ttf".into()),
        bold: None,
    };
    let fonts = FontBook::load(&set);
    assert!(!fonts.is_embedded(FontWeight::Regular));
    assert!(!fonts.is_embedded(FontWeight::Bold));
    assert!(fonts.text_width(FontWeight::Regular, "Service A", 10.0) > 0.0);

    let mut fixture = Fixture::new();
    fixture.fonts = fonts;
    let layout = compose(&common::acme_invoice(), fixture.ctx()).unwrap();
    assert_eq!(layout.rows.len(), 1);
}

#[test]
fn long_client_address_keeps_every_line() {
    let fixture = Fixture::new();
    let mut rec = record(DocumentKind::Invoice, "2025-10-001", common::items(3));
    rec.client.address = "Zone d'activités des Trois Moulins, Bâtiment C, escalier 4, \
        troisième étage, porte gauche, 12 avenue de la République prolongée, \
        75011 Paris Cedex, FRANCE"
        .to_string();
    let layout = compose(&rec, fixture.ctx()).unwrap();
    let g = &fixture.theme.geometry;

    let expected = wrap(&rec.client.address, g.address_chars);
    assert!(expected.len() > 2);
    let page = &layout.pages[0];
    for line in &expected {
        assert!(page.contains_text(line), "missing address line {line:?}");
    }
    assert!(page.texts().any(|t| t.contains("75011")));

    // The client box grows, and the table starts below it.
    let box_width = g.page_width - 2.0 * g.margin;
    let box_bottom = page
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Rect {
                y, width, height, ..
            } if *width == box_width && *height > g.client_box_height => Some(*y),
            _ => None,
        })
        .next()
        .expect("taller client box");
    assert!(layout.rows.iter().all(|r| r.top < box_bottom));
}

#[test]
fn overlong_address_is_cut_with_an_ellipsis() {
    let fixture = Fixture::new();
    let mut rec = record(DocumentKind::Invoice, "2025-10-001", common::items(1));
    rec.client.address = vec!["Résidence des Tilleuls"; 40].join(", ");
    let layout = compose(&rec, fixture.ctx()).unwrap();
    assert!(layout.pages[0].texts().any(|t| t.ends_with('…')));
    assert_eq!(layout.page_count(), 1);
}

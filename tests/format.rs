use facture_pdf::{MoneyFormat, format_date, format_money, format_quantity};

mod common;

#[test]
fn money_uses_french_convention() {
    let fmt = MoneyFormat::default();
    assert_eq!(format_money(20000, &fmt), "200,00\u{a0}€");
    assert_eq!(format_money(0, &fmt), "0,00\u{a0}€");
    assert_eq!(format_money(5, &fmt), "0,05\u{a0}€");
    assert_eq!(format_money(123456, &fmt), "1\u{a0}234,56\u{a0}€");
    assert_eq!(format_money(100000000, &fmt), "1\u{a0}000\u{a0}000,00\u{a0}€");
    assert_eq!(format_money(-1250, &fmt), "-12,50\u{a0}€");
}

#[test]
fn money_format_is_configurable() {
    let fmt = MoneyFormat {
        thousands_separator: ',',
        decimal_separator: '.',
        currency_suffix: String::new(),
    };
    assert_eq!(format_money(123456, &fmt), "1,234.56");
}

#[test]
fn quantities() {
    let fmt = MoneyFormat::default();
    assert_eq!(format_quantity(2.0, &fmt), "2");
    assert_eq!(format_quantity(1.5, &fmt), "1,5");
    assert_eq!(format_quantity(0.25, &fmt), "0,25");
    assert_eq!(format_quantity(1200.0, &fmt), "1\u{a0}200");
}

#[test]
fn dates_print_day_first() {
    assert_eq!(format_date(common::date(2025, 3, 7)), "07/03/2025");
}

#[test]
fn line_amounts_round_on_decimal_values() {
    use facture_pdf::LineItem;

    // Binary floats put these just under the half cent.
    assert_eq!(LineItem::new("x", 1.0, 1.005).amount_cents(), 101);
    assert_eq!(LineItem::new("x", 1.0, 0.285).amount_cents(), 29);
    assert_eq!(LineItem::new("x", 3.0, 33.335).amount_cents(), 10001);

    assert_eq!(LineItem::new("x", 2.5, 120.0).amount_cents(), 30000);
    assert_eq!(LineItem::new("x", 0.1, 3.0).amount_cents(), 30);
    assert_eq!(LineItem::new("x", 0.0, 99.99).amount_cents(), 0);
    assert_eq!(LineItem::new("x", 1200.0, 1499.99).amount_cents(), 179_998_800);
}

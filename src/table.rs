use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use core_types::{BulkItemResult, Product};
use editor::format_number;
use rust_decimal::Decimal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn number(value: Decimal) -> Cell {
    Cell::new(format_number(value)).set_alignment(CellAlignment::Right)
}

/// The price list grid; the selected row gets an arrow in the first column.
pub fn products(products: &[Product], selected: Option<i32>) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "",
        "ID",
        "Article No.",
        "Product/Service",
        "In Price",
        "Price",
        "Unit",
        "In Stock",
        "Description",
    ]);
    for product in products {
        let marker = if selected == Some(product.id) { "▶" } else { "" };
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(product.id),
            Cell::new(&product.article_no),
            Cell::new(&product.product_service),
            number(product.in_price),
            number(product.price),
            Cell::new(&product.unit),
            number(Decimal::from(product.in_stock)),
            Cell::new(product.description.as_deref().unwrap_or_default()),
        ]);
    }
    table
}

/// One product as a field/value listing, timestamps included.
pub fn details(product: &Product) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    let rows = [
        ("ID", product.id.to_string()),
        ("Article No.", product.article_no.clone()),
        ("Product/Service", product.product_service.clone()),
        ("In Price", product.in_price.to_string()),
        ("Price", product.price.to_string()),
        ("Unit", product.unit.clone()),
        ("In Stock", product.in_stock.to_string()),
        ("Description", product.description.clone().unwrap_or_default()),
        ("Created", product.created_at.format(TIMESTAMP_FORMAT).to_string()),
        ("Updated", product.updated_at.format(TIMESTAMP_FORMAT).to_string()),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }
    table
}

pub fn bulk_results(results: &[BulkItemResult]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["ID", "Result", "Error"]);
    for result in results {
        let id = result.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        let status = if result.success { "updated" } else { "failed" };
        table.add_row(vec![
            id,
            status.to_string(),
            result.error.clone().unwrap_or_default(),
        ]);
    }
    table
}

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction};

use crate::db::market;
use crate::models::invoice::round_money;
use crate::models::{Invoice, SavedInvoice, StoredInvoice};
use crate::services::reports::invoice::render_invoice;
use crate::services::storage;

const CSV_HEADER: [&str; 5] = ["UPC", "PRODUCT", "PRICE", "QTY", "TOTAL"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `factura_42_20250310143000`
pub fn invoice_stem(factura_id: i64, at: NaiveDateTime) -> String {
    format!("factura_{factura_id}_{}", at.format("%Y%m%d%H%M%S"))
}

/// `Factura_42_20250310_143000.csv`
pub fn invoice_csv_filename(factura_id: i64, at: NaiveDateTime) -> String {
    format!("Factura_{factura_id}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

fn commit_with_pdf(tx: Transaction<'_>, factura_id: i64, pdf_url: &str) -> anyhow::Result<()> {
    market::set_invoice_pdf_path(&tx, factura_id, pdf_url)?;
    tx.commit()?;
    Ok(())
}

/// Stores the invoice, its lines and its receipt PDF. The rows are committed
/// only after the PDF has been written, and the PDF is removed again when
/// the commit fails.
pub fn save_invoice(
    conn: &mut Connection,
    pdf_dir: &Path,
    invoice: &Invoice,
    now: NaiveDateTime,
) -> anyhow::Result<SavedInvoice> {
    let tx = conn.transaction()?;

    let factura_id = market::insert_invoice(&tx, invoice)?;

    let bytes = render_invoice(factura_id, invoice);
    let (filename, path) = storage::write_unique_pdf(pdf_dir, &invoice_stem(factura_id, now), &bytes)?;

    let pdf_url = storage::public_path(&filename);
    if let Err(e) = commit_with_pdf(tx, factura_id, &pdf_url) {
        storage::discard_pdf(&path);
        return Err(e);
    }

    tracing::info!(factura_id, cliente = %invoice.cliente, total = %invoice.total, "invoice saved");

    Ok(SavedInvoice {
        success: true,
        factura_id,
        pdf_url,
        mensaje: "Factura guardada exitosamente".to_string(),
    })
}

/// Renders a stored invoice again and points its record at the new file.
/// `None` when the invoice does not exist.
pub fn reexport_pdf(
    conn: &Connection,
    pdf_dir: &Path,
    factura_id: i64,
    now: NaiveDateTime,
) -> anyhow::Result<Option<SavedInvoice>> {
    let Some(stored) = market::get_invoice(conn, factura_id)? else {
        return Ok(None);
    };

    let bytes = render_invoice(factura_id, &stored.invoice);
    let (filename, path) = storage::write_unique_pdf(pdf_dir, &invoice_stem(factura_id, now), &bytes)?;

    let pdf_url = storage::public_path(&filename);
    if let Err(e) = market::set_invoice_pdf_path(conn, factura_id, &pdf_url) {
        storage::discard_pdf(&path);
        return Err(e);
    }

    tracing::info!(factura_id, pdf = %pdf_url, "invoice pdf re-exported");

    Ok(Some(SavedInvoice {
        success: true,
        factura_id,
        pdf_url,
        mensaje: "Factura exportada a PDF".to_string(),
    }))
}

fn dollars(amount: rust_decimal::Decimal) -> String {
    format!("${:.2}", round_money(amount))
}

/// UTF-8 (with BOM) spreadsheet of the invoice lines followed by the
/// subtotal, credit and total rows.
pub fn invoice_csv(stored: &StoredInvoice) -> anyhow::Result<Vec<u8>> {
    let invoice = &stored.invoice;
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());

    wtr.write_record(CSV_HEADER)?;
    for line in &invoice.lines {
        wtr.write_record([
            line.upc.clone(),
            line.descripcion.clone(),
            dollars(line.precio),
            line.cantidad.normalize().to_string(),
            dollars(line.total),
        ])?;
    }
    let credit = format!("-{}", dollars(invoice.creditos));
    for (label, amount) in [
        ("SUBTOTAL:", dollars(invoice.subtotal)),
        ("CRÉDITO:", credit),
        ("TOTAL:", dollars(invoice.total)),
    ] {
        wtr.write_record(["", "", "", label, amount.as_str()])?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush invoice csv: {}", e.error()))
}

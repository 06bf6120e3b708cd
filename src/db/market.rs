use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::models::{Invoice, InvoiceLine, InvoiceSummary, Product, StoredInvoice};

pub const AUTOCOMPLETE_LIMIT: i64 = 10;
pub const INVOICE_LIST_LIMIT: i64 = 50;

fn parse_product_row(row: &rusqlite::Row) -> rusqlite::Result<(i64, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_product((id, upc, producto, precio, unidad): (i64, String, String, String, String)) -> anyhow::Result<Product> {
    Ok(Product {
        id,
        upc,
        producto,
        precio: Decimal::from_str(&precio)?,
        unidad,
    })
}

// ── Products ──

pub fn find_product_by_upc(conn: &Connection, upc: &str) -> anyhow::Result<Option<Product>> {
    let row = conn
        .query_row(
            "SELECT id, upc, producto, precio, unidad FROM productos WHERE upc = ?1 LIMIT 1",
            params![upc],
            parse_product_row,
        )
        .optional()?;

    row.map(into_product).transpose()
}

/// Products whose UPC starts with `prefix`, at most [`AUTOCOMPLETE_LIMIT`].
pub fn search_products_by_upc_prefix(conn: &Connection, prefix: &str) -> anyhow::Result<Vec<Product>> {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let mut stmt = conn.prepare(
        "SELECT id, upc, producto, precio, unidad FROM productos
         WHERE upc LIKE ?1 ESCAPE '\\' ORDER BY upc LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![format!("{escaped}%"), AUTOCOMPLETE_LIMIT], parse_product_row)?;

    let mut products = vec![];
    for row in rows {
        products.push(into_product(row?)?);
    }
    Ok(products)
}

pub fn insert_product(conn: &Connection, upc: &str, producto: &str, precio: Decimal, unidad: &str) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO productos (upc, producto, precio, unidad) VALUES (?1, ?2, ?3, ?4)",
        params![upc, producto, precio.to_string(), unidad],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a catalogue product or, when the UPC exists, refreshes its price.
pub fn upsert_product(conn: &Connection, upc: &str, producto: &str, precio: Decimal) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO productos (upc, producto, precio) VALUES (?1, ?2, ?3)
         ON CONFLICT(upc) DO UPDATE SET precio = excluded.precio",
        params![upc, producto, precio.to_string()],
    )?;
    Ok(())
}

// ── Invoices ──

/// Inserts the invoice header and its lines. Lines with a UPC are linked to
/// the catalogue, creating the product (unit `PZA`) when it is unknown.
///
/// Callers run this inside a transaction.
pub fn insert_invoice(conn: &Connection, invoice: &Invoice) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO facturas (fecha, cliente, subtotal, creditos, total) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            invoice.fecha.format("%Y-%m-%d").to_string(),
            invoice.cliente,
            invoice.subtotal.to_string(),
            invoice.creditos.to_string(),
            invoice.total.to_string(),
        ],
    )?;
    let factura_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO detalle_factura (factura_id, producto_id, upc, descripcion, cantidad, precio, total)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for line in &invoice.lines {
        let producto_id = if line.upc.is_empty() {
            None
        } else {
            match find_product_by_upc(conn, &line.upc)? {
                Some(p) => Some(p.id),
                None => {
                    let id = insert_product(conn, &line.upc, &line.descripcion, line.precio, "PZA")?;
                    tracing::info!(upc = %line.upc, product_id = id, "registered new product from invoice");
                    Some(id)
                }
            }
        };

        stmt.execute(params![
            factura_id,
            producto_id,
            line.upc,
            line.descripcion,
            line.cantidad.to_string(),
            line.precio.to_string(),
            line.total.to_string(),
        ])?;
    }

    Ok(factura_id)
}

pub fn set_invoice_pdf_path(conn: &Connection, factura_id: i64, pdf_path: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE facturas SET pdf_path = ?1 WHERE id = ?2",
        params![pdf_path, factura_id],
    )?;
    Ok(())
}

pub fn get_invoice(conn: &Connection, factura_id: i64) -> anyhow::Result<Option<StoredInvoice>> {
    let header = conn
        .query_row(
            "SELECT fecha, cliente, subtotal, creditos, total, pdf_path, created_at
             FROM facturas WHERE id = ?1",
            params![factura_id],
            |row| -> rusqlite::Result<(String, String, String, String, String, Option<String>, String)> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )
        .optional()?;
    let Some((fecha, cliente, subtotal, creditos, total, pdf_path, created_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT upc, descripcion, cantidad, precio, total FROM detalle_factura
         WHERE factura_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(
        params![factura_id],
        |row| -> rusqlite::Result<(String, String, String, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        },
    )?;

    let mut lines = vec![];
    for row in rows {
        let (upc, descripcion, cantidad, precio, total) = row?;
        lines.push(InvoiceLine {
            upc,
            descripcion,
            cantidad: Decimal::from_str(&cantidad)?,
            precio: Decimal::from_str(&precio)?,
            total: Decimal::from_str(&total)?,
        });
    }

    Ok(Some(StoredInvoice {
        id: factura_id,
        invoice: Invoice {
            fecha: NaiveDate::parse_from_str(&fecha, "%Y-%m-%d")?,
            cliente,
            lines,
            subtotal: Decimal::from_str(&subtotal)?,
            creditos: Decimal::from_str(&creditos)?,
            total: Decimal::from_str(&total)?,
        },
        pdf_path,
        created_at,
    }))
}

/// Most recent invoices first.
pub fn list_invoices(conn: &Connection, limit: i64) -> anyhow::Result<Vec<InvoiceSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, fecha, cliente, total, pdf_path, created_at FROM facturas
         ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(
        params![limit],
        |row| -> rusqlite::Result<(i64, String, String, String, Option<String>, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        },
    )?;

    let mut invoices = vec![];
    for row in rows {
        let (id, fecha, cliente, total, pdf_path, created_at) = row?;
        invoices.push(InvoiceSummary {
            id,
            fecha,
            cliente,
            total: Decimal::from_str(&total)?,
            pdf_path,
            created_at,
        });
    }
    Ok(invoices)
}

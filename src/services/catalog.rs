//! Product catalogue import from the market's inventory spreadsheets.
//!
//! Expected header row: `UPC, QTY, PRODUCT, PRICE, TOTAL` in any order and
//! case. Only `UPC`, `PRODUCT` and `PRICE` are read.

use std::collections::HashMap;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::market;

const REQUIRED_COLUMNS: [&str; 3] = ["UPC", "PRODUCT", "PRICE"];

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub upc: String,
    pub producto: String,
    pub precio: Decimal,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ImportError {
    #[error("Columna '{0}' no encontrada en el CSV")]
    MissingColumn(&'static str),
    #[error("Precio inválido en la fila {row}: {value}")]
    InvalidPrice { row: usize, value: String },
    #[error("CSV inválido: {0}")]
    Malformed(String),
}

fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(cleaned)
        .ok()
        .filter(|p| !p.is_sign_negative())
}

/// Letters of the product name, uppercased, at most ten.
fn upc_key(producto: &str) -> String {
    producto
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .take(10)
        .collect()
}

/// Parses the spreadsheet. Rows without both UPC and product are skipped;
/// rows without a UPC get one derived from the product name, e.g.
/// `PANDULCE001`, `PANDULCE002`.
pub fn parse_catalog_csv(bytes: &[u8]) -> Result<Vec<CatalogRow>, ImportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = rdr
        .headers()
        .map_err(|e| ImportError::Malformed(e.to_string()))?
        .clone();
    let mut columns = [0usize; 3];
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(ImportError::MissingColumn(name))?;
    }
    let [upc_col, product_col, price_col] = columns;

    let mut generated: HashMap<String, u32> = HashMap::new();
    let mut rows = vec![];
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| ImportError::Malformed(e.to_string()))?;
        let field = |col: usize| record.get(col).unwrap_or("").to_string();

        let mut upc = field(upc_col);
        let producto = field(product_col);
        if upc.is_empty() && producto.is_empty() {
            continue;
        }

        let raw_price = field(price_col);
        let precio = parse_price(&raw_price).ok_or(ImportError::InvalidPrice {
            row: index + 2,
            value: raw_price,
        })?;

        if upc.is_empty() {
            let key = upc_key(&producto);
            let counter = generated.entry(key.clone()).or_insert(0);
            *counter += 1;
            upc = format!("{key}{:03}", *counter);
        }

        rows.push(CatalogRow { upc, producto, precio });
    }

    Ok(rows)
}

/// Upserts every row in a single transaction. Returns how many were written.
pub fn import_catalog(conn: &mut Connection, rows: &[CatalogRow]) -> anyhow::Result<usize> {
    let tx = conn.transaction()?;
    for row in rows {
        market::upsert_product(&tx, &row.upc, &row.producto, row.precio)?;
    }
    tx.commit()?;

    tracing::info!(products = rows.len(), "catalogue imported");
    Ok(rows.len())
}

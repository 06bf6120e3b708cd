use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLineInput {
    #[serde(default)]
    pub upc: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub cantidad: Decimal,
    #[serde(default)]
    pub precio: Decimal,
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceRequest {
    pub fecha: Option<String>,
    pub cliente: Option<String>,
    pub productos: Option<Vec<InvoiceLineInput>>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub creditos: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub upc: String,
    pub descripcion: String,
    pub cantidad: Decimal,
    pub precio: Decimal,
    pub total: Decimal,
}

/// A validated invoice whose totals were recomputed server-side.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub fecha: NaiveDate,
    pub cliente: String,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub creditos: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SavedInvoice {
    pub success: bool,
    pub factura_id: i64,
    pub pdf_url: String,
    pub mensaje: String,
}

#[derive(Debug, PartialEq)]
pub enum InvoiceError {
    Incomplete,
    NoProducts,
    InvalidDate,
    InvalidLine(usize),
    NegativeCredits,
}

impl std::fmt::Display for InvoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceError::Incomplete => write!(f, "Datos incompletos"),
            InvoiceError::NoProducts => write!(f, "No hay productos en la factura"),
            InvoiceError::InvalidDate => write!(f, "Fecha inválida"),
            InvoiceError::InvalidLine(n) => write!(f, "Producto inválido en la línea {n}"),
            InvoiceError::NegativeCredits => write!(f, "Los créditos no pueden ser negativos"),
        }
    }
}

impl InvoiceRequest {
    /// Validates the payload and recomputes every total from quantity and
    /// price. Client-sent totals are only compared, never trusted.
    pub fn into_invoice(self) -> Result<Invoice, InvoiceError> {
        let (Some(fecha), Some(cliente), Some(productos)) = (self.fecha, self.cliente, self.productos)
        else {
            return Err(InvoiceError::Incomplete);
        };

        if productos.is_empty() {
            return Err(InvoiceError::NoProducts);
        }

        let fecha = parse_invoice_date(&fecha).ok_or(InvoiceError::InvalidDate)?;

        let mut lines = Vec::with_capacity(productos.len());
        for (idx, input) in productos.into_iter().enumerate() {
            let descripcion = input.descripcion.trim().to_string();
            if descripcion.is_empty() || input.cantidad <= Decimal::ZERO || input.precio < Decimal::ZERO {
                return Err(InvoiceError::InvalidLine(idx + 1));
            }
            let total = round_money(input.cantidad * input.precio);
            if let Some(sent) = input.total {
                if (sent - total).abs() > Decimal::new(1, 2) {
                    tracing::warn!(line = idx + 1, %sent, computed = %total, "line total mismatch, using computed value");
                }
            }
            lines.push(InvoiceLine {
                upc: input.upc.trim().to_string(),
                descripcion,
                cantidad: input.cantidad,
                precio: round_money(input.precio),
                total,
            });
        }

        let creditos = round_money(self.creditos.unwrap_or_default());
        if creditos < Decimal::ZERO {
            return Err(InvoiceError::NegativeCredits);
        }

        let subtotal: Decimal = lines.iter().map(|l| l.total).sum();
        let total = subtotal - creditos;

        if let Some(sent) = self.total {
            if (sent - total).abs() > Decimal::new(1, 2) {
                tracing::warn!(%sent, computed = %total, "invoice total mismatch, using computed value");
            }
        }

        Ok(Invoice {
            fecha,
            cliente: cliente.trim().to_string(),
            lines,
            subtotal,
            creditos,
            total,
        })
    }
}

/// An invoice as read back from the market database.
#[derive(Debug, Clone)]
pub struct StoredInvoice {
    pub id: i64,
    pub invoice: Invoice,
    pub pdf_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceSummary {
    pub id: i64,
    pub fecha: String,
    pub cliente: String,
    pub total: Decimal,
    pub pdf_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceLineView {
    pub upc: String,
    pub descripcion: String,
    pub cantidad: String,
    pub precio: String,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub id: i64,
    pub fecha: String,
    pub cliente: String,
    pub subtotal: String,
    pub creditos: String,
    pub total: String,
    pub pdf_url: Option<String>,
    pub created_at: String,
    pub items: Vec<InvoiceLineView>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceSummaryView {
    pub id: i64,
    pub fecha: String,
    pub cliente: String,
    pub total: String,
    pub pdf_url: Option<String>,
    pub created_at: String,
}

fn cents(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

impl StoredInvoice {
    pub fn detail(&self) -> InvoiceDetail {
        let invoice = &self.invoice;
        InvoiceDetail {
            id: self.id,
            fecha: invoice.fecha.format("%Y-%m-%d").to_string(),
            cliente: invoice.cliente.clone(),
            subtotal: cents(invoice.subtotal),
            creditos: cents(invoice.creditos),
            total: cents(invoice.total),
            pdf_url: self.pdf_path.clone(),
            created_at: self.created_at.clone(),
            items: invoice
                .lines
                .iter()
                .map(|line| InvoiceLineView {
                    upc: line.upc.clone(),
                    descripcion: line.descripcion.clone(),
                    cantidad: line.cantidad.normalize().to_string(),
                    precio: cents(line.precio),
                    total: cents(line.total),
                })
                .collect(),
        }
    }
}

impl InvoiceSummary {
    pub fn view(&self) -> InvoiceSummaryView {
        InvoiceSummaryView {
            id: self.id,
            fecha: self.fecha.clone(),
            cliente: self.cliente.clone(),
            total: cents(self.total),
            pdf_url: self.pdf_path.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

fn parse_invoice_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Half-up rounding to cents.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Two decimals with comma thousands separators: `1,234.50`.
pub fn format_money(amount: Decimal) -> String {
    let amount = round_money(amount);
    let rounded = format!("{:.2}", amount.abs());
    let (int_part, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < Decimal::ZERO { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

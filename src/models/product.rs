use rust_decimal::Decimal;
use serde::Serialize;

use super::invoice::round_money;

#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub upc: String,
    pub producto: String,
    pub precio: Decimal,
    pub unidad: String,
}

/// JSON shape consumed by the invoice screen.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    pub nombre: String,
    pub precio: String,
    pub unidad: String,
}

impl Product {
    pub fn view(&self, include_upc: bool) -> ProductView {
        ProductView {
            id: self.id,
            upc: include_upc.then(|| self.upc.clone()),
            nombre: self.producto.clone(),
            precio: format!("{:.2}", round_money(self.precio)),
            unidad: self.unidad.clone(),
        }
    }
}

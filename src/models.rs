use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sheets::SheetRow;

pub const COL_ID: &str = "ID";
pub const COL_INVOICE_FOLIO: &str = "Folio_Factura";
pub const COL_CLIENT: &str = "Cliente";
pub const COL_SALESPERSON: &str = "Vendedor_Registro";
pub const COL_SHIPMENT_TYPE: &str = "Tipo_Envio";
pub const COL_DELIVERY_DATE: &str = "Fecha_Entrega";
pub const COL_STATUS: &str = "Estado";
pub const COL_PAYMENT_STATUS: &str = "Estado_Pago";
pub const COL_COMMENT: &str = "Comentario";
pub const COL_ATTACHMENTS: &str = "Adjuntos";
pub const COL_FULFILLMENT_ATTACHMENTS: &str = "Adjuntos_Surtido";
pub const COL_GUIDE_ATTACHMENTS: &str = "Adjuntos_Guia";

/// One order row from the sheet. The sheet has a header row, so the first
/// order sits on `row_number == 2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub row_number: usize,
    pub id: String,
    pub invoice_folio: String,
    pub client: String,
    pub salesperson: String,
    pub shipment_type: String,
    pub delivery_date: String,
    pub status: String,
    pub payment_status: String,
    pub comment: String,
    pub attachments: Vec<String>,
    pub fulfillment_attachments: Vec<String>,
    pub guide_attachments: Vec<String>,
}

impl Order {
    pub fn from_row(row_number: usize, row: &SheetRow) -> Option<Self> {
        let id = row.get(COL_ID).map(str::trim).unwrap_or_default();
        if id.is_empty() {
            return None;
        }

        let text = |column: &str| row.get(column).unwrap_or_default().trim().to_string();
        let links = |column: &str| split_links(row.get(column).unwrap_or_default());

        Some(Self {
            row_number,
            id: id.to_string(),
            invoice_folio: text(COL_INVOICE_FOLIO),
            client: text(COL_CLIENT),
            salesperson: text(COL_SALESPERSON),
            shipment_type: text(COL_SHIPMENT_TYPE),
            delivery_date: text(COL_DELIVERY_DATE),
            status: text(COL_STATUS),
            payment_status: text(COL_PAYMENT_STATUS),
            comment: text(COL_COMMENT),
            attachments: links(COL_ATTACHMENTS),
            fulfillment_attachments: links(COL_FULFILLMENT_ATTACHMENTS),
            guide_attachments: links(COL_GUIDE_ATTACHMENTS),
        })
    }
}

/// Decodes sheet rows into orders, skipping rows without an identifier.
pub fn orders_from_rows(rows: &[SheetRow]) -> Vec<Order> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| Order::from_row(index + 2, row))
        .collect()
}

pub fn split_links(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
        .collect()
}

/// A listed object in the attachment bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }

    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLink {
    pub key: String,
    pub name: String,
    pub url: Option<String>,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub order: Order,
    pub prefix: String,
    pub waybill: Option<String>,
    pub coincidentes: Vec<FileLink>,
    pub comprobantes: Vec<FileLink>,
    pub facturas: Vec<FileLink>,
    pub otros: Vec<FileLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> SheetRow {
        SheetRow::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn decodes_order_and_splits_attachment_lists() {
        let order = Order::from_row(
            2,
            &row(&[
                (COL_ID, " PED-001 "),
                (COL_CLIENT, "José Martínez"),
                (COL_ATTACHMENTS, "a.pdf, b.pdf,, "),
                (COL_GUIDE_ATTACHMENTS, "guia.pdf"),
            ]),
        )
        .expect("order");

        assert_eq!(order.id, "PED-001");
        assert_eq!(order.client, "José Martínez");
        assert_eq!(order.attachments, vec!["a.pdf", "b.pdf"]);
        assert_eq!(order.guide_attachments, vec!["guia.pdf"]);
        assert!(order.fulfillment_attachments.is_empty());
        assert_eq!(order.status, "");
    }

    #[test]
    fn rows_without_identifier_are_skipped_but_keep_positions() {
        let rows = vec![
            row(&[(COL_ID, "A")]),
            row(&[(COL_CLIENT, "no id")]),
            row(&[(COL_ID, "C")]),
        ];
        let orders = orders_from_rows(&rows);
        let positions: Vec<(usize, &str)> = orders
            .iter()
            .map(|order| (order.row_number, order.id.as_str()))
            .collect();
        assert_eq!(positions, vec![(2, "A"), (4, "C")]);
    }

    #[test]
    fn file_name_is_last_path_component() {
        assert_eq!(file_name("attachments/PED-1/guia.pdf"), "guia.pdf");
        assert_eq!(file_name("guia.pdf"), "guia.pdf");
    }
}

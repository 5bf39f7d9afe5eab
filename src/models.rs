
/// A stored receipt. Everything the extraction or the user may not have
/// supplied is an `Option`; nothing is ever defaulted to a fake value.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: i64,
    pub filename: String,
    pub file_path: String,
    pub checksum: Option<String>,
    pub ocr_text: Option<String>,
    pub restaurant_name: Option<String>,
    pub date: Option<String>,
    pub total_amount: Option<f64>,
    pub accounting_category: Option<String>,
    pub country: Option<String>,
    pub cost_center: Option<String>,
    pub fx_rate: Option<f64>,
    pub markup_percent: Option<f64>,
    pub reporting_amount: Option<f64>,
    pub reimbursement: Option<String>,
    pub detail: Option<String>,
    pub display_filename: Option<String>,
    pub reviewed: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) const RECEIPT_COLUMNS: &str = "id, filename, file_path, checksum, ocr_text, \
     restaurant_name, date, total_amount, accounting_category, country, cost_center, \
     fx_rate, markup_percent, reporting_amount, reimbursement, detail, display_filename, \
     reviewed, created_at, updated_at";

impl Receipt {
    /// Map a row selected with [`RECEIPT_COLUMNS`].
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            file_path: row.get(2)?,
            checksum: row.get(3)?,
            ocr_text: row.get(4)?,
            restaurant_name: row.get(5)?,
            date: row.get(6)?,
            total_amount: row.get(7)?,
            accounting_category: row.get(8)?,
            country: row.get(9)?,
            cost_center: row.get(10)?,
            fx_rate: row.get(11)?,
            markup_percent: row.get(12)?,
            reporting_amount: row.get(13)?,
            reimbursement: row.get(14)?,
            detail: row.get(15)?,
            display_filename: row.get(16)?,
            reviewed: row.get(17)?,
            created_at: row.get::<_, Option<String>>(18)?.unwrap_or_default(),
            updated_at: row.get::<_, Option<String>>(19)?.unwrap_or_default(),
        })
    }

    /// Name used in reports and exports: the stored display filename as a
    /// `.pdf`, or the uploaded filename for receipts that never got one.
    pub fn export_name(&self) -> String {
        match &self.display_filename {
            Some(name) => format!("{name}.pdf"),
            None => self.filename.clone(),
        }
    }
}

/// Structured fields pulled out of OCR text. Any or all may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub restaurant_name: Option<String>,
    pub date: Option<String>,
    pub total_amount: Option<f64>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.restaurant_name.is_none() && self.date.is_none() && self.total_amount.is_none()
    }
}

/// Source fields for a freshly uploaded receipt.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub filename: String,
    pub file_path: String,
    pub checksum: Option<String>,
    pub ocr_text: Option<String>,
    pub extraction: Extraction,
    pub accounting_category: Option<String>,
    pub country: Option<String>,
    pub cost_center: Option<String>,
}

/// The full correctable and accounting field set submitted on review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptUpdate {
    pub restaurant_name: Option<String>,
    pub date: Option<String>,
    pub total_amount: Option<f64>,
    pub accounting_category: Option<String>,
    pub country: Option<String>,
    pub cost_center: Option<String>,
    pub fx_rate: Option<f64>,
    pub markup_percent: Option<f64>,
    pub reimbursement: Option<String>,
    pub detail: Option<String>,
}

impl ReceiptUpdate {
    /// Start from the receipt's current values, so a partial edit only
    /// changes what the user touched.
    pub fn from_receipt(r: &Receipt) -> Self {
        Self {
            restaurant_name: r.restaurant_name.clone(),
            date: r.date.clone(),
            total_amount: r.total_amount,
            accounting_category: r.accounting_category.clone(),
            country: r.country.clone(),
            cost_center: r.cost_center.clone(),
            fx_rate: r.fx_rate,
            markup_percent: r.markup_percent,
            reimbursement: r.reimbursement.clone(),
            detail: r.detail.clone(),
        }
    }
}

/// A reviewed receipt used to prime the extraction prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub ocr_text: String,
    pub restaurant_name: String,
    pub date: String,
    pub total_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> Receipt {
        Receipt {
            id: 1,
            filename: "IMG_0001.jpg".to_string(),
            file_path: "/tmp/IMG_0001.jpg".to_string(),
            checksum: None,
            ocr_text: None,
            restaurant_name: Some("Cafe".to_string()),
            date: Some("2025-10-15".to_string()),
            total_amount: Some(300.0),
            accounting_category: None,
            country: Some("MX".to_string()),
            cost_center: None,
            fx_rate: Some(20.0),
            markup_percent: Some(2.5),
            reporting_amount: None,
            reimbursement: None,
            detail: None,
            display_filename: None,
            reviewed: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_export_name_falls_back_to_upload_name() {
        let mut r = receipt();
        assert_eq!(r.export_name(), "IMG_0001.jpg");
        r.display_filename = Some("2025_10_Cafe_2".to_string());
        assert_eq!(r.export_name(), "2025_10_Cafe_2.pdf");
    }

    #[test]
    fn test_update_from_receipt_keeps_values() {
        let r = receipt();
        let u = ReceiptUpdate::from_receipt(&r);
        assert_eq!(u.restaurant_name.as_deref(), Some("Cafe"));
        assert_eq!(u.total_amount, Some(300.0));
        assert_eq!(u.country.as_deref(), Some("MX"));
    }

    #[test]
    fn test_extraction_is_empty() {
        assert!(Extraction::default().is_empty());
        let e = Extraction { total_amount: Some(1.0), ..Extraction::default() };
        assert!(!e.is_empty());
    }
}

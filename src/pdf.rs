use std::collections::HashSet;
use std::io::BufWriter;
use std::path::Path;

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::*;

use crate::error::{ChitError, Result};
use crate::fmt::money_opt;
use crate::models::Receipt;
use crate::ocr::is_pdf;

// US Letter dimensions (mm)
const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 25.4;
const MARGIN_LEFT: f32 = 19.05;
const MARGIN_RIGHT: f32 = 19.05;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;
const IMAGE_DPI: f32 = 300.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Cut `text` so it fits in `width` mm at `size`, marking the cut with "...".
fn fit_text(text: &str, width: f32, size: f32) -> String {
    if approx_text_width(text, size) <= width {
        return text.to_string();
    }
    let max_chars = ((width / (size * 0.18)) as usize).saturating_sub(3);
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ChitError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ChitError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer().use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn hline(&self, x1: f32, x2: f32) {
        let layer = self.layer();
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), Mm(self.pdf_y())), false),
                (Point::new(Mm(x2), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn header(&mut self, title: &str, owner: &str, date_range: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !owner.is_empty() {
            self.text(owner, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        self.text(date_range, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 5.0;
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 5.0;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.cells(cols, headers, true);
        self.y += ROW_H;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn table_row(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        self.ensure_space(ROW_H);
        self.cells(cols, values, bold);
        self.y += ROW_H;
    }

    fn cells(&self, cols: &[Col], values: &[&str], bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in cols.iter().zip(values) {
            let value = fit_text(value, col.width - 2.0, FONT_SIZE);
            match col.align {
                Align::Left => self.text(&value, x, FONT_SIZE, bold),
                Align::Right => {
                    let tw = approx_text_width(&value, FONT_SIZE);
                    self.text(&value, x + col.width - tw, FONT_SIZE, bold);
                }
            }
            x += col.width;
        }
    }

    fn separator(&mut self) {
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn note(&mut self, s: &str) {
        self.ensure_space(ROW_H);
        self.text(s, MARGIN_LEFT, FONT_SIZE, false);
        self.y += ROW_H;
    }

    /// Draw `img` below the cursor, scaled down to the remaining page area.
    fn image(&mut self, img: &DynamicImage) {
        let (px_w, px_h) = img.dimensions();
        if px_w == 0 || px_h == 0 {
            return;
        }
        let natural_w = px_w as f32 / IMAGE_DPI * 25.4;
        let natural_h = px_h as f32 / IMAGE_DPI * 25.4;
        let avail_w = PAGE_W - MARGIN_LEFT - MARGIN_RIGHT;
        let avail_h = PAGE_H - self.y - MARGIN_BOTTOM;
        let scale = (avail_w / natural_w).min(avail_h / natural_h);

        let bottom = PAGE_H - self.y - natural_h * scale;
        // RGBA input renders incorrectly; flatten first.
        let flat = DynamicImage::ImageRgb8(img.to_rgb8());
        Image::from_dynamic_image(&flat).add_to_layer(
            self.layer(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_LEFT)),
                translate_y: Some(Mm(bottom)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        self.y += natural_h * scale;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ChitError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| ChitError::Pdf(e.to_string()))
    }
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image_crate::open(path).map_err(|e| ChitError::Pdf(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

/// Expense report: a summary table with a total, then (optionally) one page
/// per distinct receipt showing its scanned image.
pub fn render_expense_report(
    receipts: &[Receipt],
    owner: &str,
    date_range: &str,
    include_images: bool,
) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new("Expense Report")?;
    pdf.header("Expense Report", owner, date_range);

    let cols = &[
        Col { width: 25.0, align: Align::Left },
        Col { width: 62.0, align: Align::Left },
        Col { width: 28.0, align: Align::Right },
        Col { width: 62.8, align: Align::Left },
    ];
    pdf.table_header(cols, &["Date", "Restaurant/Venue", "Amount", "Receipt Name"]);

    for r in receipts {
        let amount = money_opt(r.reporting_amount);
        let name = r.export_name();
        pdf.table_row(
            cols,
            &[
                r.date.as_deref().unwrap_or("N/A"),
                r.restaurant_name.as_deref().unwrap_or("N/A"),
                &amount,
                &name,
            ],
            false,
        );
    }
    let total: f64 = receipts.iter().filter_map(|r| r.reporting_amount).sum();
    pdf.separator();
    pdf.table_row(cols, &["", "TOTAL", &money_opt(Some(total)), ""], true);

    if include_images {
        add_receipt_pages(&mut pdf, receipts);
    }

    pdf.to_bytes()
}

/// Split receipts share one scan, so only the first receipt per
/// (restaurant, date) gets a page.
fn add_receipt_pages(pdf: &mut PdfWriter, receipts: &[Receipt]) {
    let mut seen: HashSet<(Option<&str>, Option<&str>)> = HashSet::new();
    for r in receipts {
        if !seen.insert((r.restaurant_name.as_deref(), r.date.as_deref())) {
            continue;
        }
        let path = Path::new(&r.file_path);
        if !path.exists() {
            tracing::warn!(id = r.id, path = %r.file_path, "receipt file missing, page skipped");
            continue;
        }

        pdf.new_page();
        pdf.text(&r.export_name(), MARGIN_LEFT, 12.0, true);
        pdf.y += 6.0;
        let detail = format!(
            "{}  |  {}  |  {}",
            r.restaurant_name.as_deref().unwrap_or("N/A"),
            r.date.as_deref().unwrap_or("N/A"),
            money_opt(r.reporting_amount),
        );
        pdf.note(&detail);
        pdf.y += 3.0;

        if is_pdf(path) {
            pdf.note(&format!("Original receipt is a PDF: {}", r.filename));
            continue;
        }
        match open_image(path) {
            Ok(img) => pdf.image(&img),
            Err(e) => {
                tracing::warn!(id = r.id, error = %e, "could not decode receipt image");
                pdf.note("Receipt image could not be read.");
            }
        }
    }
}

/// Wrap a single receipt image in a one-page PDF.
pub fn image_to_pdf(image_path: &Path, title: &str) -> Result<Vec<u8>> {
    let img = open_image(image_path)?;
    let mut pdf = PdfWriter::new(title)?;
    pdf.image(&img);
    pdf.to_bytes()
}

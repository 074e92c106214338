//! printpdfによる描画
//!
//! 座標は上端からの距離（mm）で指定し、描画時にPDFの座標系（左下原点）に変換します。

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, LineDashPattern, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Rect, Rgb,
};
use qrcode::{EcLevel, QrCode};

use super::letter::Letter;
use crate::api::PageSize;
use crate::error::{AntonToolError, ValidationError};

const MARGIN: f32 = 25.0;
const QR_SIZE: f32 = 45.0;
const STICKER_HEIGHT: f32 = 40.0;
const STICKER_QR_SIZE: f32 = 30.0;
const LAYER_NAME: &str = "Ebene 1";

/// 1pt = 0.3528mm
const PT_TO_MM: f32 = 0.3528;

/// QRコードのモジュール配列
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    /// ログインコードをQRコードに変換する
    ///
    /// # エラー
    ///
    /// データが長すぎる場合など、符号化に失敗した場合は`ValidationError::Template`
    pub fn encode(data: &str) -> Result<Self, ValidationError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
            .map_err(|e| ValidationError::Template(format!("QR code: {}", e)))?;
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        Ok(Self {
            width: code.width(),
            dark,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// 行ごとの連続した黒モジュール（開始列, 長さ）
    fn dark_runs(&self, row: usize) -> Vec<(usize, usize)> {
        let cells = &self.dark[row * self.width..(row + 1) * self.width];
        let mut runs = Vec::new();
        let mut start = None;
        for (x, &dark) in cells.iter().enumerate() {
            match (dark, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, x - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, self.width - s));
        }
        runs
    }
}

/// 1つのPDFドキュメント（1ページ1名）
pub(crate) struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    width: f32,
    height: f32,
    /// 作成時に自動で追加される最初のページ（まだ使われていない場合）
    unused_first_page: Option<(PdfPageIndex, PdfLayerIndex)>,
    pages: usize,
}

impl PdfWriter {
    pub fn new(title: &str, page_size: PageSize) -> Result<Self, AntonToolError> {
        let (width, height) = page_size.dimensions_mm();
        let (doc, page, layer) = PdfDocument::new(title, Mm(width), Mm(height), LAYER_NAME);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        Ok(Self {
            doc,
            regular,
            bold,
            width,
            height,
            unused_first_page: Some((page, layer)),
            pages: 0,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// 1名分のページを追加する
    pub fn add_letter(&mut self, letter: &Letter, qr: &QrMatrix) {
        let (page, layer) = match self.unused_first_page.take() {
            Some(first) => first,
            None => self
                .doc
                .add_page(Mm(self.width), Mm(self.height), LAYER_NAME),
        };
        let layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;

        let canvas = Canvas {
            layer: &layer,
            regular: &self.regular,
            bold: &self.bold,
            width: self.width,
            height: self.height,
        };
        canvas.draw_letter(letter, qr);
    }

    /// PDFのバイト列を生成する
    pub fn finish(self) -> Result<Vec<u8>, AntonToolError> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

fn pdf_error(e: printpdf::Error) -> AntonToolError {
    AntonToolError::Pdf(format!("{:?}", e))
}

struct Canvas<'a> {
    layer: &'a PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    width: f32,
    height: f32,
}

impl Canvas<'_> {
    fn draw_letter(&self, letter: &Letter, qr: &QrMatrix) {
        self.set_color(0.0, 0.0, 0.0);

        self.text(&letter.title, 20.0, MARGIN, 28.0, true);
        self.text(&letter.greeting, 14.0, MARGIN, 45.0, false);
        self.text(&letter.welcome, 14.0, MARGIN, 57.0, false);
        self.text(&letter.account, 14.0, MARGIN, 65.0, false);
        self.text(&letter.browser, 14.0, MARGIN, 79.0, false);
        self.text(&letter.link, 18.0, MARGIN, 89.0, false);
        self.text(&letter.app, 14.0, MARGIN, 99.0, false);
        self.text(&letter.login, 14.0, MARGIN, 113.0, false);
        self.centered_text(&letter.code, 24.0, 127.0, true);
        self.text(&letter.scan, 14.0, MARGIN, 141.0, false);
        self.qr(qr, (self.width - QR_SIZE) / 2.0, 147.0, QR_SIZE);

        self.cut_line(205.0);
        self.sticker(letter, qr, 212.0);

        if let Some(support) = &letter.support {
            self.text(support, 10.0, MARGIN, self.height - 17.0, false);
        }
    }

    fn sticker(&self, letter: &Letter, qr: &QrMatrix, top: f32) {
        let left = MARGIN;
        let right = self.width - MARGIN;
        let bottom = top + STICKER_HEIGHT;

        self.layer.set_outline_color(gray(0.4));
        self.layer.set_outline_thickness(0.8);
        self.layer.add_rect(
            Rect::new(Mm(left), self.y(bottom), Mm(right), self.y(top)).with_mode(PaintMode::Stroke),
        );

        let text_left = left + 5.0;
        let text_width = right - left - STICKER_QR_SIZE - 15.0;
        self.text(&letter.title, 10.0, text_left, top + 8.0, true);
        self.text(&letter.sticker_name, 12.0, text_left, top + 17.0, false);
        let code_size = fitting_font_size(&letter.code, text_width, 22.0, 10.0);
        self.text(&letter.code, code_size, text_left, top + 30.0, true);

        let qr_top = top + (STICKER_HEIGHT - STICKER_QR_SIZE) / 2.0;
        self.qr(qr, right - STICKER_QR_SIZE - 5.0, qr_top, STICKER_QR_SIZE);
    }

    fn cut_line(&self, top: f32) {
        self.layer.set_outline_color(gray(0.5));
        self.layer.set_outline_thickness(0.5);
        self.layer.set_line_dash_pattern(LineDashPattern {
            dash_1: Some(4),
            gap_1: Some(3),
            ..LineDashPattern::default()
        });
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), self.y(top)), false),
                (Point::new(Mm(self.width - MARGIN), self.y(top)), false),
            ],
            is_closed: false,
        });
        self.layer.set_line_dash_pattern(LineDashPattern::default());

        self.set_color(0.5, 0.5, 0.5);
        self.text("hier abschneiden", 8.0, MARGIN, top - 2.0, false);
        self.set_color(0.0, 0.0, 0.0);
    }

    /// 左上(x, top)から一辺`size`mmのQRコードを描画（黒モジュールの連続部分を1つの矩形にまとめる）
    fn qr(&self, qr: &QrMatrix, x: f32, top: f32, size: f32) {
        if qr.width() == 0 {
            return;
        }
        let module = size / qr.width() as f32;

        self.set_color(0.0, 0.0, 0.0);
        for row in 0..qr.width() {
            let row_top = top + row as f32 * module;
            for (start, len) in qr.dark_runs(row) {
                let x1 = x + start as f32 * module;
                let x2 = x1 + len as f32 * module;
                self.layer.add_rect(
                    Rect::new(Mm(x1), self.y(row_top + module), Mm(x2), self.y(row_top))
                        .with_mode(PaintMode::Fill),
                );
            }
        }
    }

    fn centered_text(&self, text: &str, size: f32, top: f32, bold: bool) {
        let x = ((self.width - estimate_width(text, size)) / 2.0).max(MARGIN);
        self.text(text, size, x, top, bold);
    }

    fn text(&self, text: &str, size: f32, x: f32, top: f32, bold: bool) {
        let font = if bold { self.bold } else { self.regular };
        self.layer.use_text(text, size, Mm(x), self.y(top), font);
    }

    fn set_color(&self, r: f32, g: f32, b: f32) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn y(&self, top: f32) -> Mm {
        Mm(self.height - top)
    }
}

fn gray(level: f32) -> Color {
    Color::Rgb(Rgb::new(level, level, level, None))
}

/// Helveticaの平均文字幅（フォントサイズの約0.55倍）からテキスト幅（mm）を推定
pub(crate) fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.55 * PT_TO_MM
}

/// `max_width`に収まる最大のフォントサイズ（`min`未満にはしない）
pub(crate) fn fitting_font_size(text: &str, max_width: f32, max: f32, min: f32) -> f32 {
    let mut size = max;
    while size > min && estimate_width(text, size) > max_width {
        size -= 1.0;
    }
    size.max(min)
}

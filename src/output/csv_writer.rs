//! CSV Writer
//!
//! 固定ヘッダーと固定列順のCSVをcsvクレートで書き出す。

use std::io::Write;

use crate::error::AntonToolError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV出力オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// 区切り文字（1バイトのASCII）
    pub delimiter: u8,
    /// 先頭にUTF-8 BOMを書き込むか（Excelでウムラウトを正しく表示するため）
    pub bom: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            bom: true,
        }
    }
}

/// ヘッダーと行をCSVとして書き込む
///
/// 区切り文字・引用符・改行を含むフィールドのみ引用符で囲みます。
/// 改行は`\r\n`ではなく`\n`に統一します。
pub fn write_table<'a, W, const N: usize>(
    mut writer: W,
    header: [&str; N],
    rows: impl IntoIterator<Item = [&'a str; N]>,
    options: CsvOptions,
) -> Result<usize, AntonToolError>
where
    W: Write,
{
    if options.bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    csv_writer.write_record(header)?;
    let mut count = 0;
    for row in rows {
        csv_writer.write_record(row)?;
        count += 1;
    }
    csv_writer.flush()?;

    Ok(count)
}

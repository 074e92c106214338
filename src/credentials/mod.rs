//! Credentials Module
//!
//! ANTONからエクスポートしたアクセス情報（CSVまたはExcel）を読み込み、
//! PDF生成用の`CredentialEntry`に変換するモジュール。

mod columns;

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::AntonToolError;
use crate::security::{read_limited, SecurityConfig};
use crate::types::{CredentialEntry, SkippedRecord};

use columns::ColumnMap;

/// calamineで読み込む拡張子
const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// 読み込み結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialTable {
    /// 有効な行（入力順）
    pub entries: Vec<CredentialEntry>,
    /// スキップされた行
    pub skipped: Vec<SkippedRecord>,
}

impl CredentialTable {
    fn from_rows<I>(rows: I, location: &str) -> Result<Self, AntonToolError>
    where
        I: IntoIterator<Item = Result<(usize, Vec<String>), AntonToolError>>,
    {
        let mut rows = rows.into_iter();
        let columns = match rows.next() {
            Some(header) => {
                let (_, header) = header?;
                ColumnMap::from_header(&header, location)?
            }
            None => {
                return Err(AntonToolError::parse(location, "no header row"));
            }
        };

        let mut table = Self::default();
        for row in rows {
            let (line, row) = row?;
            match columns.entry(line, &row) {
                None => {}
                Some(Ok(entry)) => {
                    tracing::debug!(line, identifier = entry.identifier(), "credential row read");
                    table.entries.push(entry);
                }
                Some(Err((reference, reason))) => {
                    tracing::warn!(line, %reason, "skipping credential row");
                    table.skipped.push(SkippedRecord {
                        position: line,
                        reference,
                        reason,
                    });
                }
            }
        }

        Ok(table)
    }
}

/// 入力ファイルを読み込む
///
/// 拡張子が`xlsx`, `xlsm`, `xls`, `ods`の場合はExcel/ODSとして最初のシートを、
/// それ以外はCSVとして読み込みます。
///
/// # 引数
///
/// * `path` - 入力ファイルのパス
/// * `delimiter` - CSVの区切り文字
pub fn read_credentials(
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<CredentialTable, AntonToolError> {
    read_credentials_with(path.as_ref(), delimiter, &SecurityConfig::default())
}

pub(crate) fn read_credentials_with(
    path: &Path,
    delimiter: u8,
    security: &SecurityConfig,
) -> Result<CredentialTable, AntonToolError> {
    let content = read_limited(path, security)?;
    let location = path.display().to_string();

    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);

    let table = if is_spreadsheet {
        parse_spreadsheet(content, &location)?
    } else {
        parse_csv(&content, delimiter, &location)?
    };

    tracing::info!(
        input = %location,
        entries = table.entries.len(),
        skipped = table.skipped.len(),
        "credential list read"
    );
    Ok(table)
}

/// CSVのバイト列を解析する
///
/// 区切り文字が`,`でも、1行目に`;`が含まれていれば`;`を使います
/// （Excelで保存したドイツ語のCSVへの対応）。
pub fn parse_csv(
    content: &[u8],
    delimiter: u8,
    location: &str,
) -> Result<CredentialTable, AntonToolError> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    let delimiter = effective_delimiter(content, delimiter);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let rows = reader.records().map(|record| {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        Ok::<_, AntonToolError>((line, cells))
    });

    CredentialTable::from_rows(rows, location)
}

/// Excel/ODSのバイト列を解析する（最初のシートのみ）
pub fn parse_spreadsheet(
    content: Vec<u8>,
    location: &str,
) -> Result<CredentialTable, AntonToolError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(AntonToolError::parse(location, "workbook has no sheets")),
    };

    // 行番号はシート上の行（1始まり）
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let rows = range.rows().enumerate().map(|(i, cells)| {
        let values: Vec<String> = cells.iter().map(cell_to_string).collect();
        Ok::<_, AntonToolError>((first_row + i + 1, values))
    });

    CredentialTable::from_rows(rows, location)
}

fn effective_delimiter(content: &[u8], delimiter: u8) -> u8 {
    if delimiter != b',' {
        return delimiter;
    }
    let first_line = content.split(|&b| b == b'\n').next().unwrap_or_default();
    if first_line.contains(&b';') {
        tracing::debug!("header contains ';', using it as delimiter");
        b';'
    } else {
        delimiter
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // 整数値のセル（ログインコードが数値の場合など）は小数点なしで表示
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

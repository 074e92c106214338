//! Preview Module
//!
//! PDF生成前の確認用に、読み込んだアクセス情報を整列したテキスト表として出力する。
//! ウムラウトや全角文字を含む名前でも列が揃うよう、表示幅で計算します。

use unicode_width::UnicodeWidthStr;

use crate::types::CredentialEntry;

const HEADER: [&str; 5] = ["Vorname", "Nachname", "Klasse", "Referenz", "Login-Code"];

/// エントリを整列したテキスト表に変換
///
/// # 戻り値
///
/// ヘッダー行、区切り線、各エントリの行を改行で連結した文字列。
/// 各行の末尾の空白は除去されます。
///
/// # 例
///
/// ```text
/// Vorname  Nachname  Klasse  Referenz  Login-Code
/// -------  --------  ------  --------  ----------
/// Anna     Muster    5a      ID-1      ABCD-1234
/// ```
pub fn render_preview_table(entries: &[CredentialEntry]) -> String {
    let rows: Vec<[&str; 5]> = entries
        .iter()
        .map(|e| {
            [
                e.first_name.as_str(),
                e.last_name.as_str(),
                e.class.as_str(),
                e.reference.as_str(),
                e.login_code.as_str(),
            ]
        })
        .collect();

    let mut widths = HEADER.map(UnicodeWidthStr::width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let separator = widths.map(|w| "-".repeat(w));
    let separator: Vec<&str> = separator.iter().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_line(&HEADER, &widths));
    lines.push(render_line(&separator, &widths));
    for row in &rows {
        lines.push(render_line(row, &widths));
    }

    let mut table = lines.join("\n");
    table.push('\n');
    table
}

fn render_line(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let padding = width.saturating_sub(cell.width());
        line.extend(std::iter::repeat(' ').take(padding));
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(first: &str, last: &str, class: &str, code: &str) -> CredentialEntry {
        CredentialEntry {
            first_name: first.to_string(),
            last_name: last.to_string(),
            class: class.to_string(),
            login_code: code.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_preview_table() {
        let table = render_preview_table(&[entry("Anna", "Muster", "5a", "ABCD-1234")]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Vorname  Nachname  Klasse  Referenz  Login-Code");
        assert_eq!(lines[1], "-------  --------  ------  --------  ----------");
        assert_eq!(lines[2], "Anna     Muster    5a                ABCD-1234");
    }

    #[test]
    fn test_columns_align_with_umlauts() {
        let table = render_preview_table(&[
            entry("Jürgen", "Müller-Lüdenscheidt", "10b", "X"),
            entry("Bo", "Li", "5a", "Y"),
        ]);
        let lines: Vec<&str> = table.lines().collect();

        let klasse = |line: &str| {
            let byte = line.find(|c: char| c.is_ascii_digit()).unwrap();
            line[..byte].width()
        };
        assert_eq!(klasse(lines[2]), klasse(lines[3]));
        assert_eq!(klasse(lines[2]), lines[0].find("Klasse").unwrap());
    }

    #[test]
    fn test_empty_table_has_header() {
        let table = render_preview_table(&[]);
        assert_eq!(table.lines().count(), 2);
    }
}

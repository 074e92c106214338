//! Security Module
//!
//! 入力ファイルのサイズ制限と、入力データから生成するファイル名の検証を提供します。
//! CSVやExcelの値はファイル名に使われるため、パストラバーサル対策が必要です。

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::AntonToolError;

/// セキュリティ設定
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 64MB (67_108_864 bytes)
    pub max_input_file_size: u64,
    /// ファイル名の1要素の最大長（文字数）
    /// デフォルト: 80
    pub max_file_component_len: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 67_108_864, // 64MB
            max_file_component_len: 80,
        }
    }
}

/// サイズ制限付きでファイルを読み込む
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - ファイルの内容
/// * `Err(AntonToolError::SecurityViolation)` - 最大サイズを超えた場合
/// * `Err(AntonToolError::Io)` - 読み込みに失敗した場合
pub(crate) fn read_limited(path: &Path, config: &SecurityConfig) -> Result<Vec<u8>, AntonToolError> {
    let file = fs::File::open(path)?;
    let mut buffer = Vec::new();
    // 1バイト余分に読み、上限超過を検出する
    file.take(config.max_input_file_size.saturating_add(1))
        .read_to_end(&mut buffer)?;

    if buffer.len() as u64 > config.max_input_file_size {
        return Err(AntonToolError::SecurityViolation(format!(
            "Input file '{}' exceeds maximum size (max: {} bytes)",
            path.display(),
            config.max_input_file_size
        )));
    }

    Ok(buffer)
}

/// 入力値をファイル名の1要素として安全な文字列に変換
///
/// パス区切り文字（`/`, `\`）、Windowsの予約文字、制御文字を`-`に置換し、
/// `..`を取り除き、先頭・末尾の`.`と`_`を除去します。`..`だけの値は空文字列になります。
pub(crate) fn sanitize_file_component(raw: &str, config: &SecurityConfig) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    let replaced = replaced.replace("..", "");

    replaced
        .trim_matches(|c: char| c == '.' || c == '_')
        .chars()
        .take(config.max_file_component_len)
        .collect()
}

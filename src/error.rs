//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! 実行全体を中断するエラー（`AntonToolError`）と、レコード単位でスキップ
//! レポートに集計されるエラー（`ValidationError`）を区別する。

use thiserror::Error;

/// anton-toolクレート全体で使用するエラー型
///
/// このエラー型は実行単位（1回の変換、1回のPDF生成）を中断するエラーを表します。
/// レコード単位の問題は`ValidationError`としてレポートに記録され、
/// 実行は中断されません。
///
/// # エラーの種類
///
/// - `Io`: 入力ファイルの読み込み失敗、出力先への書き込み失敗
/// - `Parse`: 入力ファイルの構造が不正（XMLの破損、想定外のルート要素など）
/// - `Csv`: CSVの読み書き中に発生したエラー
/// - `Spreadsheet`: Excelファイルの解析エラー（calamine由来）
/// - `Pdf`: PDFのシリアライズに失敗したエラー
/// - `Config`: ビルダー設定の検証に失敗したエラー
/// - `SecurityViolation`: 入力サイズ制限などに違反したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use anton_tool::AntonToolError;
/// use std::fs::File;
///
/// fn open_export(path: &str) -> Result<(), AntonToolError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum AntonToolError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイルの解析エラー
    ///
    /// `location`には要素パスとバイト位置（分かる場合）が入ります。
    #[error("Failed to parse input at {location}: {message}")]
    Parse {
        /// エラーが発生した位置（例: `enterprise/person[3] @ byte 1024`）
        location: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// CSVの読み書きエラー
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excelファイルの解析エラー
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// PDFの生成エラー
    #[error("PDF error: {0}")]
    Pdf(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時などに無効な設定が検出された場合に発生します。
    ///
    /// ```rust,no_run
    /// use anton_tool::{ConverterBuilder, AntonToolError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_delimiter(b'"')  // 引用符は区切り文字にできない
    ///     .build();
    ///
    /// if let Err(AntonToolError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl AntonToolError {
    /// 位置情報付きの解析エラーを生成する
    pub(crate) fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        AntonToolError::Parse {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// レコード単位の検証エラー
///
/// 1件のレコード（XMLのperson要素、CSVの1行）が出力に使えない理由を表します。
/// 実行は中断されず、スキップレポートに記録されます。
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum ValidationError {
    /// 必須フィールドが空または存在しない
    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),

    /// 生徒・教員のいずれの役割にも該当しない
    #[error("no student or teacher role")]
    UnknownRole,

    /// テンプレートへの差し込みに失敗した（QRコードの生成失敗など）
    #[error("template fill failed: {0}")]
    Template(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: AntonToolError = io_err.into();

        match error {
            AntonToolError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_parse_error_display_contains_location() {
        let error = AntonToolError::parse("enterprise/person[2] @ byte 311", "unexpected end tag");
        let msg = error.to_string();
        assert!(msg.contains("enterprise/person[2]"));
        assert!(msg.contains("unexpected end tag"));
    }

    #[test]
    fn test_spreadsheet_error_conversion() {
        let error: AntonToolError = calamine::Error::Msg("Corrupted file").into();
        assert!(error.to_string().starts_with("Failed to read spreadsheet"));
    }

    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<(), AntonToolError> {
            let _file = std::fs::File::open("nonexistent_schild_export.xml")?;
            Ok(())
        }

        assert!(matches!(io_operation(), Err(AntonToolError::Io(_))));
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::MissingField("Referenz").to_string(),
            "missing mandatory field 'Referenz'"
        );
        assert_eq!(
            ValidationError::UnknownRole.to_string(),
            "no student or teacher role"
        );
    }

    #[test]
    fn test_all_error_formats() {
        assert!(AntonToolError::Config("x".into())
            .to_string()
            .starts_with("Configuration error"));
        assert!(AntonToolError::Pdf("x".into())
            .to_string()
            .starts_with("PDF error"));
        assert!(AntonToolError::SecurityViolation("x".into())
            .to_string()
            .starts_with("Security violation"));
    }
}

//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};

/// SchILDのpersonレコードの役割
///
/// 役割ごとに固定のマッピング関数が選択されます（`mapping`モジュール参照）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// 生徒（ANTON_Schueler.csvへ出力）
    Student,

    /// 教員・職員（ANTON_Lehrkraefte.csvへ出力）
    Teacher,
}

/// PDFの出力方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PdfMode {
    /// 1行ごとに1つのPDFファイル
    Individual,

    /// 全行を1つのPDF（1ページ1名）にまとめる
    Consolidated,

    /// クラスごとに1つのPDFにまとめる
    ///
    /// クラス未設定の教員は`Lehrkraefte`としてまとめられます。
    PerClass,
}

/// PDFの対象グループ
///
/// 文面の敬称（du / Sie）を決定します。`Teachers`の場合は全員に丁寧な文面を使用し、
/// `Students`の場合はAnrede列が設定されている行のみ丁寧な文面になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchoolGroup {
    /// 生徒（設定値 `1`）
    Students,

    /// 教員（設定値 `2`）
    Teachers,
}

/// PDFのページサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 x 297 mm
    A4,

    /// 215.9 x 279.4 mm
    Letter,
}

impl PageSize {
    /// ページの幅と高さ（mm）
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

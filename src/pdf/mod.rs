//! PDF Module
//!
//! アクセス情報（ログインコード）からドイツ語の案内文書のPDFを生成するモジュール。
//!
//! - `letter`: 文面の組み立て（du / Sie）
//! - `render`: printpdfとqrcodeによる描画
//! - `generator`: 出力方式（個別 / 1ファイル / クラスごと）とファイル名の決定

mod generator;
mod letter;
mod render;

pub use generator::{GenerationReport, PdfGenerator};
pub use letter::{compose_letter, Address, Letter, LetterOptions};

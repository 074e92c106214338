//! SchILD Module
//!
//! SchILD NRWのXMLエクスポート（IMS Enterprise形式）の解析。
//! 想定する構造は`SchemaMapping`として明示的に定義されます。

mod reader;
mod schema;

pub use reader::{parse_document, SchildDocument};
pub use schema::{SchemaMapping, SourceField};

//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::Serialize;

use crate::api::Role;
use crate::error::ValidationError;

/// SchILDエクスポート内の1件のperson要素
///
/// 解析後は不変で、マッピング後に破棄されます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    /// ドキュメント内での位置（0始まり）
    pub index: usize,
    /// `sourcedid/id`
    pub reference: String,
    /// `name/n/given`
    pub given: String,
    /// `name/n/family`
    pub family: String,
    /// `name/fn`
    pub full_name: String,
    /// `email`
    pub email: String,
    /// すべての`institutionroletype`属性値（出現順）
    pub roles: Vec<String>,
}

/// membership要素（グループとそのメンバー）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    /// グループID（例: `ID-123-klasse-5A`）
    pub group_id: String,
    /// メンバーのperson ID
    pub members: Vec<String>,
}

/// 生徒用CSVの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub reference: String,
}

impl StudentRow {
    /// CSVヘッダー（列順固定）
    pub const HEADER: [&'static str; 4] = ["Vorname", "Nachname", "Klasse", "Referenz"];

    /// ヘッダーと同じ順序のフィールド
    pub fn fields(&self) -> [&str; 4] {
        [
            &self.first_name,
            &self.last_name,
            &self.class,
            &self.reference,
        ]
    }
}

/// 教員用CSVの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherRow {
    pub salutation: String,
    pub first_name: String,
    pub last_name: String,
    pub reference: String,
}

impl TeacherRow {
    /// CSVヘッダー（列順固定）
    pub const HEADER: [&'static str; 4] = ["Anrede", "Vorname", "Nachname", "Referenz"];

    /// ヘッダーと同じ順序のフィールド
    pub fn fields(&self) -> [&str; 4] {
        [
            &self.salutation,
            &self.first_name,
            &self.last_name,
            &self.reference,
        ]
    }
}

/// マッピング済みの出力行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRow {
    Student(StudentRow),
    Teacher(TeacherRow),
}

impl TargetRow {
    /// 行の役割
    pub fn role(&self) -> Role {
        match self {
            TargetRow::Student(_) => Role::Student,
            TargetRow::Teacher(_) => Role::Teacher,
        }
    }

    /// 行の識別子（Referenz）
    pub fn reference(&self) -> &str {
        match self {
            TargetRow::Student(row) => &row.reference,
            TargetRow::Teacher(row) => &row.reference,
        }
    }
}

/// PDF生成の入力1行（アクセス情報）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialEntry {
    /// 入力ファイル内の行番号（ヘッダーを1行目とする1始まり）
    pub line: usize,
    pub salutation: String,
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub reference: String,
    pub login_code: String,
}

impl CredentialEntry {
    /// ファイル名に使う識別子（Referenz、なければログインコード）
    pub fn identifier(&self) -> &str {
        if self.reference.is_empty() {
            &self.login_code
        } else {
            &self.reference
        }
    }

    /// 最初の名（複数の名がある場合は先頭のみ）
    pub fn first_given_name(&self) -> &str {
        self.first_name.split_whitespace().next().unwrap_or("")
    }

    /// 挨拶などで使う表示名（`Anna Muster`）
    pub fn display_name(&self) -> String {
        let first = self.first_given_name();
        match (first.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", first, self.last_name),
            (false, true) => first.to_string(),
            _ => self.last_name.clone(),
        }
    }
}

/// スキップされたレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// XMLならperson要素の位置（0始まり）、CSV/Excelなら行番号（1始まり）
    pub position: usize,
    /// 分かる場合の識別子
    pub reference: Option<String>,
    /// スキップ理由
    pub reason: ValidationError,
}

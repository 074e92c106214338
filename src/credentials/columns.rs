//! ヘッダー行の解釈と1行分のCredentialEntryの構築

use crate::error::{AntonToolError, ValidationError};
use crate::mapping::normalize_name;
use crate::types::CredentialEntry;

/// ログインコード列として認識するヘッダー名（小文字）
const CODE_ALIASES: [&str; 5] = ["anmelde-code", "login-code", "logincode", "login_code", "code"];

/// ヘッダー名 → 列インデックス
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    salutation: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    class: Option<usize>,
    reference: Option<usize>,
    login_code: Option<usize>,
}

impl ColumnMap {
    /// ヘッダー行から列の位置を決定する
    ///
    /// 大文字小文字と前後の空白は無視します。同じ列名が複数ある場合は最初の列を使います。
    ///
    /// # エラー
    ///
    /// 既知の列（Vorname, Nachname, Klasse, Referenz, ログインコード）が1つもない場合は
    /// `AntonToolError::Parse`を返します。
    pub fn from_header<S: AsRef<str>>(header: &[S], location: &str) -> Result<Self, AntonToolError> {
        let normalized: Vec<String> = header
            .iter()
            .map(|h| h.as_ref().trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);

        let columns = Self {
            salutation: find("anrede"),
            first_name: find("vorname"),
            last_name: find("nachname"),
            class: find("klasse"),
            reference: find("referenz"),
            login_code: CODE_ALIASES.iter().find_map(|&alias| find(alias)),
        };

        if columns.first_name.is_none()
            && columns.last_name.is_none()
            && columns.class.is_none()
            && columns.reference.is_none()
            && columns.login_code.is_none()
        {
            return Err(AntonToolError::parse(
                format!("{} line 1", location),
                format!("no known column in header: {}", normalized.join(", ")),
            ));
        }

        Ok(columns)
    }

    /// データ行からエントリを構築する
    ///
    /// # 戻り値
    ///
    /// * `None` - 空行（すべてのセルが空）
    /// * `Some(Ok(entry))` - 有効な行
    /// * `Some(Err((reference, reason)))` - 必須フィールドが欠けている行
    pub fn entry<S: AsRef<str>>(
        &self,
        line: usize,
        row: &[S],
    ) -> Option<Result<CredentialEntry, (Option<String>, ValidationError)>> {
        if row.iter().all(|cell| cell.as_ref().trim().is_empty()) {
            return None;
        }

        let cell = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .map(|value| value.as_ref().trim().to_string())
                .unwrap_or_default()
        };

        let entry = CredentialEntry {
            line,
            salutation: cell(self.salutation),
            first_name: normalize_name(&cell(self.first_name)),
            last_name: normalize_name(&cell(self.last_name)),
            class: cell(self.class),
            reference: cell(self.reference),
            login_code: cell(self.login_code),
        };

        let reason = if entry.first_name.is_empty() && entry.last_name.is_empty() {
            Some(ValidationError::MissingField("Name"))
        } else if entry.login_code.is_empty() {
            Some(ValidationError::MissingField("Code"))
        } else {
            None
        };

        Some(match reason {
            Some(reason) => {
                let identifier = entry.identifier();
                let reference = (!identifier.is_empty()).then(|| identifier.to_string());
                Err((reference, reason))
            }
            None => Ok(entry),
        })
    }
}

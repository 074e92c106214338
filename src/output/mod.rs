//! Output Module
//!
//! 出力ファイル（CSV, PDF）の書き込みとファイル名の決定を提供するモジュール。

mod csv_writer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use csv_writer::{write_table, CsvOptions};

/// 出力ファイル名のタイムスタンプ形式
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// 出力ファイル名の接頭辞（タイムスタンプ）
///
/// 1回の実行で1度だけ生成し、同じ実行のすべてのファイルで共有します。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileNamePrefix(Option<String>);

impl FileNamePrefix {
    /// `enabled`がtrueなら現在時刻のタイムスタンプを接頭辞にする
    pub fn now(enabled: bool) -> Self {
        if enabled {
            Self(Some(chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()))
        } else {
            Self(None)
        }
    }

    /// 接頭辞付きのファイル名
    pub fn apply(&self, file_name: &str) -> String {
        match &self.0 {
            Some(stamp) => format!("{}_{}", stamp, file_name),
            None => file_name.to_string(),
        }
    }
}

/// 出力フォルダ内で重複しないファイル名を割り当てる
///
/// 同じ名前が2回目以降に要求された場合は`_2`, `_3`, …を付けます。
#[derive(Debug, Default)]
pub(crate) struct UniqueFileNames {
    used: HashSet<String>,
}

impl UniqueFileNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// `stem`と`extension`から重複しないパスを返す
    pub fn allocate(&mut self, dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let mut candidate = format!("{}.{}", stem, extension);
        let mut counter = 2;
        while !self.used.insert(candidate.to_lowercase()) {
            candidate = format!("{}_{}.{}", stem, counter, extension);
            counter += 1;
        }
        dir.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_disabled() {
        assert_eq!(FileNamePrefix::now(false).apply("a.csv"), "a.csv");
    }

    #[test]
    fn test_prefix_enabled() {
        let name = FileNamePrefix::now(true).apply("a.csv");
        // 2025-01-01_12-00-00_a.csv
        assert_eq!(name.len(), 19 + 1 + "a.csv".len());
        assert!(name.ends_with("_a.csv"));
    }

    #[test]
    fn test_unique_file_names() {
        let mut names = UniqueFileNames::new();
        let dir = Path::new("/out");
        assert_eq!(names.allocate(dir, "5a_Muster", "pdf"), dir.join("5a_Muster.pdf"));
        assert_eq!(names.allocate(dir, "5a_Muster", "pdf"), dir.join("5a_Muster_2.pdf"));
        assert_eq!(names.allocate(dir, "5A_MUSTER", "pdf"), dir.join("5A_MUSTER_3.pdf"));
        assert_eq!(names.allocate(dir, "5b_Muster", "pdf"), dir.join("5b_Muster.pdf"));
    }
}

//! PDF生成のオーケストレーション（出力方式、ファイル名、進捗）

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::letter::{compose_letter, LetterOptions};
use super::render::{PdfWriter, QrMatrix};
use crate::api::{PageSize, PdfMode, SchoolGroup};
use crate::config::Config;
use crate::credentials::{read_credentials_with, CredentialTable};
use crate::error::AntonToolError;
use crate::output::{FileNamePrefix, UniqueFileNames};
use crate::security::{sanitize_file_component, SecurityConfig};
use crate::types::{CredentialEntry, SkippedRecord};

const CONSOLIDATED_STEM: &str = "Nutzerliste";
const TEACHER_GROUP: &str = "Lehrkraefte";
const CLASSLESS_GROUP: &str = "ohne_Klasse";

/// 1回のPDF生成の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// 書き込んだPDFファイル（書き込み順）
    pub files: Vec<PathBuf>,
    /// 描画した人数（ページ数）
    pub rendered: usize,
    /// スキップされた行
    pub skipped: Vec<SkippedRecord>,
}

impl GenerationReport {
    /// スキップされた行の件数
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// JSON文字列に変換（UIへの受け渡し用）
    pub fn to_json(&self) -> Result<String, AntonToolError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AntonToolError::Config(format!("JSON serialization error: {}", e)))
    }
}

/// アクセス情報のPDFを生成する
///
/// # 使用例
///
/// ```rust,no_run
/// use anton_tool::{Config, PdfGenerator};
///
/// # fn main() -> Result<(), anton_tool::AntonToolError> {
/// let config = Config::load("config.xml")?;
/// let report = PdfGenerator::new(&config).generate()?;
/// println!("{} PDF-Dateien", report.files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PdfGenerator {
    input: PathBuf,
    output_dir: PathBuf,
    delimiter: u8,
    mode: PdfMode,
    page_size: PageSize,
    file_timestamp: bool,
    letter: LetterOptions,
    security: SecurityConfig,
}

impl PdfGenerator {
    /// 設定から生成器を作成する
    ///
    /// 入力ファイル（`csv_file`）と出力フォルダ（`pdf_outputpath`）は
    /// 設定ファイルのディレクトリを基準に解決されます。
    pub fn new(config: &Config) -> Self {
        Self {
            input: config.resolve_path(&config.csv_file),
            output_dir: config.resolve_path(&config.pdf_output_dir),
            delimiter: config.csv_delimiter,
            mode: config.pdf_mode,
            page_size: config.page_size,
            file_timestamp: config.file_timestamp,
            letter: LetterOptions {
                branding: config.branding.clone(),
                link: config.pdf_anton_link.clone(),
                school_group: config.school_group,
                support_contact: config.support_contact.clone(),
            },
            security: SecurityConfig::default(),
        }
    }

    /// 入力ファイルを変更する
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = path.into();
        self
    }

    /// 出力フォルダを変更する
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// 出力方式を変更する
    pub fn with_mode(mut self, mode: PdfMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 入力ファイルを読み込む（プレビュー用）
    pub fn load_entries(&self) -> Result<CredentialTable, AntonToolError> {
        read_credentials_with(&self.input, self.delimiter, &self.security)
    }

    /// 入力ファイルを読み込み、PDFを生成する
    pub fn generate(&self) -> Result<GenerationReport, AntonToolError> {
        self.generate_with_progress(|_, _| {})
    }

    /// 進捗コールバック付きでPDFを生成する
    ///
    /// `progress(done, total)`は1名を処理するごとに呼ばれます（スキップした行も含む）。
    pub fn generate_with_progress<F>(&self, progress: F) -> Result<GenerationReport, AntonToolError>
    where
        F: FnMut(usize, usize),
    {
        let table = self.load_entries()?;
        self.render_table(table, progress)
    }

    /// 読み込み済みのエントリからPDFを生成する
    ///
    /// # 処理フロー
    ///
    /// 1. 出力フォルダの作成
    /// 2. 出力方式に応じたグループ分け（個別 / 1ファイル / クラスごと）
    /// 3. 各グループのPDFの描画と書き込み
    ///
    /// QRコードを作れない行はスキップして続行します。
    /// 書き込みに失敗した場合は処理全体を中断します。
    pub fn render_table<F>(
        &self,
        table: CredentialTable,
        mut progress: F,
    ) -> Result<GenerationReport, AntonToolError>
    where
        F: FnMut(usize, usize),
    {
        fs::create_dir_all(&self.output_dir)?;

        let CredentialTable { entries, skipped } = table;
        let mut report = GenerationReport {
            skipped,
            ..GenerationReport::default()
        };
        let mut tracker = ProgressTracker::new(entries.len());
        let mut names = UniqueFileNames::new();
        let prefix = FileNamePrefix::now(self.file_timestamp);

        for (stem, group) in self.group_entries(&entries) {
            let mut writer = PdfWriter::new(&self.letter_title(&stem), self.page_size)?;

            for entry in group {
                let letter = compose_letter(entry, &self.letter);
                match QrMatrix::encode(&letter.code) {
                    Ok(qr) => writer.add_letter(&letter, &qr),
                    Err(reason) => {
                        tracing::warn!(line = entry.line, %reason, "skipping credential row");
                        report.skipped.push(SkippedRecord {
                            position: entry.line,
                            reference: Some(entry.identifier().to_string()),
                            reason,
                        });
                    }
                }
                tracker.advance(&mut progress);
            }

            if writer.page_count() == 0 {
                continue;
            }

            let path = names.allocate(&self.output_dir, &prefix.apply(&stem), "pdf");
            report.rendered += writer.page_count();
            let bytes = writer.finish()?;
            fs::write(&path, bytes)?;
            tracing::debug!(file = %path.display(), "PDF written");
            report.files.push(path);
        }

        report.skipped.sort_by_key(|s| s.position);
        tracing::info!(
            files = report.files.len(),
            rendered = report.rendered,
            skipped = report.skip_count(),
            output = %self.output_dir.display(),
            "PDF generation finished"
        );
        Ok(report)
    }

    /// (ファイル名の幹, エントリ)のグループ
    fn group_entries<'a>(
        &self,
        entries: &'a [CredentialEntry],
    ) -> Vec<(String, Vec<&'a CredentialEntry>)> {
        match self.mode {
            PdfMode::Consolidated => {
                if entries.is_empty() {
                    Vec::new()
                } else {
                    vec![(CONSOLIDATED_STEM.to_string(), entries.iter().collect())]
                }
            }
            PdfMode::PerClass => {
                let mut classes: BTreeMap<String, Vec<&CredentialEntry>> = BTreeMap::new();
                for entry in entries {
                    classes.entry(self.class_group(entry)).or_default().push(entry);
                }
                classes
                    .into_iter()
                    .map(|(class, group)| {
                        let stem = if class == TEACHER_GROUP {
                            format!("{}_Zugangsdaten", TEACHER_GROUP)
                        } else {
                            format!("{}_ANTON-Zugangsdaten", self.component(&class))
                        };
                        (stem, group)
                    })
                    .collect()
            }
            PdfMode::Individual => entries
                .iter()
                .map(|entry| (self.individual_stem(entry), vec![entry]))
                .collect(),
        }
    }

    /// クラスごとのグループ名
    ///
    /// クラスのない行は、対象グループが教員かAnredeがあれば`Lehrkraefte`、
    /// それ以外は`ohne_Klasse`になります。
    fn class_group(&self, entry: &CredentialEntry) -> String {
        let class = entry.class.trim();
        if !class.is_empty() {
            class.to_string()
        } else if self.letter.school_group == SchoolGroup::Teachers
            || !entry.salutation.trim().is_empty()
        {
            TEACHER_GROUP.to_string()
        } else {
            CLASSLESS_GROUP.to_string()
        }
    }

    /// `<Klasse>_<Nachname>_<Vorname>_<識別子>`（空の要素は省略）
    fn individual_stem(&self, entry: &CredentialEntry) -> String {
        let parts: Vec<String> = [
            entry.class.as_str(),
            entry.last_name.as_str(),
            entry.first_given_name(),
            entry.identifier(),
        ]
        .iter()
        .map(|part| self.component(part))
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            format!("Zugangsdaten_{}", entry.line)
        } else {
            parts.join("_")
        }
    }

    fn component(&self, raw: &str) -> String {
        sanitize_file_component(raw, &self.security)
    }

    fn letter_title(&self, stem: &str) -> String {
        format!("{} - {}", self.letter.branding.trim(), stem)
    }
}

/// 進捗の通知（10%ごとにログ出力）
struct ProgressTracker {
    total: usize,
    done: usize,
    next_percent: usize,
}

impl ProgressTracker {
    fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            next_percent: 10,
        }
    }

    fn advance<F: FnMut(usize, usize)>(&mut self, progress: &mut F) {
        self.done += 1;
        progress(self.done, self.total);

        let percent = self.done * 100 / self.total.max(1);
        if percent >= self.next_percent {
            tracing::info!(done = self.done, total = self.total, "progress {}%", percent);
            self.next_percent = (percent / 10 + 1) * 10;
        }
    }
}

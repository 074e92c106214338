//! Builder Module
//!
//! Fluent Builder APIを提供し、SchILD→ANTON変換用の`Converter`インスタンスを
//! 段階的に構築する。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{is_valid_delimiter, Config};
use crate::error::AntonToolError;
use crate::mapping::{build_class_lookup, map_record};
use crate::output::{write_table, CsvOptions, FileNamePrefix};
use crate::schild::{parse_document, SchemaMapping};
use crate::security::{read_limited, SecurityConfig};
use crate::types::{SkippedRecord, StudentRow, TargetRow, TeacherRow};

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 入力XMLの構造定義
    pub schema: SchemaMapping,

    /// CSV出力オプション
    pub csv: CsvOptions,

    /// 出力フォルダ
    pub output_dir: PathBuf,

    /// 生徒用CSVのファイル名
    pub students_file_name: String,

    /// 教員用CSVのファイル名
    pub teachers_file_name: String,

    /// ファイル名にタイムスタンプを付けるか
    pub file_timestamp: bool,

    /// 入力サイズ制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let defaults = Config::default();
        Self {
            schema: SchemaMapping::default(),
            csv: CsvOptions::default(),
            output_dir: PathBuf::from(defaults.anton_output_dir),
            students_file_name: defaults.students_file_name,
            teachers_file_name: defaults.teachers_file_name,
            file_timestamp: false,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみを
/// オーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use anton_tool::ConverterBuilder;
///
/// # fn main() -> Result<(), anton_tool::AntonToolError> {
/// let converter = ConverterBuilder::new()
///     .with_delimiter(b',')
///     .with_output_dir("output")
///     .build()?;
/// let report = converter.convert_file("SchILD_Export.xml")?;
/// println!("{} Schüler:innen, {} übersprungen", report.students, report.skip_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 区切り文字: `;`
    /// - UTF-8 BOM: あり
    /// - 出力フォルダ: `output`
    /// - ファイル名: `ANTON_Schueler.csv`, `ANTON_Lehrkraefte.csv`
    /// - タイムスタンプ: なし
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// アプリケーション設定からビルダーを生成する
    ///
    /// 出力フォルダは設定ファイルのディレクトリを基準に解決されます。
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_delimiter(config.csv_delimiter)
            .with_bom(config.csv_bom)
            .with_output_dir(config.resolve_path(&config.anton_output_dir))
            .with_file_names(&config.students_file_name, &config.teachers_file_name)
            .with_timestamp(config.file_timestamp)
    }

    /// CSVの区切り文字を設定する
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.config.csv.delimiter = delimiter;
        self
    }

    /// UTF-8 BOMの有無を設定する
    pub fn with_bom(mut self, bom: bool) -> Self {
        self.config.csv.bom = bom;
        self
    }

    /// 出力フォルダを設定する
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// 出力ファイル名を設定する
    pub fn with_file_names(mut self, students: &str, teachers: &str) -> Self {
        self.config.students_file_name = students.to_string();
        self.config.teachers_file_name = teachers.to_string();
        self
    }

    /// ファイル名にタイムスタンプ（`%Y-%m-%d_%H-%M-%S_`）を付けるか
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.config.file_timestamp = enabled;
        self
    }

    /// 入力XMLの構造定義を設定する
    pub fn with_schema(mut self, schema: SchemaMapping) -> Self {
        self.config.schema = schema;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を設定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # エラー
    ///
    /// * `AntonToolError::Config` - 以下の場合
    ///   * 区切り文字が引用符、改行、ASCII以外の場合
    ///   * ファイル名が空、パス区切り文字を含む、または2つのファイル名が同じ場合
    pub fn build(self) -> Result<Converter, AntonToolError> {
        // 1. 区切り文字の検証
        if !is_valid_delimiter(self.config.csv.delimiter) {
            return Err(AntonToolError::Config(format!(
                "Invalid CSV delimiter: {:?}",
                self.config.csv.delimiter as char
            )));
        }

        // 2. ファイル名の検証
        for name in [
            &self.config.students_file_name,
            &self.config.teachers_file_name,
        ] {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(AntonToolError::Config(format!(
                    "Invalid output file name: '{}'",
                    name
                )));
            }
        }
        if self
            .config
            .students_file_name
            .eq_ignore_ascii_case(&self.config.teachers_file_name)
        {
            return Err(AntonToolError::Config(format!(
                "Student and teacher files must differ: '{}'",
                self.config.students_file_name
            )));
        }

        // 3. 入力サイズ制限の検証
        if self.config.security.max_input_file_size == 0 {
            return Err(AntonToolError::Config(
                "Maximum input size must be greater than 0".to_string(),
            ));
        }

        Ok(Converter::new(self.config))
    }
}

/// マッピング結果（メモリ上）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOutcome {
    /// 生徒の行（ドキュメント順）
    pub students: Vec<StudentRow>,
    /// 教員の行（ドキュメント順）
    pub teachers: Vec<TeacherRow>,
    /// スキップされたレコード
    pub skipped: Vec<SkippedRecord>,
}

impl ConversionOutcome {
    /// 生徒用CSVを書き込む
    pub fn write_students<W: Write>(
        &self,
        writer: W,
        options: CsvOptions,
    ) -> Result<usize, AntonToolError> {
        write_table(
            writer,
            StudentRow::HEADER,
            self.students.iter().map(StudentRow::fields),
            options,
        )
    }

    /// 教員用CSVを書き込む
    pub fn write_teachers<W: Write>(
        &self,
        writer: W,
        options: CsvOptions,
    ) -> Result<usize, AntonToolError> {
        write_table(
            writer,
            TeacherRow::HEADER,
            self.teachers.iter().map(TeacherRow::fields),
            options,
        )
    }
}

/// 1回の変換の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// 書き込んだ生徒用CSV
    pub students_file: PathBuf,
    /// 書き込んだ教員用CSV
    pub teachers_file: PathBuf,
    /// 生徒の行数
    pub students: usize,
    /// 教員の行数
    pub teachers: usize,
    /// スキップされたレコード
    pub skipped: Vec<SkippedRecord>,
}

impl ConversionReport {
    /// スキップされたレコードの件数
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// JSON文字列に変換（UIへの受け渡し用）
    pub fn to_json(&self) -> Result<String, AntonToolError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AntonToolError::Config(format!("JSON serialization error: {}", e)))
    }
}

/// SchILD→ANTON変換のファサード
///
/// `ConverterBuilder`で構築された設定に基づいて変換処理を実行します。
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// CSV出力オプション
    pub fn csv_options(&self) -> CsvOptions {
        self.config.csv
    }

    /// XMLバイト列を解析し、出力行に変換する（ファイルは書き込まない）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConversionOutcome)` - 解析に成功した場合（不正なレコードは`skipped`に入る）
    /// * `Err(AntonToolError::Parse)` - XMLが不正な場合
    pub fn map_document(&self, content: &[u8]) -> Result<ConversionOutcome, AntonToolError> {
        let document = parse_document(content, &self.config.schema)?;
        let classes = build_class_lookup(&document.memberships);

        let mut outcome = ConversionOutcome::default();
        for record in &document.persons {
            match map_record(record, &self.config.schema, &classes) {
                Ok(row) => {
                    tracing::debug!(
                        person = record.index + 1,
                        reference = row.reference(),
                        role = ?row.role(),
                        "mapped SchILD record"
                    );
                    match row {
                        TargetRow::Student(row) => outcome.students.push(row),
                        TargetRow::Teacher(row) => outcome.teachers.push(row),
                    }
                }
                Err(reason) => {
                    let reference = Some(record.reference.trim())
                        .filter(|r| !r.is_empty())
                        .map(str::to_string);
                    tracing::warn!(
                        person = record.index + 1,
                        reference = reference.as_deref().unwrap_or(""),
                        %reason,
                        "skipping SchILD record"
                    );
                    outcome.skipped.push(SkippedRecord {
                        position: record.index,
                        reference,
                        reason,
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// SchILDのXMLファイルを変換し、2つのCSVファイルを書き込む
    ///
    /// 既存の同名ファイルは上書きされます。
    ///
    /// # 処理フロー
    ///
    /// 1. 入力ファイルの読み込み（サイズ制限あり）
    /// 2. XMLの解析とマッピング
    /// 3. 出力フォルダの作成
    /// 4. 生徒用・教員用CSVの書き込み
    pub fn convert_file(&self, xml_path: impl AsRef<Path>) -> Result<ConversionReport, AntonToolError> {
        let xml_path = xml_path.as_ref();
        tracing::info!(input = %xml_path.display(), "converting SchILD export");

        let content = read_limited(xml_path, &self.config.security)?;
        let outcome = self.map_document(&content)?;
        self.write_outcome(&outcome)
    }

    /// マッピング結果を出力フォルダに書き込む
    pub fn write_outcome(&self, outcome: &ConversionOutcome) -> Result<ConversionReport, AntonToolError> {
        fs::create_dir_all(&self.config.output_dir)?;

        let prefix = FileNamePrefix::now(self.config.file_timestamp);
        let students_file = self
            .config
            .output_dir
            .join(prefix.apply(&self.config.students_file_name));
        let teachers_file = self
            .config
            .output_dir
            .join(prefix.apply(&self.config.teachers_file_name));

        let students = write_file(&students_file, |w| outcome.write_students(w, self.config.csv))?;
        let teachers = write_file(&teachers_file, |w| outcome.write_teachers(w, self.config.csv))?;

        let report = ConversionReport {
            students_file,
            teachers_file,
            students,
            teachers,
            skipped: outcome.skipped.clone(),
        };

        tracing::info!(
            students = report.students,
            teachers = report.teachers,
            skipped = report.skip_count(),
            output = %self.config.output_dir.display(),
            "conversion finished"
        );

        Ok(report)
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<usize, AntonToolError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<usize, AntonToolError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write(&mut writer)?;
    writer.flush()?;
    Ok(count)
}

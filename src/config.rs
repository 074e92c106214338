//! Config Store Module
//!
//! 設定ドキュメント（フラットなXML `<config><key>value</key>…</config>`）の
//! 読み込みと保存を行うモジュール。
//!
//! - 存在しないキーは黙ってデフォルト値になる
//! - 不正な値は警告ログを出してデフォルト値になる
//! - 未知のキーは保存時にそのまま書き戻される

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::api::{PageSize, PdfMode, SchoolGroup};
use crate::error::AntonToolError;

const DEFAULT_ANTON_OUTPUT: &str = "output";
const DEFAULT_STUDENTS_FILE: &str = "ANTON_Schueler.csv";
const DEFAULT_TEACHERS_FILE: &str = "ANTON_Lehrkraefte.csv";
const DEFAULT_PDF_OUTPUT: &str = "pdf-files";
const DEFAULT_ANTON_LINK: &str = "https://www.anton.app";
const DEFAULT_BRANDING: &str = "ANTON";
const DEFAULT_DELIMITER: u8 = b';';

/// アプリケーション設定
///
/// 起動時に読み込まれ、各パイプラインに明示的に渡されます。
/// グローバル状態としては保持しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SchILDのXMLエクスポート（`anton_xml_file`）
    pub anton_xml_file: String,
    /// CSV出力フォルダ（`anton_outputpath`）
    pub anton_output_dir: String,
    /// 生徒用CSVのファイル名（`anton_students_file`）
    pub students_file_name: String,
    /// 教員用CSVのファイル名（`anton_teachers_file`）
    pub teachers_file_name: String,
    /// PDF生成の入力ファイル（`csv_file`）
    pub csv_file: String,
    /// CSV区切り文字（`csv_delimiter`）
    pub csv_delimiter: u8,
    /// UTF-8 BOMを書き込むか（`csv_bom`）
    pub csv_bom: bool,
    /// 出力ファイル名にタイムスタンプを付けるか（`file_timestamp`）
    pub file_timestamp: bool,
    /// PDF出力フォルダ（`pdf_outputpath`）
    pub pdf_output_dir: String,
    /// PDFに記載するリンク（`pdf_antonlink`）
    pub pdf_anton_link: String,
    /// PDFの出力方式（`pdf_einzeln` / `pdf_onedoc` / `pdf_perclass`）
    pub pdf_mode: PdfMode,
    /// 対象グループ（`pdf_schoolgroup`）
    pub school_group: SchoolGroup,
    /// ページサイズ（`pdf_pagesize`）
    pub page_size: PageSize,
    /// 文面に使うプラットフォーム名（`pdf_branding`）
    pub branding: String,
    /// サポート連絡先（`support_contact`）
    pub support_contact: String,
    /// 未知のキー（ドキュメント順）
    pub(crate) extra: Vec<(String, String)>,
    /// 相対パスの基準ディレクトリ（設定ファイルのあるディレクトリ）
    pub(crate) base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anton_xml_file: String::new(),
            anton_output_dir: DEFAULT_ANTON_OUTPUT.to_string(),
            students_file_name: DEFAULT_STUDENTS_FILE.to_string(),
            teachers_file_name: DEFAULT_TEACHERS_FILE.to_string(),
            csv_file: String::new(),
            csv_delimiter: DEFAULT_DELIMITER,
            csv_bom: true,
            file_timestamp: false,
            pdf_output_dir: DEFAULT_PDF_OUTPUT.to_string(),
            pdf_anton_link: DEFAULT_ANTON_LINK.to_string(),
            pdf_mode: PdfMode::Individual,
            school_group: SchoolGroup::Students,
            page_size: PageSize::A4,
            branding: DEFAULT_BRANDING.to_string(),
            support_contact: String::new(),
            extra: Vec::new(),
            base_dir: None,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む
    ///
    /// 相対パスの設定値は、設定ファイルのあるディレクトリを基準に解決されます
    /// （`resolve_path`参照）。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Config)` - 読み込みに成功した場合
    /// * `Err(AntonToolError::Io)` - ファイルが読めない場合
    /// * `Err(AntonToolError::Parse)` - XMLが不正な場合
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AntonToolError> {
        let path = path.as_ref();
        let content = fs::read(path)?;
        let mut config = Self::from_xml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// 設定ファイルを読み込む（ファイルが存在しない場合はデフォルト設定）
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, AntonToolError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no configuration file, using defaults");
            let mut config = Self::default();
            config.base_dir = path.parent().map(Path::to_path_buf);
            return Ok(config);
        }
        Self::load(path)
    }

    /// 設定ファイルに保存する（既存ファイルは上書き）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AntonToolError> {
        let path = path.as_ref();
        fs::write(path, self.to_xml()?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// XMLバイト列から設定を構築する
    pub fn from_xml(content: &[u8]) -> Result<Self, AntonToolError> {
        let entries = parse_flat_document(content)?;
        let mut config = Self::default();

        let mut einzeln: Option<String> = None;
        let mut onedoc: Option<String> = None;
        let mut perclass: Option<String> = None;

        for (key, value) in entries {
            match key.as_str() {
                "anton_xml_file" => config.anton_xml_file = value,
                "anton_outputpath" => {
                    config.anton_output_dir = non_empty_or(value, DEFAULT_ANTON_OUTPUT)
                }
                "anton_students_file" => {
                    config.students_file_name = non_empty_or(value, DEFAULT_STUDENTS_FILE)
                }
                "anton_teachers_file" => {
                    config.teachers_file_name = non_empty_or(value, DEFAULT_TEACHERS_FILE)
                }
                "csv_file" => config.csv_file = value,
                "csv_delimiter" => config.csv_delimiter = parse_delimiter(&value),
                "csv_bom" => config.csv_bom = parse_yes_no(&value, "csv_bom", true),
                "file_timestamp" => {
                    config.file_timestamp = parse_yes_no(&value, "file_timestamp", false)
                }
                "pdf_outputpath" => config.pdf_output_dir = non_empty_or(value, DEFAULT_PDF_OUTPUT),
                "pdf_antonlink" => config.pdf_anton_link = non_empty_or(value, DEFAULT_ANTON_LINK),
                "pdf_einzeln" => einzeln = Some(value),
                "pdf_onedoc" => onedoc = Some(value),
                "pdf_perclass" => perclass = Some(value),
                "pdf_schoolgroup" => {
                    config.school_group = match value.trim() {
                        "2" => SchoolGroup::Teachers,
                        "1" | "" => SchoolGroup::Students,
                        other => {
                            warn_invalid(other, "pdf_schoolgroup", "1");
                            SchoolGroup::Students
                        }
                    }
                }
                "pdf_pagesize" => config.page_size = parse_page_size(&value),
                "pdf_branding" => config.branding = non_empty_or(value, DEFAULT_BRANDING),
                "support_contact" => config.support_contact = value,
                _ => config.extra.push((key, value)),
            }
        }

        config.pdf_mode = resolve_pdf_mode(einzeln, onedoc, perclass);
        Ok(config)
    }

    /// 設定をXMLバイト列に変換する
    pub fn to_xml(&self) -> Result<Vec<u8>, AntonToolError> {
        let yes_no = |b: bool| if b { "ja" } else { "nein" };
        let delimiter = match self.csv_delimiter {
            b'\t' => "tab".to_string(),
            b' ' => "space".to_string(),
            b => (b as char).to_string(),
        };

        let mut entries: Vec<(&str, String)> = vec![
            ("anton_xml_file", self.anton_xml_file.clone()),
            ("anton_outputpath", self.anton_output_dir.clone()),
            ("anton_students_file", self.students_file_name.clone()),
            ("anton_teachers_file", self.teachers_file_name.clone()),
            ("csv_file", self.csv_file.clone()),
            ("csv_delimiter", delimiter),
            ("csv_bom", yes_no(self.csv_bom).to_string()),
            ("file_timestamp", yes_no(self.file_timestamp).to_string()),
            ("pdf_outputpath", self.pdf_output_dir.clone()),
            ("pdf_antonlink", self.pdf_anton_link.clone()),
            (
                "pdf_einzeln",
                yes_no(self.pdf_mode == PdfMode::Individual).to_string(),
            ),
            (
                "pdf_onedoc",
                yes_no(self.pdf_mode != PdfMode::Individual).to_string(),
            ),
            (
                "pdf_perclass",
                yes_no(self.pdf_mode == PdfMode::PerClass).to_string(),
            ),
            (
                "pdf_schoolgroup",
                match self.school_group {
                    SchoolGroup::Students => "1",
                    SchoolGroup::Teachers => "2",
                }
                .to_string(),
            ),
            (
                "pdf_pagesize",
                match self.page_size {
                    PageSize::A4 => "A4",
                    PageSize::Letter => "Letter",
                }
                .to_string(),
            ),
            ("pdf_branding", self.branding.clone()),
            ("support_contact", self.support_contact.clone()),
        ];
        entries.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.clone())));

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Start(BytesStart::new("config")))
            .map_err(xml_write_error)?;
        for (key, value) in &entries {
            if value.is_empty() {
                writer
                    .write_event(Event::Empty(BytesStart::new(*key)))
                    .map_err(xml_write_error)?;
                continue;
            }
            writer
                .write_event(Event::Start(BytesStart::new(*key)))
                .map_err(xml_write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(xml_write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(*key)))
                .map_err(xml_write_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("config")))
            .map_err(xml_write_error)?;

        let mut output = writer.into_inner();
        output.push(b'\n');
        Ok(output)
    }

    /// 設定値のパスを解決する
    ///
    /// 絶対パスはそのまま、相対パスは設定ファイルのディレクトリを基準にします。
    pub fn resolve_path(&self, value: &str) -> PathBuf {
        let path = PathBuf::from(value);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// 相対パスの基準ディレクトリを設定する
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// 未知のキーの値を取得する
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// `<root><key>value</key>…</root>`を(key, value)のリストに変換
fn parse_flat_document(content: &[u8]) -> Result<Vec<(String, String)>, AntonToolError> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(String, String)> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth == 2 {
                    let key = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    current = Some((key, String::new()));
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 {
                    let key = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    entries.push((key, String::new()));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, value)) = current.as_mut() {
                    let text = e.unescape().map_err(|err| {
                        AntonToolError::parse(format!("config @ byte {}", position), err.to_string())
                    })?;
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some((key, value)) = current.take() {
                        entries.push((key, value.trim().to_string()));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AntonToolError::parse(
                    format!("config @ byte {}", position),
                    e.to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn xml_write_error(e: quick_xml::Error) -> AntonToolError {
    AntonToolError::Io(std::io::Error::other(e.to_string()))
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn warn_invalid(raw: &str, key: &str, default: &str) {
    tracing::warn!(
        key,
        value = raw,
        default,
        "invalid configuration value, using default"
    );
}

fn parse_yes_no(raw: &str, key: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "" => default,
        "ja" => true,
        "nein" => false,
        other => {
            warn_invalid(other, key, if default { "ja" } else { "nein" });
            default
        }
    }
}

fn parse_delimiter(raw: &str) -> u8 {
    // 空白はtrimされるため、タブは`tab`または`\t`、空白は`space`で指定する
    let value = raw.trim();
    match value {
        "" => DEFAULT_DELIMITER,
        "tab" | "\\t" => b'\t',
        "space" => b' ',
        v if v.len() == 1 && is_valid_delimiter(v.as_bytes()[0]) => v.as_bytes()[0],
        other => {
            warn_invalid(other, "csv_delimiter", ";");
            DEFAULT_DELIMITER
        }
    }
}

/// 区切り文字として使えるかを判定（ASCIIのみ、引用符と改行は不可）
pub(crate) fn is_valid_delimiter(b: u8) -> bool {
    b.is_ascii() && !matches!(b, b'"' | b'\n' | b'\r') && (b == b'\t' || !b.is_ascii_control())
}

fn parse_page_size(raw: &str) -> PageSize {
    match raw.trim().to_lowercase().as_str() {
        "" | "a4" => PageSize::A4,
        "letter" => PageSize::Letter,
        other => {
            warn_invalid(other, "pdf_pagesize", "A4");
            PageSize::A4
        }
    }
}

/// 旧形式（`pdf_einzeln`, `pdf_onedoc`）と`pdf_perclass`から出力方式を決定
///
/// `pdf_onedoc`が未設定の場合は`pdf_einzeln`の逆になります。旧形式の1ファイル出力は
/// クラスごとの出力を意味するため、`pdf_perclass=nein`が明示された場合のみ
/// 全員を1つのファイル（`Consolidated`）にまとめます。
fn resolve_pdf_mode(
    einzeln: Option<String>,
    onedoc: Option<String>,
    perclass: Option<String>,
) -> PdfMode {
    let einzeln = parse_yes_no(einzeln.as_deref().unwrap_or(""), "pdf_einzeln", true);
    let onedoc_raw = onedoc.unwrap_or_default();
    let onedoc = if onedoc_raw.trim().is_empty() {
        !einzeln
    } else {
        parse_yes_no(&onedoc_raw, "pdf_onedoc", false)
    };
    let perclass = match perclass.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_yes_no(raw, "pdf_perclass", true)),
    };

    match (onedoc, perclass) {
        (_, Some(true)) => PdfMode::PerClass,
        (false, _) => PdfMode::Individual,
        (true, None) => PdfMode::PerClass,
        (true, Some(false)) => PdfMode::Consolidated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_xml(b"<config></config>").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_keys_default_silently() {
        let xml = br#"<config>
            <anton_xml_file>export.xml</anton_xml_file>
            <csv_delimiter>,</csv_delimiter>
        </config>"#;
        let config = Config::from_xml(xml).unwrap();
        assert_eq!(config.anton_xml_file, "export.xml");
        assert_eq!(config.csv_delimiter, b',');
        assert_eq!(config.anton_output_dir, "output");
        assert_eq!(config.pdf_anton_link, "https://www.anton.app");
        assert_eq!(config.pdf_mode, PdfMode::Individual);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let xml = br#"<config>
            <csv_delimiter>;;</csv_delimiter>
            <pdf_einzeln>vielleicht</pdf_einzeln>
            <pdf_schoolgroup>7</pdf_schoolgroup>
            <pdf_pagesize>A3</pdf_pagesize>
        </config>"#;
        let config = Config::from_xml(xml).unwrap();
        assert_eq!(config.csv_delimiter, b';');
        assert_eq!(config.pdf_mode, PdfMode::Individual);
        assert_eq!(config.school_group, SchoolGroup::Students);
        assert_eq!(config.page_size, PageSize::A4);
    }

    #[test]
    fn test_legacy_einzeln_derives_onedoc() {
        // 旧形式の1ファイル出力はクラスごと
        let config = Config::from_xml(b"<config><pdf_einzeln>nein</pdf_einzeln></config>").unwrap();
        assert_eq!(config.pdf_mode, PdfMode::PerClass);

        let config = Config::from_xml(b"<config><pdf_onedoc>ja</pdf_onedoc></config>").unwrap();
        assert_eq!(config.pdf_mode, PdfMode::PerClass);

        let config = Config::from_xml(
            b"<config><pdf_einzeln>nein</pdf_einzeln><pdf_onedoc>nein</pdf_onedoc></config>",
        )
        .unwrap();
        assert_eq!(config.pdf_mode, PdfMode::Individual);
    }

    #[test]
    fn test_per_class_mode() {
        let config = Config::from_xml(
            b"<config><pdf_onedoc>ja</pdf_onedoc><pdf_perclass>JA</pdf_perclass></config>",
        )
        .unwrap();
        assert_eq!(config.pdf_mode, PdfMode::PerClass);

        let config =
            Config::from_xml(b"<config><pdf_perclass>ja</pdf_perclass></config>").unwrap();
        assert_eq!(config.pdf_mode, PdfMode::PerClass);
    }

    #[test]
    fn test_consolidated_requires_explicit_perclass_nein() {
        let config = Config::from_xml(
            b"<config><pdf_onedoc>ja</pdf_onedoc><pdf_perclass>nein</pdf_perclass></config>",
        )
        .unwrap();
        assert_eq!(config.pdf_mode, PdfMode::Consolidated);

        let config = Config::from_xml(
            b"<config><pdf_einzeln>nein</pdf_einzeln><pdf_perclass>nein</pdf_perclass></config>",
        )
        .unwrap();
        assert_eq!(config.pdf_mode, PdfMode::Consolidated);

        // 保存して読み込んでも変わらない
        let saved = Config {
            pdf_mode: PdfMode::Consolidated,
            ..Config::default()
        };
        let loaded = Config::from_xml(&saved.to_xml().unwrap()).unwrap();
        assert_eq!(loaded.pdf_mode, PdfMode::Consolidated);
    }

    #[test]
    fn test_tab_delimiter() {
        let config = Config::from_xml(b"<config><csv_delimiter>tab</csv_delimiter></config>").unwrap();
        assert_eq!(config.csv_delimiter, b'\t');
    }

    #[test]
    fn test_whitespace_delimiters_survive_save_and_load() {
        for delimiter in [b' ', b'\t'] {
            let saved = Config {
                csv_delimiter: delimiter,
                ..Config::default()
            };
            let xml = saved.to_xml().unwrap();
            let loaded = Config::from_xml(&xml).unwrap();
            assert_eq!(loaded.csv_delimiter, delimiter);
        }

        let xml = Config {
            csv_delimiter: b' ',
            ..Config::default()
        }
        .to_xml()
        .unwrap();
        assert!(String::from_utf8(xml)
            .unwrap()
            .contains("<csv_delimiter>space</csv_delimiter>"));
    }

    #[test]
    fn test_save_and_load_preserves_values_and_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(
            &path,
            "<config><legacy_option>wert &amp; mehr</legacy_option><support_contact>it@schule.de</support_contact></config>",
        )
        .unwrap();

        let mut config = Config::load(&path).unwrap();
        assert_eq!(config.extra("legacy_option"), Some("wert & mehr"));
        config.csv_delimiter = b',';
        config.pdf_mode = PdfMode::PerClass;
        config.school_group = SchoolGroup::Teachers;
        config.branding = "ANTON Schule".to_string();
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.support_contact, "it@schule.de");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/anton/config.xml");
        assert!(matches!(result, Err(AntonToolError::Io(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("config.xml")).unwrap();
        assert_eq!(config.csv_delimiter, b';');
        assert_eq!(config.resolve_path("output"), dir.path().join("output"));
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let result = Config::from_xml(b"<config><csv_file>a.csv</config>");
        assert!(matches!(result, Err(AntonToolError::Parse { .. })));
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::default().with_base_dir("/opt/anton");
        assert_eq!(config.resolve_path("output"), PathBuf::from("/opt/anton/output"));
        assert_eq!(config.resolve_path("/tmp/out"), PathBuf::from("/tmp/out"));
    }
}

//! anton-tool - SchILD NRW XML to ANTON CSV converter and credential PDF generator
//!
//! This crate provides two independent pipelines that share one configuration:
//!
//! - **Converter**: reads a SchILD NRW export (IMS Enterprise XML) and writes the two
//!   CSV import files ANTON expects (students and teachers).
//! - **PDF generator**: reads the credential list exported from ANTON (CSV or Excel)
//!   and renders a German credential letter per person, with QR code and a cut-out
//!   sticker.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use anton_tool::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // Writes output/ANTON_Schueler.csv and output/ANTON_Lehrkraefte.csv
//!     let report = converter.convert_file("SchILD_Export.xml")?;
//!     println!(
//!         "{} students, {} teachers, {} skipped",
//!         report.students,
//!         report.teachers,
//!         report.skip_count()
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! # Using a configuration file
//!
//! ```rust,no_run
//! use anton_tool::{Config, ConverterBuilder, PdfGenerator};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.xml")?;
//!
//!     // SchILD -> ANTON
//!     let converter = ConverterBuilder::from_config(&config).build()?;
//!     converter.convert_file(config.resolve_path(&config.anton_xml_file))?;
//!
//!     // ANTON credentials -> PDF
//!     let report = PdfGenerator::new(&config)
//!         .generate_with_progress(|done, total| eprintln!("{}/{}", done, total))?;
//!     println!("{} PDF files written", report.files.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-memory conversion
//!
//! ```rust
//! use anton_tool::{ConverterBuilder, CsvOptions};
//!
//! # fn main() -> Result<(), anton_tool::AntonToolError> {
//! let xml = br#"<enterprise>
//!   <person>
//!     <sourcedid><id>ID-1-0001A</id></sourcedid>
//!     <name><n><family>Muster</family><given>Anna</given></n></name>
//!     <institutionrole institutionroletype="Student"/>
//!   </person>
//!   <membership>
//!     <sourcedid><id>ID-1-klasse-5A</id></sourcedid>
//!     <member><sourcedid><id>ID-1-0001A</id></sourcedid></member>
//!   </membership>
//! </enterprise>"#;
//!
//! let converter = ConverterBuilder::new().build()?;
//! let outcome = converter.map_document(xml)?;
//!
//! let mut csv = Vec::new();
//! outcome.write_students(&mut csv, CsvOptions { delimiter: b';', bom: false })?;
//! assert_eq!(
//!     String::from_utf8(csv).unwrap(),
//!     "Vorname;Nachname;Klasse;Referenz\nAnna;Muster;5a;ID-1-0001A\n"
//! );
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod config;
mod credentials;
mod error;
mod mapping;
mod output;
mod pdf;
mod preview;
mod schild;
mod security;
mod types;

// 公開API
pub use api::{PageSize, PdfMode, Role, SchoolGroup};
pub use builder::{ConversionOutcome, ConversionReport, Converter, ConverterBuilder};
pub use config::Config;
pub use credentials::{parse_csv, parse_spreadsheet, read_credentials, CredentialTable};
pub use error::{AntonToolError, ValidationError};
pub use mapping::{
    build_class_lookup, map_record, normalize_class, normalize_name, salutation_from_reference,
};
pub use output::{write_table, CsvOptions};
pub use pdf::{compose_letter, Address, GenerationReport, Letter, LetterOptions, PdfGenerator};
pub use preview::render_preview_table;
pub use schild::{parse_document, SchemaMapping, SchildDocument, SourceField};
pub use types::{
    CredentialEntry, Membership, SkippedRecord, SourceRecord, StudentRow, TargetRow, TeacherRow,
};

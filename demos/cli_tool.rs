//! CLI Tool Example
//!
//! This example demonstrates how to build a command-line tool around anton-tool:
//! converting a SchILD export to ANTON CSV files and generating credential PDFs.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example cli_tool -- convert config.xml
//! cargo run --example cli_tool -- preview config.xml
//! cargo run --example cli_tool -- pdf config.xml
//! RUST_LOG=debug cargo run --example cli_tool -- convert config.xml
//! ```

use std::process;

use anton_tool::{
    render_preview_table, AntonToolError, Config, ConverterBuilder, PdfGenerator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let command = args[1].as_str();
    let config_path = args.get(2).map(String::as_str).unwrap_or("config.xml");

    let result = Config::load_or_default(config_path).and_then(|config| match command {
        "convert" => convert(&config),
        "preview" => preview(&config),
        "pdf" => generate_pdfs(&config),
        "init" => config.save(config_path).map(|_| {
            println!("Default configuration written to {}", config_path);
        }),
        _ => {
            print_usage(&args[0]);
            process::exit(1);
        }
    });

    if let Err(e) = result {
        handle_error(e);
        process::exit(1);
    }
}

fn init_logging() {
    // RUST_LOG overrides the default level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [config.xml]", program);
    eprintln!("\nCommands:");
    eprintln!("  convert   Convert the SchILD XML export into ANTON CSV files");
    eprintln!("  preview   Show the credential list that would be rendered");
    eprintln!("  pdf       Generate credential PDFs from the ANTON export");
    eprintln!("  init      Write a configuration file with default values");
    eprintln!("\nExamples:");
    eprintln!("  {} convert config.xml", program);
    eprintln!("  {} pdf config.xml", program);
}

fn convert(config: &Config) -> Result<(), AntonToolError> {
    if config.anton_xml_file.trim().is_empty() {
        return Err(AntonToolError::Config(
            "anton_xml_file is not set in the configuration".to_string(),
        ));
    }

    let converter = ConverterBuilder::from_config(config).build()?;
    let report = converter.convert_file(config.resolve_path(&config.anton_xml_file))?;

    println!("Schüler:innen:  {} -> {}", report.students, report.students_file.display());
    println!("Lehrkräfte:     {} -> {}", report.teachers, report.teachers_file.display());
    if report.skip_count() > 0 {
        println!("\n{} Datensätze übersprungen:", report.skip_count());
        for skipped in &report.skipped {
            println!(
                "  Person #{} ({}): {}",
                skipped.position + 1,
                skipped.reference.as_deref().unwrap_or("-"),
                skipped.reason
            );
        }
    }

    Ok(())
}

fn preview(config: &Config) -> Result<(), AntonToolError> {
    let generator = PdfGenerator::new(config);
    let table = generator.load_entries()?;

    println!("Übersicht der importierten Nutzer ({}):\n", generator.input().display());
    print!("{}", render_preview_table(&table.entries));
    for skipped in &table.skipped {
        println!("Zeile {} übersprungen: {}", skipped.position, skipped.reason);
    }

    Ok(())
}

fn generate_pdfs(config: &Config) -> Result<(), AntonToolError> {
    let generator = PdfGenerator::new(config);
    let report = generator.generate_with_progress(|done, total| {
        eprint!("\rFortschritt: {}/{}", done, total);
        if done == total {
            eprintln!();
        }
    })?;

    println!(
        "{} Seiten in {} PDF-Dateien erstellt. Ausgabeordner: {}",
        report.rendered,
        report.files.len(),
        generator.output_dir().display()
    );
    for skipped in &report.skipped {
        println!("Zeile {} übersprungen: {}", skipped.position, skipped.reason);
    }

    Ok(())
}

fn handle_error(error: AntonToolError) {
    match error {
        AntonToolError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        AntonToolError::Parse { location, message } => {
            eprintln!("Parse Error at {}: {}", location, message);
            eprintln!("The file may not be a SchILD export or an ANTON credential list.");
        }
        AntonToolError::Csv(csv_err) => {
            eprintln!("CSV Error: {}", csv_err);
            eprintln!("Please check the delimiter setting (csv_delimiter).");
        }
        AntonToolError::Spreadsheet(err) => {
            eprintln!("Spreadsheet Error: {}", err);
            eprintln!("The file may not be a valid Excel file or may be corrupted.");
        }
        AntonToolError::Pdf(msg) => {
            eprintln!("PDF Error: {}", msg);
        }
        AntonToolError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        AntonToolError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The file violates security constraints (e.g., file size limit).");
        }
    }
}

//! Basic Conversion Example
//!
//! This example demonstrates the most basic usage of anton-tool:
//! converting a SchILD NRW XML export to the two ANTON CSV files using default settings.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_conversion -- SchILD_Export.xml output
//! ```

use anton_tool::ConverterBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get input file path from command line arguments or use default
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "SchILD_Export.xml".to_string());

    // Get output folder from command line arguments or use default
    let output_dir = std::env::args().nth(2).unwrap_or_else(|| "output".to_string());

    println!("Converting {} into {}/...", input_path, output_dir);

    let converter = ConverterBuilder::new().with_output_dir(&output_dir).build()?;

    let report = converter.convert_file(&input_path).map_err(|e| {
        eprintln!("Error: Could not convert '{}'", input_path);
        eprintln!("  {}", e);
        e
    })?;

    println!("Conversion completed successfully!");
    println!("  {} students -> {}", report.students, report.students_file.display());
    println!("  {} teachers -> {}", report.teachers, report.teachers_file.display());
    println!("  {} records skipped", report.skip_count());

    Ok(())
}

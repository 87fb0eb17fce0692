//! Rotaprep CLI - prepare rotation spreadsheets for TTPS, the tracker and One45
//!
//! # Main Commands
//!
//! ```bash
//! rotaprep serve                              # Start HTTP server (port 3000)
//! rotaprep transform block.xlsx --target ttps # Extract, clean and shape
//! rotaprep defaults                           # Show resolved form defaults
//! ```
//!
//! # Step Commands
//!
//! ```bash
//! rotaprep extract block.xlsx -o table.json  # Just extract the table
//! rotaprep clean table.json -o clean.json    # Clean an (edited) table
//! ```

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use rotaprep::models::context::parse_date;
use rotaprep::{
    clean, extract_file, transform_one45, transform_tracker, transform_ttps, Config, ContextForm,
    ExtractOptions, FormDefaults, OutputKind, RotationTable, SourceFormat,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rotaprep")]
#[command(about = "Prepare rotation spreadsheets for TTPS, the tracker and One45", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the preceptor table from a spreadsheet
    Extract {
        /// Input workbook or CSV file
        input: PathBuf,

        /// Only look in this sheet
        #[arg(long)]
        sheet: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean a table JSON file (as written by `extract`)
    Clean {
        /// Input table JSON
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract, clean and shape a spreadsheet for one target system
    Transform {
        /// Input workbook or CSV file
        input: PathBuf,

        /// ttps, tracker or one45
        #[arg(short, long)]
        target: OutputKind,

        #[command(flatten)]
        context: ContextArgs,

        /// Only look in this sheet
        #[arg(long)]
        sheet: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the form defaults resolved from previous values
    Defaults {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: ROTAPREP_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Rotation context flags. Anything omitted falls back to the defaults.
#[derive(clap::Args)]
struct ContextArgs {
    /// Rotation code, e.g. C1
    #[arg(long)]
    rotation: Option<String>,

    /// SMH, VGH or SPH
    #[arg(long)]
    location: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Academic year, e.g. 2025-2026
    #[arg(long)]
    academic_year: Option<String>,
}

impl ContextArgs {
    fn to_form(&self) -> Result<ContextForm, Box<dyn std::error::Error>> {
        Ok(ContextForm {
            rotation: self.rotation.clone(),
            location: self.location.clone(),
            start_date: self.start.as_deref().map(parse_date).transpose()?,
            end_date: self.end.as_deref().map(parse_date).transpose()?,
            academic_year: self.academic_year.clone(),
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input, sheet, output } => {
            cmd_extract(&input, &options(&config, sheet), output.as_deref())
        }

        Commands::Clean { input, output } => cmd_clean(&input, output.as_deref()),

        Commands::Transform {
            input,
            target,
            context,
            sheet,
            format,
            output,
        } => cmd_transform(
            &input,
            target,
            &context,
            &options(&config, sheet),
            format,
            output.as_deref(),
        ),

        Commands::Defaults { context } => cmd_defaults(&context),

        Commands::Serve { port } => cmd_serve(config, port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn options(config: &Config, sheet: Option<String>) -> ExtractOptions {
    let mut options = config.extract_options();
    if sheet.is_some() {
        options.sheet = sheet;
    }
    options
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn extract_table(
    input: &Path,
    options: &ExtractOptions,
) -> Result<RotationTable, Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let extraction = extract_file(input, options)?;
    match &extraction.format {
        SourceFormat::Workbook { sheet } => eprintln!("   Sheet: {}", sheet),
        SourceFormat::Delimited { encoding, delimiter } => {
            eprintln!("   Encoding: {}", encoding);
            eprintln!("   Delimiter: '{}'", format_delimiter(*delimiter));
        }
    }
    eprintln!("   Header row: {}", extraction.header_row + 1);
    eprintln!("   Columns: {}", extraction.table.columns().join(", "));

    Ok(extraction.table)
}

fn cmd_extract(
    input: &Path,
    options: &ExtractOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = extract_table(input, options)?;
    eprintln!("✅ Extracted {} rows", table.row_count());

    let json = serde_json::to_string_pretty(&table)?;
    write_output(&json, output)
}

fn cmd_clean(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧹 Cleaning: {}", input.display());

    let content = fs::read_to_string(input)?;
    let table: RotationTable = serde_json::from_str(&content)?;
    let cleaned = clean(&table);

    eprintln!("   {} rows in, {} rows out", table.row_count(), cleaned.row_count());

    let json = serde_json::to_string_pretty(&cleaned)?;
    write_output(&json, output)
}

fn cmd_transform(
    input: &Path,
    target: OutputKind,
    context: &ContextArgs,
    options: &ExtractOptions,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cleaned = clean(&extract_table(input, options)?);

    let shaped = if target.needs_context() {
        let ctx = context.to_form()?.fill_missing(today()).to_context()?;
        eprintln!(
            "   Context: {} {} {}..{} ({})",
            ctx.rotation_code, ctx.location, ctx.start_date, ctx.end_date, ctx.academic_year
        );
        match target {
            OutputKind::Ttps => {
                let result = transform_ttps(&cleaned, &ctx);
                if result.excluded > 0 {
                    eprintln!("   Omitted {} row(s) that cannot go into TTPS", result.excluded);
                }
                result.output
            }
            _ => transform_tracker(&cleaned, &ctx),
        }
    } else {
        transform_one45(&cleaned)
    };

    eprintln!("\n⚙️  {}: {} rows", target.title(), shaped.table.row_count());

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&shaped.table.for_display().to_records())?;
            write_output(&json, output)?;
        }
        OutputFormat::Csv => match output {
            Some(path) => {
                shaped.table.for_display().write_csv(fs::File::create(path)?)?;
                eprintln!("💾 Saved to: {}", path.display());
            }
            None => shaped.table.for_display().write_csv(io::stdout().lock())?,
        },
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_defaults(context: &ContextArgs) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = FormDefaults::resolve(&context.to_form()?, today());
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.port = port;
    }
    rotaprep::server::start_server(config).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", content)?;
        }
    }
    Ok(())
}

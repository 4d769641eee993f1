//! ocrstamp CLI - stamp spreadsheet names onto scanned tour sheets

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use ocrstamp::{
    Anchor, DuplicateKeyPolicy, OverlayPlacement, PdftoppmRasterizer, RasterBackend,
    RecognitionRegion, RecordTable, RegionReading, Rgb, SourceDocument, StampOptions, StampOutput,
    Stamper, TesseractRecognizer, OUTPUT_FILE_NAME,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "ocrstamp")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Stamp spreadsheet names onto scanned tour sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize tour numbers and stamp the matching names onto each page
    Stamp {
        /// Scanned tour sheets
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Workbook with the tour table
        #[arg(value_name = "XLSX")]
        table: PathBuf,

        /// Output file or directory
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Only recognize tour numbers and print them per page
    Scan {
        /// Scanned tour sheets
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Load and check the tour table
    Table {
        /// Workbook with the tour table
        #[arg(value_name = "XLSX")]
        table: PathBuf,

        /// Sheet holding the tour table
        #[arg(long, env = "OCRSTAMP_SHEET", default_value = ocrstamp::options::DEFAULT_SHEET)]
        sheet: String,

        /// Fail on repeated tour numbers
        #[arg(long)]
        reject_duplicates: bool,
    },

    /// Show version information
    Version,
}

/// Run parameters. Precedence: defaults, then `--config`, then flags.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// JSON file with run parameters
    #[arg(long, env = "OCRSTAMP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Recognition region as x0,y0,x1,y1 in 72 DPI pixels
    #[arg(long, value_name = "X0,Y0,X1,Y1")]
    region: Option<RecognitionRegion>,

    /// Tesseract language
    #[arg(long, env = "OCRSTAMP_LANG")]
    lang: Option<String>,

    /// Rasterization resolution
    #[arg(long, env = "OCRSTAMP_DPI")]
    dpi: Option<u32>,

    /// Tesseract page segmentation mode (0-13)
    #[arg(long)]
    psm: Option<u8>,

    /// Sheet holding the tour table
    #[arg(long, env = "OCRSTAMP_SHEET")]
    sheet: Option<String>,

    /// Where the names are drawn, as x,y in points
    #[arg(long, value_name = "X,Y")]
    name_anchor: Option<Anchor>,

    /// Where the extra value is drawn, as x,y in points
    #[arg(long, value_name = "X,Y")]
    extra_anchor: Option<Anchor>,

    /// Do not draw the extra value
    #[arg(long, conflicts_with = "extra_anchor")]
    no_extra: bool,

    /// Color of the names (#RRGGBB)
    #[arg(long, value_name = "COLOR")]
    name_color: Option<Rgb>,

    /// Color of the extra value (#RRGGBB)
    #[arg(long, value_name = "COLOR")]
    extra_color: Option<Rgb>,

    /// Font size of the names
    #[arg(long)]
    name_size: Option<f32>,

    /// Font size of the extra value
    #[arg(long)]
    extra_size: Option<f32>,

    /// Standard PDF font for both lines
    #[arg(long)]
    font: Option<String>,

    /// How overlays map onto pages that are not A4
    #[arg(long, value_enum)]
    placement: Option<Placement>,

    /// Page renderer
    #[arg(long, value_enum, env = "OCRSTAMP_BACKEND")]
    backend: Option<Backend>,

    /// Fail on repeated tour numbers instead of using the first row
    #[arg(long)]
    reject_duplicates: bool,

    /// Recognize pages one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Placement {
    /// Overlay coordinates used as-is
    Absolute,
    /// Overlay scaled onto each page
    FitPage,
}

impl From<Placement> for OverlayPlacement {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Absolute => OverlayPlacement::Absolute,
            Placement::FitPage => OverlayPlacement::FitPage,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// pdftoppm from poppler-utils
    Pdftoppm,
    /// MuPDF (requires the mupdf feature)
    Mupdf,
}

impl From<Backend> for RasterBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Pdftoppm => RasterBackend::Pdftoppm,
            Backend::Mupdf => RasterBackend::Mupdf,
        }
    }
}

impl RunArgs {
    fn to_options(&self) -> CliResult<StampOptions> {
        let mut options = match &self.config {
            Some(path) => StampOptions::from_json_file(path)?,
            None => StampOptions::default(),
        };

        if let Some(region) = self.region {
            options = options.with_region(region);
        }
        if let Some(lang) = &self.lang {
            options = options.with_language(lang.clone());
        }
        if let Some(dpi) = self.dpi {
            options = options.with_dpi(dpi);
        }
        if let Some(psm) = self.psm {
            options = options.with_page_segmentation(psm);
        }
        if let Some(sheet) = &self.sheet {
            options = options.with_sheet(sheet.clone());
        }
        if let Some(anchor) = self.name_anchor {
            options = options.with_name_anchor(anchor);
        }
        if let Some(anchor) = self.extra_anchor {
            options = options.with_extra_anchor(Some(anchor));
        }
        if self.no_extra {
            options = options.with_extra_anchor(None);
        }
        if let Some(color) = self.name_color {
            options = options.with_name_color(color);
        }
        if let Some(color) = self.extra_color {
            options = options.with_extra_color(color);
        }
        if let Some(size) = self.name_size {
            options = options.with_name_size(size);
        }
        if let Some(size) = self.extra_size {
            options = options.with_extra_size(size);
        }
        if let Some(font) = &self.font {
            let mut style = options.style.clone();
            style.primary.font = font.clone();
            style.secondary.font = font.clone();
            options = options.with_style(style);
        }
        if let Some(placement) = self.placement {
            options = options.with_placement(placement.into());
        }
        if let Some(backend) = self.backend {
            options = options.with_raster_backend(backend.into());
        }
        if self.reject_duplicates {
            options = options.reject_duplicates();
        }
        if self.sequential {
            options = options.sequential();
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stamp {
            input,
            table,
            output,
            report,
            run,
        } => cmd_stamp(&input, &table, output.as_deref(), report.as_deref(), &run),
        Commands::Scan { input, json, run } => cmd_scan(&input, json, &run),
        Commands::Table {
            table,
            sheet,
            reject_duplicates,
        } => cmd_table(&table, &sheet, reject_duplicates),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn progress_bar() -> CliResult<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:12} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn stamper_with_progress(options: StampOptions, pb: &ProgressBar) -> Stamper {
    let pb = pb.clone();
    Stamper::new(options).with_progress(move |progress| {
        pb.set_message(progress.stage.to_string());
        pb.set_length(progress.total as u64);
        pb.set_position(progress.completed as u64);
    })
}

/// Resolve `-o`: a directory receives the default file name.
fn output_path(output: Option<&Path>, result: &StampOutput) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(&result.file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(OUTPUT_FILE_NAME),
    }
}

fn cmd_stamp(
    input: &Path,
    table_path: &Path,
    output: Option<&Path>,
    report_path: Option<&Path>,
    run: &RunArgs,
) -> CliResult<()> {
    let options = run.to_options()?;

    let table = RecordTable::from_path(table_path, &options.sheet, options.duplicate_policy)?;
    let document = SourceDocument::open(input)?;

    let pb = progress_bar()?;
    let result = stamper_with_progress(options, &pb).stamp(&document, &table);
    pb.finish_and_clear();
    let result = result?;

    let path = output_path(output, &result);
    result.write_to_file(&path)?;

    let stats = &result.report.stats;
    println!("{}", "Stamping Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Input".bold(), document.format());
    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!("{}: {}", "Recognized".bold(), stats.codes_recognized);
    println!("{}: {}", "Matched".bold(), stats.matched);
    println!("{}: {}", "Stamped".bold(), stats.stamped.to_string().green());

    if !result.report.warnings.is_empty() {
        println!();
        println!(
            "{} ({})",
            "Warnings".yellow().bold(),
            result.report.warnings.len()
        );
        for warning in &result.report.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }

    if let Some(report_path) = report_path {
        fs::write(report_path, result.report.to_json()?)?;
        println!("\n{} {}", "Report saved to".green(), report_path.display());
    }

    println!("\n{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_scan(input: &Path, json: bool, run: &RunArgs) -> CliResult<()> {
    let options = run.to_options()?;
    let document = SourceDocument::open(input)?;

    let pb = progress_bar()?;
    let readings = stamper_with_progress(options, &pb).scan(&document);
    pb.finish_and_clear();
    let readings = readings?;

    if json {
        let pages: Vec<serde_json::Value> = readings
            .iter()
            .enumerate()
            .map(|(page, reading)| {
                serde_json::json!({
                    "page": page,
                    "code": reading.code(),
                    "status": reading_status(reading),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    println!("{:>6}  {}", "Page".bold(), "Tour".bold());
    println!("{}", "─".repeat(40).dimmed());
    for (page, reading) in readings.iter().enumerate() {
        let value = match reading {
            RegionReading::Code(code) => code.green().to_string(),
            RegionReading::Failed { reason } => format!("{} ({})", "failed".red(), reason),
            other => reading_status(other).yellow().to_string(),
        };
        println!("{:>6}  {}", page, value);
    }

    let found = readings.iter().filter(|r| r.code().is_some()).count();
    println!("\n{} of {} page(s) carry a tour number", found, readings.len());
    Ok(())
}

fn reading_status(reading: &RegionReading) -> &'static str {
    match reading {
        RegionReading::Code(_) => "ok",
        RegionReading::NoCode { .. } => "no code",
        RegionReading::OutOfBounds => "out of bounds",
        RegionReading::Failed { .. } => "failed",
    }
}

fn cmd_table(path: &Path, sheet: &str, reject_duplicates: bool) -> CliResult<()> {
    let policy = if reject_duplicates {
        DuplicateKeyPolicy::Reject
    } else {
        DuplicateKeyPolicy::FirstWins
    };
    let table = RecordTable::from_path(path, sheet, policy)?;

    println!("{}", "Tour Table".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), path.display());
    println!("{}: {}", "Sheet".bold(), sheet);
    println!("{}: {}", "Records".bold(), table.len());

    let duplicates = table.duplicate_keys();
    if duplicates.is_empty() {
        println!("{}: {}", "Duplicates".bold(), "none".green());
    } else {
        println!(
            "{}: {} {}",
            "Duplicates".bold(),
            duplicates.join(", ").yellow(),
            "(first row wins)".dimmed()
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "ocrstamp".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Tour sheet OCR and name stamping tool");
    println!();
    println!("{}", "External tools".bold());
    let tools = [
        ("tesseract", TesseractRecognizer::new().list_languages().is_ok()),
        ("pdftoppm", PdftoppmRasterizer::new().is_available()),
    ];
    for (tool, found) in tools {
        let status = if found { "found".green() } else { "missing".red() };
        println!("  {:10} {}", tool, status);
    }
    println!();
    println!("License: MIT");
}

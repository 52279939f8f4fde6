use clap::{Parser, Subcommand};
use excel_by_template::cli::{self, FillOptions};
use excel_by_template::error::TemplateResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "excel-by-template")]
#[command(about = "Fill spreadsheet templates from JSON items")]
#[command(long_about = "Excel By Template - write JSON items into an .xlsx template

Each input item becomes one row of the template's first worksheet, starting
at --start-row. Columns are mapped from 1-based column numbers (or letters)
to item properties.

COMMANDS:
  fill      - Fill a template from an items file
  run       - Run a job file (YAML or JSON)
  inspect   - Print the populated cells of a workbook
  describe  - Print the node description as JSON

EXAMPLES:
  excel-by-template fill -t invoice.xlsx -i items.json -o out.xlsx \\
      --start-row 2 -c A=name -c B=amount
  excel-by-template run job.yaml
  excel-by-template inspect out.xlsx --rows 5

Set RUST_LOG=excel_by_template=debug for per-item logging.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Fill a template from an items file.

The items file is a JSON or YAML list of objects. Every --column maps a
template column to an item property:

  -c 1=name       column A <- item.name
  -c C=amount     column C <- item.amount

Properties missing from an item leave the template cell untouched; null
clears it. Without --continue-on-fail the first bad item aborts the run.")]
    /// Fill a template from an items file
    Fill {
        /// Template workbook (.xlsx)
        #[arg(short, long)]
        template: PathBuf,

        /// Items file (JSON or YAML list of objects)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output workbook (.xlsx)
        #[arg(short, long)]
        output: PathBuf,

        /// First row to write (1-based)
        #[arg(short = 'r', long, default_value = "1")]
        start_row: u32,

        /// Column mapping COL=property (repeatable)
        #[arg(short, long = "column", value_name = "COL=PROPERTY")]
        columns: Vec<String>,

        /// Skip bad items instead of aborting
        #[arg(long)]
        continue_on_fail: bool,

        /// Show verbose fill steps
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Run a job file.

A job file holds templateFile, startRow, columnsConfig, items or itemsFile,
continueOnFail and output. Relative paths are resolved against the job
file's directory. The file is validated against the job schema first.")]
    /// Run a job file (YAML or JSON)
    Run {
        /// Path to the job file
        job: PathBuf,

        /// Output workbook (overrides 'output' in the job file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose fill steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the populated cells of a workbook's first worksheet
    Inspect {
        /// Workbook to inspect (.xlsx)
        file: PathBuf,

        /// Only show cells up to this row
        #[arg(short, long)]
        rows: Option<u32>,
    },

    /// Print the node description as JSON
    Describe,
}

fn main() -> TemplateResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "excel_by_template=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fill {
            template,
            input,
            output,
            start_row,
            columns,
            continue_on_fail,
            verbose,
        } => cli::fill(FillOptions {
            template,
            input,
            output,
            start_row,
            columns,
            continue_on_fail,
            verbose,
        }),

        Commands::Run {
            job,
            output,
            verbose,
        } => cli::run(job, output, verbose),

        Commands::Inspect { file, rows } => cli::inspect(file, rows),

        Commands::Describe => cli::describe(),
    }
}

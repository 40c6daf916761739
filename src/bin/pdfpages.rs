//! CLI binary for edgequake-pdfpages.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `PagesConfig`, drives a progress bar and delivers the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdfpages::pipeline::deliver::write_atomic;
use edgequake_pdfpages::{
    deliver, extract_file, inspect, merge_files, preview_file, thumbnails_file, AssemblyPath,
    CancelFlag, DeliveryOutcome, NoopProgress, Operation, OutputArtifact, PageProgress,
    PagesConfig, RenderEngine, SaveLocationPicker, TerminalPicker,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress using indicatif ─────────────────────────────────────────────

/// Terminal progress: one bar per operation, fallback notices printed above it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl PageProgress for CliProgress {
    fn on_start(&self, operation: Operation, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_style(style);
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(match operation {
            Operation::Thumbnails => "Rendering",
            Operation::Extract => "Extracting",
            Operation::Merge => "Merging",
        });
    }

    fn on_page(&self, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
    }

    fn on_fallback(&self, source_name: &str, reason: &str) {
        self.bar.println(format!(
            "  {} {}: {}  {}",
            yellow("⚠"),
            bold(source_name),
            reason,
            dim("(pages will be embedded as images)")
        ));
    }

    fn on_complete(&self, _operation: Operation, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pages 2, 5 and 8 of a report (saved as report_selected.pdf)
  pdfpages extract report.pdf --pages 2,5,8

  # A range into an explicit file
  pdfpages extract book.pdf --pages 10-25 -o chapter2.pdf

  # Merge in the given order (saved as a_merged.pdf)
  pdfpages merge a.pdf b.pdf c.pdf

  # Thumbnail gallery as JPEG files
  pdfpages thumbnails slides.pdf --out-dir thumbs/

  # Can pages be copied losslessly?
  pdfpages inspect locked.pdf

ENCRYPTED DOCUMENTS:
  Documents that cannot be copied structurally (encrypted, restricted or
  damaged) are rendered at --dpi (default 300) and embedded as images on
  pages of the original size. Text in those pages is no longer selectable.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDFPAGES_OUTPUT_DIR     Default directory for saved files
  RUST_LOG                Log filter (overrides --verbose/--quiet)
"#;

/// Extract and merge PDF pages locally.
#[derive(Parser, Debug)]
#[command(
    name = "pdfpages",
    version,
    about = "Extract and merge PDF pages locally",
    long_about = "Extract selected pages from a PDF or merge several PDFs into one. Pages are \
copied losslessly where possible; encrypted or restricted documents fall back to page images \
at the original page size.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the pdfium library (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFPAGES_PASSWORD")]
    password: Option<String>,

    /// Resolution for pages that have to be rendered (72–600).
    #[arg(long, global = true, env = "PDFPAGES_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Directory for saved files when no -o is given.
    #[arg(long, global = true, env = "PDFPAGES_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Never prompt for a save location.
    #[arg(short = 'y', long, global = true, env = "PDFPAGES_NO_PROMPT")]
    no_prompt: bool,

    /// Leave streams uncompressed in the output.
    #[arg(long, global = true)]
    no_compress: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFPAGES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFPAGES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFPAGES_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new PDF containing the selected pages, in ascending order.
    Extract {
        input: PathBuf,
        /// Page selection: all, 5, 3-15, 9- or 1,3,5-7.
        #[arg(short, long, default_value = "all")]
        pages: String,
        /// Output file (skips the save prompt).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Concatenate every page of every input, in argument order.
    Merge {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        /// Output file (skips the save prompt).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a JPEG thumbnail of every page.
    Thumbnails {
        input: PathBuf,
        #[arg(long, default_value = "thumbnails")]
        out_dir: PathBuf,
    },
    /// Render one page as an enlarged preview image.
    Preview {
        input: PathBuf,
        page: usize,
        /// Output image; a .png extension writes a lossless PNG, anything
        /// else a JPEG.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show page count, page sizes and whether pages can be copied losslessly.
    Inspect { input: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let engine = RenderEngine::bind(&config).context("Failed to load the PDF rendering engine")?;

    // ── Ctrl-C stops long operations between pages ───────────────────────
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let cli_progress = show_progress.then(CliProgress::new);
    let progress: &dyn PageProgress = match &cli_progress {
        Some(p) => p,
        None => &NoopProgress,
    };

    match &cli.command {
        Command::Extract {
            input,
            pages,
            output,
        } => {
            let started = Instant::now();
            let artifact = extract_file(&engine, input, pages, &config, progress, Some(&cancel))
                .await
                .context("Extraction failed")?;
            finish_output(&cli, artifact, output.as_deref(), started).await?;
        }
        Command::Merge { inputs, output } => {
            let started = Instant::now();
            let artifact = merge_files(&engine, inputs, &config, progress, Some(&cancel))
                .await
                .context("Merge failed")?;
            finish_output(&cli, artifact, output.as_deref(), started).await?;
        }
        Command::Thumbnails { input, out_dir } => {
            let pages = thumbnails_file(&engine, input, &config, progress, Some(&cancel))
                .await
                .context("Thumbnail generation failed")?;
            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            for page in &pages {
                let path = out_dir.join(format!(
                    "page-{:04}.{}",
                    page.page_number,
                    page.thumbnail.extension()
                ));
                tokio::fs::write(&path, &page.thumbnail.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&pages)?);
            } else if !cli.quiet {
                eprintln!(
                    "{} {} thumbnails  →  {}",
                    green("✔"),
                    bold(&pages.len().to_string()),
                    bold(&out_dir.display().to_string())
                );
            }
        }
        Command::Preview {
            input,
            page,
            output,
        } => {
            let lossless = output.as_deref().is_some_and(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            });
            let image = preview_file(&engine, input, *page, lossless, &config)
                .await
                .context("Preview failed")?;
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("page-{page}.{}", image.extension())));
            tokio::fs::write(&path, &image.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} page {} ({}x{} px)  →  {}",
                    green("✔"),
                    page,
                    image.width,
                    image.height,
                    bold(&path.display().to_string())
                );
            }
        }
        Command::Inspect { input } => {
            let info = inspect(&engine, input, &config)
                .await
                .context("Failed to inspect PDF")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("File:         {}", info.name);
                println!("Size:         {} bytes", info.file_size);
                println!("Pages:        {}", info.page_count);
                match &info.structural_error {
                    None => println!("Page copy:    lossless"),
                    Some(reason) => println!("Page copy:    rendered as images ({reason})"),
                }
                for (i, size) in info.page_sizes.iter().enumerate() {
                    println!(
                        "  page {:>4}   {:>7.1} x {:<7.1} pt",
                        i + 1,
                        size.width,
                        size.height
                    );
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PagesConfig`.
fn build_config(cli: &Cli) -> Result<PagesConfig> {
    let mut builder = PagesConfig::builder()
        .export_dpi(cli.dpi)
        .compress_output(!cli.no_compress);
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    builder.build().context("Invalid configuration")
}

/// Save a produced PDF and print the summary line.
async fn finish_output(
    cli: &Cli,
    artifact: OutputArtifact,
    output: Option<&Path>,
    started: Instant,
) -> Result<()> {
    let saved = match output {
        Some(path) => {
            write_atomic(path, &artifact.bytes)
                .await
                .context("Failed to save output")?;
            Some(path.to_path_buf())
        }
        None => {
            let interactive = !cli.no_prompt && !cli.json && io::stdin().is_terminal();
            let picker = interactive.then_some(&TerminalPicker as &dyn SaveLocationPicker);
            match deliver(&artifact.bytes, &artifact.file_name, picker, &cli.output_dir)
                .await
                .context("Failed to save output")?
            {
                DeliveryOutcome::Saved(path) => Some(path),
                DeliveryOutcome::Cancelled => None,
            }
        }
    };

    if cli.json {
        let mut summary = serde_json::to_value(&artifact)?;
        summary["saved_to"] = serde_json::json!(saved);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    for source in &artifact.sources {
        if source.path == AssemblyPath::Rasterized {
            eprintln!(
                "  {} {} ({} pages) embedded as images",
                yellow("⚠"),
                source.name,
                source.pages
            );
        }
    }
    match saved {
        Some(path) => eprintln!(
            "{}  {} pages  {} bytes  {}ms  →  {}",
            green("✔"),
            artifact.page_count,
            artifact.bytes.len(),
            started.elapsed().as_millis(),
            bold(&path.display().to_string()),
        ),
        None => eprintln!("{}", dim("Save cancelled; nothing written.")),
    }
    Ok(())
}

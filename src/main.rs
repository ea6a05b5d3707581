use clap::{Parser, Subcommand};
use cover_curator::audit::{self, Threshold};
use cover_curator::config::{self, CurateConfig};
use cover_curator::dedupe::{self, DedupeOptions};
use cover_curator::imaging::RustProber;
use cover_curator::output;
use cover_curator::review::{self, ReviewError, ReviewOptions, ReviewSession};
use cover_curator::sourcing::{ArtworkSource, ItunesSource};
use cover_curator::types::CandidateSet;
use cover_curator::walk::WalkOptions;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

/// Flags that select which files count as album art.
#[derive(clap::Args, Clone)]
struct ArtworkArgs {
    /// Artwork filename to match (repeatable; replaces the configured list)
    #[arg(long = "name", value_name = "FILENAME")]
    names: Vec<String>,

    /// Match filenames ignoring case
    #[arg(long, conflicts_with = "case_sensitive")]
    ignore_case: bool,

    /// Match filenames exactly
    #[arg(long)]
    case_sensitive: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Parser)]
#[command(name = "cover-curator")]
#[command(about = "Album-art curation for local music libraries")]
#[command(long_about = "\
Album-art curation for local music libraries

Finds the artwork files in every album folder, removes lower-resolution
duplicates, reports artwork below a size threshold, and walks you through
replacing it with larger art from the iTunes catalog.

Library layout:

  music/
  └── Frank Zappa/                 # Artist
      └── Roxy & Elsewhere/        # Album
          ├── folder.jpg           # Artwork (configurable names)
          └── cover.jpg            # Duplicate: the smaller one is removed

Typical run:

  cover-curator dedupe ~/music --dry-run
  cover-curator dedupe ~/music
  cover-curator audit ~/music --output paths.txt
  cover-curator review paths.txt --preview-dir album_art

Run 'cover-curator gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); stock defaults are used without it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep the highest-resolution artwork per folder and delete the rest
    Dedupe {
        /// Library root
        root: PathBuf,
        #[command(flatten)]
        artwork: ArtworkArgs,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the paths of low-resolution artwork to a report
    Audit {
        /// Library root
        root: PathBuf,
        #[command(flatten)]
        artwork: ArtworkArgs,
        /// Minimum acceptable width in pixels
        #[arg(long)]
        min_width: Option<u32>,
        /// Minimum acceptable height in pixels
        #[arg(long)]
        min_height: Option<u32>,
        /// Report file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Review replacements for the artwork listed in a report
    Review {
        /// Path list, one image per line (defaults to the audit report)
        list: Option<PathBuf>,
        /// Deadline for loading each item, search and download together
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Save each candidate in this directory so it can be viewed first
        #[arg(long, value_name = "DIR")]
        preview_dir: Option<PathBuf>,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Dedupe {
            root,
            artwork,
            dry_run,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            apply_artwork_args(&mut config, &artwork);
            config.validate()?;
            init_thread_pool(&config.processing);
            let candidates = candidate_set(&config)?;

            let (tx, rx) = mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_dedupe_event(&event);
                }
            });
            let options = DedupeOptions {
                walk: walk_options(&config),
                dry_run,
            };
            let result =
                dedupe::dedupe(&root, &candidates, &RustProber::new(), &options, Some(tx));
            printer.join().ok();
            output::print_dedupe_summary(&result?, dry_run);
        }
        Command::Audit {
            root,
            artwork,
            min_width,
            min_height,
            output: report,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            apply_artwork_args(&mut config, &artwork);
            if let Some(width) = min_width {
                config.audit.min_width = width;
            }
            if let Some(height) = min_height {
                config.audit.min_height = height;
            }
            if let Some(report) = report {
                config.audit.output = report.display().to_string();
            }
            config.validate()?;
            init_thread_pool(&config.processing);
            let candidates = candidate_set(&config)?;
            let threshold = Threshold::new(config.audit.min_width, config.audit.min_height);
            let report = PathBuf::from(&config.audit.output);

            let (tx, rx) = mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_audit_event(&event);
                }
            });
            let result = audit::audit(
                &root,
                &candidates,
                &RustProber::new(),
                threshold,
                &walk_options(&config),
                &report,
                Some(tx),
            );
            printer.join().ok();
            output::print_audit_summary(&result?, threshold, &report);
        }
        Command::Review {
            list,
            timeout_secs,
            preview_dir,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(secs) = timeout_secs {
                config.sourcing.timeout_secs = secs;
            }
            if let Some(dir) = preview_dir {
                config.review.preview_dir = Some(dir.display().to_string());
            }
            config.validate()?;
            let list = list.unwrap_or_else(|| PathBuf::from(&config.audit.output));
            run_review(&config, &list)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize `colog`: info by default, debug with `-v`, warnings with `-q`.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    let mut builder = colog::default_builder();
    builder.filter(None, level);
    builder.init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn apply_artwork_args(config: &mut CurateConfig, args: &ArtworkArgs) {
    if !args.names.is_empty() {
        config.artwork.filenames = args.names.clone();
    }
    if args.ignore_case {
        config.artwork.case_insensitive = true;
    }
    if args.case_sensitive {
        config.artwork.case_insensitive = false;
    }
    if args.follow_symlinks {
        config.artwork.follow_symlinks = true;
    }
}

fn candidate_set(config: &CurateConfig) -> Result<CandidateSet, Box<dyn std::error::Error>> {
    CandidateSet::new(
        config.artwork.filenames.iter().cloned(),
        config.artwork.case_insensitive,
    )
    .ok_or_else(|| "candidate filename set is empty".into())
}

fn walk_options(config: &CurateConfig) -> WalkOptions {
    WalkOptions {
        follow_symlinks: config.artwork.follow_symlinks,
    }
}

enum Answer {
    Accept,
    Skip,
    Quit,
}

/// Drive a review session from stdin.
///
/// Events are printed on this thread, between calls, so item details always
/// appear before the prompt.
fn run_review(
    config: &CurateConfig,
    list: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let paths = review::load_path_list(list)?;
    let source: Arc<dyn ArtworkSource> = Arc::new(ItunesSource::new(&config.sourcing));
    let (tx, rx) = mpsc::channel();
    let mut session = ReviewSession::new(
        paths,
        source,
        Box::new(RustProber::new()),
        ReviewOptions::from(config),
    )?
    .with_events(tx);

    session.start()?;
    print_pending(&rx);
    let stdin = std::io::stdin();
    while session.current().is_some() {
        match prompt(&mut stdin.lock())? {
            Answer::Accept => match session.accept() {
                Ok(_) | Err(ReviewError::Write { .. }) => {}
                Err(e) => return Err(e.into()),
            },
            Answer::Skip => {
                session.skip()?;
            }
            Answer::Quit => session.abandon(),
        }
        print_pending(&rx);
    }
    Ok(())
}

fn print_pending(rx: &Receiver<review::ReviewEvent>) {
    for event in rx.try_iter() {
        output::print_review_event(&event);
    }
}

/// Ask until the operator gives a valid answer. End of input quits.
fn prompt(input: &mut impl BufRead) -> std::io::Result<Answer> {
    loop {
        print!("    [a]ccept, [s]kip, [q]uit? ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            return Ok(Answer::Quit);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "accept" => return Ok(Answer::Accept),
            "s" | "skip" => return Ok(Answer::Skip),
            "q" | "quit" => return Ok(Answer::Quit),
            _ => {}
        }
    }
}

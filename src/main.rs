mod render;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use churnlens_core::{ChurnConfig, CoChangeWindow, OutputFormat};
use churnlens_history::mining::{mine_commits, MiningOptions};
use churnlens_history::module_churn::ModuleChurn;
use churnlens_history::record::{read_commits, CommitRecord};
use churnlens_history::report::{AnalysisOptions, HistoryReport};

const CONFIG_FILE: &str = ".churnlens.toml";

#[derive(Parser)]
#[command(
    name = "churnlens",
    version,
    about = "Commit-history analytics for git repositories",
    long_about = "churnlens replays a repository's commit history oldest-first and reports\n\
                   branch-tip topology, file and module churn, co-change coupling, and\n\
                   per-author activity.\n\n\
                   Examples:\n  \
                     churnlens files --path .               Files ranked by churn\n  \
                     churnlens modules --depth 2            Directory churn, two levels deep\n  \
                     churnlens coupling --min-co-changes 3  Files that change together\n  \
                     churnlens daily --after 2024-01-01     Per-day branch activity\n  \
                     churnlens report --format json         Everything, as JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .churnlens.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

/// Which history to read and how to filter it. Flags override the config file.
#[derive(Args, Clone, Debug)]
struct HistoryArgs {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Only count churn from commits on or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    after: Option<String>,

    /// Skip file changes whose lines-of-code count is zero or unknown
    #[arg(long)]
    ignore_cloc_zero: bool,

    /// Branch to walk (default: HEAD)
    #[arg(long)]
    branch: Option<String>,

    /// Walk every local branch
    #[arg(long, conflicts_with = "branch")]
    all_refs: bool,

    /// Attribute first-parent diffs to merge commits
    #[arg(long)]
    include_merge_diffs: bool,

    /// Maximum rows to show in text and markdown output (daily and tips keep the newest)
    #[arg(long)]
    limit: Option<usize>,

    /// Read commits from a JSON array (oldest-first) instead of a repository
    #[arg(
        long,
        conflicts_with_all = ["branch", "all_refs", "include_merge_diffs"],
        long_help = "Read commits from a JSON file instead of mining a repository.\n\n\
                     The file holds an array of commit records in camelCase, oldest-first:\n\
                     hash, parents, author, authorDate, committerDate, and files with\n\
                     path, linesAdded, linesDeleted, cloc."
    )]
    input: Option<PathBuf>,
}

impl HistoryArgs {
    fn apply(&self, config: &mut ChurnConfig) {
        if self.after.is_some() {
            config.history.after = self.after.clone();
        }
        if self.ignore_cloc_zero {
            config.history.ignore_cloc_zero = true;
        }
        if self.branch.is_some() {
            config.history.branch = self.branch.clone();
        }
        if self.all_refs {
            config.history.all_refs = true;
        }
        if self.include_merge_diffs {
            config.history.include_merge_diffs = true;
        }
        if let Some(limit) = self.limit {
            config.output.limit = limit;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Rank files by lines added plus deleted
    #[command(long_about = "Rank files by lines added plus deleted.\n\n\
        Counts commits and line churn per file inside the --after window, and tracks\n\
        each file's first and last commit date and latest lines-of-code count.\n\n\
        Examples:\n  churnlens files --path .\n  churnlens files --after 2024-01-01 --ignore-cloc-zero")]
    Files {
        #[command(flatten)]
        history: HistoryArgs,
    },
    /// Roll file churn up into directory modules
    #[command(long_about = "Roll file churn up into directory modules.\n\n\
        Every directory gets subtree totals (all files below it) and own totals\n\
        (files directly inside it). The repository root is reported as '.'.\n\n\
        Examples:\n  churnlens modules\n  churnlens modules --depth 1 --format markdown")]
    Modules {
        #[command(flatten)]
        history: HistoryArgs,

        /// Only show modules at most this many levels below the root
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Find files that change together
    #[command(long_about = "Find files that change together.\n\n\
        Counts, for every pair of files, how many change sets touched both. A change\n\
        set is one commit, or one calendar day with --window day.\n\n\
        Examples:\n  churnlens coupling --min-co-changes 3\n  churnlens coupling --window day")]
    Coupling {
        #[command(flatten)]
        history: HistoryArgs,

        /// Drop pairs that changed together fewer times than this
        #[arg(long)]
        min_co_changes: Option<u32>,

        /// Group files by commit or by calendar day
        #[arg(long)]
        window: Option<CoChangeWindow>,
    },
    /// Per-author churn and activity range
    Authors {
        #[command(flatten)]
        history: HistoryArgs,
    },
    /// Per-day branch topology and churn
    #[command(long_about = "Per-day branch topology and churn.\n\n\
        For each day: commits, open branch tips after the day, the change in tip\n\
        count, merges, and which tips never receive a child later in the range.")]
    Daily {
        #[command(flatten)]
        history: HistoryArgs,
    },
    /// Every commit with the branch tips open after it
    Tips {
        #[command(flatten)]
        history: HistoryArgs,
    },
    /// Run every analysis in one pass
    Report {
        #[command(flatten)]
        history: HistoryArgs,
    },
    /// Create a default .churnlens.toml configuration file
    #[command(long_about = "Create a default .churnlens.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .churnlens.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    let commands = [
        ("files", "Files ranked by churn"),
        ("modules", "Directory churn, subtree and own"),
        ("coupling", "Files that change together"),
        ("authors", "Churn and activity per author"),
        ("daily", "Per-day branch tips and churn"),
        ("tips", "Commit stream with open branch tips"),
        ("report", "Every analysis in one pass"),
        ("init", "Create default configuration"),
    ];

    if use_color {
        println!("\x1b[1mchurnlens\x1b[0m v{version}: commit-history analytics\n");
        println!("Quick start:");
        println!("  \x1b[36mchurnlens files --path .\x1b[0m      Rank files by churn");
        println!("  \x1b[36mchurnlens report\x1b[0m              Run every analysis\n");
        println!("All commands:");
        for (name, about) in commands {
            println!("  \x1b[32m{name:<9}\x1b[0m {about}");
        }
    } else {
        println!("churnlens v{version}: commit-history analytics\n");
        println!("Quick start:");
        println!("  churnlens files --path .      Rank files by churn");
        println!("  churnlens report              Run every analysis\n");
        println!("All commands:");
        for (name, about) in commands {
            println!("  {name:<9} {about}");
        }
    }

    println!("\nRun 'churnlens <command> --help' for details.");
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ChurnConfig> {
    match path {
        Some(path) => Ok(ChurnConfig::from_file(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(ChurnConfig::from_file(default_path)?)
            } else {
                Ok(ChurnConfig::default())
            }
        }
    }
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn load_commits(args: &HistoryArgs, config: &ChurnConfig) -> Result<Vec<CommitRecord>> {
    if let Some(input) = &args.input {
        let commits = read_commits(input)?;
        debug!(commits = commits.len(), input = %input.display(), "loaded commit records");
        return Ok(commits);
    }

    if git2::Repository::discover(&args.path).is_err() {
        miette::bail!(miette::miette!(
            help = "Run churnlens from inside a git repository, or pass --path or --input",
            "Not a git repository: {}",
            args.path.display()
        ));
    }

    let options = MiningOptions::from(&config.history);
    let pb = spinner(&format!("Mining history at {}", args.path.display()));
    let mined = mine_commits(&args.path, &options);
    if let Some(pb) = pb {
        match &mined {
            Ok(commits) => pb.finish_with_message(format!("Mined {} commits", commits.len())),
            Err(_) => pb.finish_with_message("Failed"),
        }
    }
    Ok(mined?)
}

fn analyze(args: &HistoryArgs, config: &ChurnConfig) -> Result<HistoryReport> {
    config.validate()?;
    let options = AnalysisOptions::from_config(config)?;
    let commits = load_commits(args, config)?;
    Ok(HistoryReport::build(commits, &options))
}

fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
    markdown: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", markdown()),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# churnlens configuration

[history]
# Only count churn from commits on or after this date (YYYY-MM-DD or RFC 3339)
# after = "2024-01-01"
# Skip file changes whose lines-of-code count is zero or unknown
# ignore_cloc_zero = false
# Branch to walk (default: HEAD)
# branch = "main"
# Walk every local branch
# all_refs = false
# Attribute first-parent diffs to merge commits
# include_merge_diffs = false

[coupling]
# Drop pairs that changed together fewer times than this
# min_co_changes = 1
# Group change sets by "commit" or "day"
# window = "commit"
# Log a warning for change sets touching more files than this
# large_commit_warning = 500

[output]
# Maximum rows shown in text and markdown tables
# limit = 20
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    debug!(format = %cli.format, "configuration loaded");

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Files { ref history }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report.files,
                || render::files_text(&report.files, limit),
                || render::files_markdown(&report.files, limit),
            )?;
        }
        Some(Command::Modules { ref history, depth }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            let modules: Vec<&ModuleChurn> = report
                .modules
                .iter()
                .filter(|m| depth.map_or(true, |d| m.depth <= d))
                .collect();
            emit(
                cli.format,
                &modules,
                || render::modules_text(&modules, limit),
                || render::modules_markdown(&modules, limit),
            )?;
        }
        Some(Command::Coupling {
            ref history,
            min_co_changes,
            window,
        }) => {
            history.apply(&mut config);
            if let Some(min) = min_co_changes {
                config.coupling.min_co_changes = min;
            }
            if let Some(window) = window {
                config.coupling.window = window;
            }
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report.coupling,
                || render::coupling_text(&report.coupling, limit),
                || render::coupling_markdown(&report.coupling, limit),
            )?;
        }
        Some(Command::Authors { ref history }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report.authors,
                || render::authors_text(&report.authors, limit),
                || render::authors_markdown(&report.authors, limit),
            )?;
        }
        Some(Command::Daily { ref history }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report.daily,
                || render::daily_text(&report.daily, limit),
                || render::daily_markdown(&report.daily, limit),
            )?;
        }
        Some(Command::Tips { ref history }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report.commits,
                || render::tips_text(&report.commits, limit),
                || render::tips_markdown(&report.commits, limit),
            )?;
        }
        Some(Command::Report { ref history }) => {
            history.apply(&mut config);
            let report = analyze(history, &config)?;
            let limit = config.output.limit;
            emit(
                cli.format,
                &report,
                || render::report_text(&report, limit),
                || render::report_markdown(&report, limit),
            )?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "churnlens", &mut std::io::stdout());
        }
    }

    Ok(())
}

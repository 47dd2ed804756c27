//! CLI entry point for `mailsmoke`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mailsmoke::config::Config;
use mailsmoke::library::AttachmentLibrary;
use mailsmoke::message::inspect::{self, MessageSummary};
use mailsmoke::message::{build_message, MessageOptions};
use mailsmoke::parser::spec;
use mailsmoke::template::{self, RenderContext};

#[derive(Parser)]
#[command(
    name = "mailsmoke",
    version,
    about = "Render email smoke-test messages from YAML templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a message spec into one or more messages
    Render {
        /// YAML spec template
        spec: PathBuf,
        /// Attachment library root (repeatable; defaults to config)
        #[arg(short, long = "library", value_name = "DIR")]
        libraries: Vec<PathBuf>,
        /// Write `.eml` files here instead of printing the message
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Seed for `fake` text
        #[arg(long)]
        seed: Option<u64>,
        /// Number of messages to render
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Print the rendered YAML and stop
        #[arg(long)]
        template_only: bool,
        /// Print a summary of each message instead of its source
        #[arg(long)]
        summary: bool,
        /// Summary as JSON (implies --summary)
        #[arg(long)]
        json: bool,
    },
    /// List the attachment library, optionally narrowed by filters
    Library {
        /// Attachment library root (repeatable; defaults to config)
        #[arg(short, long = "library", value_name = "DIR")]
        libraries: Vec<PathBuf>,
        /// Filter chain, e.g. `by_extension("pdf") | sample(2, 7)`
        #[arg(short, long, value_name = "FILTERS")]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file if none exists
    InitConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = mailsmoke::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Render {
            spec,
            libraries,
            output,
            seed,
            count,
            template_only,
            summary,
            json,
        } => cmd_render(
            &config,
            &spec,
            &libraries,
            RenderArgs {
                output,
                seed,
                count,
                template_only,
                summary: summary || json,
                json,
            },
        ),
        Commands::Library {
            libraries,
            query,
            json,
        } => cmd_library(&config, &libraries, query.as_deref(), json),
        Commands::InitConfig => cmd_init_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = mailsmoke::config::log_file_path(config);
    let log_dir = mailsmoke::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_name = log_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "mailsmoke.log".into());
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Save the current (default or loaded) config to the standard location.
fn cmd_init_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = mailsmoke::config::config_file_path() {
        if path.exists() {
            anyhow::bail!("Config already exists: {}", path.display());
        }
    }
    let path = mailsmoke::config::save_config(config)?;
    println!("{}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsmoke", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Scan the library roots behind a spinner.
fn load_library(config: &Config, roots: &[PathBuf]) -> anyhow::Result<(AttachmentLibrary, Duration)> {
    let roots = if roots.is_empty() {
        config.library.roots.as_slice()
    } else {
        roots
    };
    if roots.is_empty() {
        tracing::warn!("No library roots given; attachments queries will match nothing");
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Scanning library: {pos} files, {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let library = AttachmentLibrary::build_with_progress(
        roots,
        Some(&|files, bytes| {
            pb.set_position(files);
            pb.set_message(format_size(bytes, BINARY));
        }),
    );
    pb.finish_and_clear();

    Ok((library, start.elapsed()))
}

struct RenderArgs {
    output: Option<PathBuf>,
    seed: Option<u64>,
    count: usize,
    template_only: bool,
    summary: bool,
    json: bool,
}

/// Render a spec `count` times and print or save the results.
fn cmd_render(
    config: &Config,
    spec_path: &Path,
    roots: &[PathBuf],
    args: RenderArgs,
) -> anyhow::Result<()> {
    if !spec_path.exists() {
        anyhow::bail!("Spec file not found: {}", spec_path.display());
    }
    if args.count == 0 {
        anyhow::bail!("--count must be at least 1");
    }

    let source = std::fs::read_to_string(spec_path)?;
    let (library, _) = load_library(config, roots)?;
    let env = template::create_environment();
    let options = MessageOptions {
        domain: config.render.message_domain.clone(),
    };
    let base_seed = args.seed.or(config.render.seed);
    let output = args.output.or_else(|| config.render.output_dir.clone());

    let mut summaries = Vec::with_capacity(args.count);
    for i in 0..args.count {
        let seed = base_seed.map(|s| s.wrapping_add(i as u64));
        let ctx = RenderContext::new(library.clone()).with_fake_seed(seed);

        if args.template_only {
            print!("{}", template::render(&env, &source, &ctx)?);
            continue;
        }

        let parsed = spec::from_yaml(&env, &source, &ctx)
            .map_err(|e| anyhow::anyhow!("{}: {e}", spec_path.display()))?;
        let raw = build_message(&parsed, &options)?;

        if let Some(dir) = &output {
            let path = mailsmoke::export::eml::export_eml(
                &raw,
                parsed.headers.subject.as_deref(),
                dir,
            )?;
            if !args.summary {
                println!("{}", path.display());
            }
        } else if !args.summary {
            std::io::Write::write_all(&mut std::io::stdout(), &raw)?;
        }

        if args.summary {
            summaries.push(inspect::summarize(&raw)?);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary_table(summary);
        }
    }
    Ok(())
}

fn print_summary_table(summary: &MessageSummary) {
    println!();
    println!("  {:<14} {}", "Subject:", summary.subject.as_deref().unwrap_or("-"));
    println!("  {:<14} {}", "From:", summary.from.join(", "));
    println!("  {:<14} {}", "To:", summary.to.join(", "));
    println!("  {:<14} {}", "Date:", summary.date.as_deref().unwrap_or("-"));
    println!(
        "  {:<14} {}",
        "Message-ID:",
        summary.message_id.as_deref().unwrap_or("-")
    );
    println!("  {:<14} {} chars", "Body:", summary.body_chars);
    println!("  {:<14} {}", "Size:", format_size(summary.raw_size, BINARY));
    println!("  {:<14} {}", "Attachments:", summary.attachments.len());
    for att in &summary.attachments {
        println!(
            "    {:<40} {:<28} {:>10}",
            att.filename,
            att.content_type,
            format_size(att.size, BINARY)
        );
    }
}

/// List the library, or the result of a filter chain over it.
fn cmd_library(
    config: &Config,
    roots: &[PathBuf],
    query: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let (library, elapsed) = load_library(config, roots)?;
    let scanned = library.len();

    let picked = match query {
        Some(filters) => {
            let env = template::create_environment();
            template::query(&env, filters, &RenderContext::new(library))?
        }
        None => library,
    };

    if json {
        let items: Vec<serde_json::Value> = picked
            .iter()
            .map(|a| {
                serde_json::json!({
                    "path": a.display_path(),
                    "size": a.size,
                })
            })
            .collect();
        let out = serde_json::json!({
            "scanned": scanned,
            "matched": picked.len(),
            "total_size": picked.total_size(),
            "scan_time_ms": elapsed.as_millis(),
            "attachments": items,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for a in &picked {
        println!("{:>10}  {}", format_size(a.size, BINARY), a.display_path());
    }
    println!();
    println!(
        "  {} of {} files, {} ({:.2?})",
        picked.len(),
        scanned,
        format_size(picked.total_size(), BINARY),
        elapsed
    );
    Ok(())
}

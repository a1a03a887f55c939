//! CLI entry point for `mimeview`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use mimeview::config::{self, Config};
use mimeview::model::message::MessageInfo;
use mimeview::model::part::{format_index, parse_index};
use mimeview::parser::eml;
use mimeview::store::reader::MessageStore;
use mimeview::tui::app::MESSAGE_UID;
use mimeview::viewer::pipeline::{PipelineStatus, NO_FILTER_MESSAGE};
use mimeview::viewer::{compile_filters, flatten_parts, match_filter, render_part, select_alternative};

#[derive(Parser)]
#[command(
    name = "mimeview",
    version,
    about = "View multi-part MIME messages in the terminal",
    long_about = "View multi-part MIME messages in the terminal.\n\n\
        Each part is piped through the first matching filter command into the pager."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Message file (.eml) to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Configuration file to use instead of the default location
    #[arg(short, long, global = true, env = "MIMEVIEW_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write message headers into the pager before each part
    #[arg(long, global = true)]
    headers: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a message in the TUI
    Open { path: PathBuf },
    /// List the flattened part tree of a message
    Parts {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Render one part through its filter to stdout
    Show {
        path: PathBuf,
        /// Dotted index path of the part (e.g. 1.2); defaults to the preferred alternative
        #[arg(short, long, value_name = "INDEX")]
        part: Option<String>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
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

    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    if cli.headers {
        config.viewer.show_headers = true;
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config, !cli.runs_tui());

    match cli.command {
        Some(Commands::Open { path }) => cmd_open(&path, &config),
        Some(Commands::Parts { path, json }) => cmd_parts(&path, json, &config),
        Some(Commands::Show { path, part }) => cmd_show(&path, part.as_deref(), &config),
        Some(Commands::InitConfig { force }) => cmd_init_config(cli.config.as_deref(), force),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.file {
            Some(path) => cmd_open(&path, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

impl Cli {
    /// True when this invocation takes over the terminal.
    fn runs_tui(&self) -> bool {
        match &self.command {
            Some(Commands::Open { .. }) => true,
            Some(_) => false,
            None => self.file.is_some(),
        }
    }
}

/// Set up tracing with optional stderr output and file logging.
///
/// The TUI draws on the alternate screen in raw mode, so background
/// warnings must not reach stderr while it runs; they go to the log file.
fn setup_logging(level: &str, config: &Config, to_stderr: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer =
        to_stderr.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mimeview.log");
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

fn load(path: &Path) -> anyhow::Result<(Vec<u8>, MessageInfo)> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(eml::load_eml(path, MESSAGE_UID)?)
}

fn cmd_open(path: &Path, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    mimeview::tui::run_tui(path.to_path_buf(), config)
}

/// Print the flattened part list with the initial selection marked.
fn cmd_parts(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let (_, msg) = load(path)?;
    let parts = flatten_parts(&msg.body_structure);
    let selected = select_alternative(&parts, &config.viewer.alternatives);
    let rules = compile_filters(&config.filters);

    if json {
        let entries: Vec<serde_json::Value> = parts
            .iter()
            .enumerate()
            .map(|(i, handle)| {
                let filter = handle
                    .is_selectable()
                    .then(|| match_filter(&rules, &handle.part, &msg).map(|r| r.command.clone()))
                    .flatten();
                serde_json::json!({
                    "kind": handle.kind,
                    "index": handle.index,
                    "mime": handle.part.mime(),
                    "filename": handle.part.filename(),
                    "encoding": handle.part.encoding,
                    "size": handle.part.size,
                    "selected": selected == Some(i),
                    "filter": filter,
                })
            })
            .collect();
        let out = serde_json::json!({
            "file": path.to_string_lossy(),
            "subject": msg.envelope.subject,
            "parts": entries,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {:<10} {}", "File", path.display());
    println!("  {:<10} {}", "Subject", msg.envelope.subject);
    println!();
    for (i, handle) in parts.iter().enumerate() {
        let cursor = if selected == Some(i) { ">" } else { " " };
        let indent = "  ".repeat(handle.index.len());
        if handle.is_selectable() {
            let filter = match match_filter(&rules, &handle.part, &msg) {
                Some(rule) if rule.is_passthrough() => "direct".to_string(),
                Some(rule) => rule.command.clone(),
                None => "-".to_string(),
            };
            println!(
                "{cursor} {:<8} {indent}{:<40} {:>10}  {filter}",
                format_index(&handle.index),
                handle.label(),
                format_size(handle.part.size, BINARY),
            );
        } else {
            println!(
                "{cursor} {:<8} {indent}{}",
                format_index(&handle.index),
                handle.label()
            );
        }
    }
    println!();
    Ok(())
}

/// Render one part to stdout through the same pipeline the TUI uses.
fn cmd_show(path: &Path, part: Option<&str>, config: &Config) -> anyhow::Result<()> {
    let (raw, msg) = load(path)?;
    let index = match part {
        Some(text) => Some(
            parse_index(text).ok_or_else(|| anyhow::anyhow!("Invalid part index: {text}"))?,
        ),
        None => None,
    };
    let store = Arc::new(MessageStore::new(MESSAGE_UID, raw));

    match render_part(&msg, store.as_ref(), config, index.as_deref(), std::io::stdout())? {
        PipelineStatus::Unsupported => anyhow::bail!("{NO_FILTER_MESSAGE}"),
        PipelineStatus::Failed(reason) => anyhow::bail!(reason),
        _ => Ok(()),
    }
}

/// Write the built-in configuration to `path` or the standard location.
fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&config::default_config(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimeview", &mut std::io::stdout());
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

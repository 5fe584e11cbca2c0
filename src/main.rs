//! CLI entry point for `eml2md`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use eml2md::config::Config;
use eml2md::convert::{self, Converter};
use eml2md::error::{ConvertError, FailureClass};
use eml2md::model::artifact::ConversionOutcome;
use eml2md::store::listing;

#[derive(Parser)]
#[command(name = "eml2md", version, about = "Convert .eml messages into Markdown project notes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// General project root (overrides the config file)
    #[arg(long, global = true, env = "EML2MD_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Name of the inbox folder inside the root (overrides the config file)
    #[arg(long, global = true, value_name = "NAME")]
    inbox_folder: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more .eml files (use `-` to read stdin)
    Convert {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Target project name
        #[arg(short, long)]
        project: String,
    },
    /// Show parsed metadata of a message without storing it
    Inspect { file: PathBuf },
    /// List existing projects
    Projects,
    /// List stored messages of a project
    List { project: String },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, config_origin) = eml2md::config::load_config();
    if let Some(root) = cli.root.clone() {
        config.storage.root_folder = root;
    }
    if let Some(inbox) = cli.inbox_folder.clone() {
        config.storage.inbox_folder = inbox;
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);
    config_origin.report();

    match run(&cli, &config) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e, cli.json);
            exit_code(&e)
        }
    }
}

fn run(cli: &Cli, config: &Config) -> Result<ExitCode, anyhow::Error> {
    match &cli.command {
        Commands::Convert { files, project } => cmd_convert(config, files, project, cli.json),
        Commands::Inspect { file } => cmd_inspect(file, cli.json).map(|()| ExitCode::SUCCESS),
        Commands::Projects => cmd_projects(config, cli.json).map(|()| ExitCode::SUCCESS),
        Commands::List { project } => {
            cmd_list(config, project, cli.json).map(|()| ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => cmd_completions(*shell).map(|()| ExitCode::SUCCESS),
        Commands::Manpage => cmd_manpage().map(|()| ExitCode::SUCCESS),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = eml2md::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "eml2md.log");
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

/// Exit code for a failure class.
fn class_exit_code(class: FailureClass) -> ExitCode {
    match class {
        FailureClass::Internal => ExitCode::from(1),
        FailureClass::InvalidInput => ExitCode::from(2),
        FailureClass::Conflict => ExitCode::from(3),
        FailureClass::NotFound => ExitCode::from(4),
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ConvertError>() {
        Some(e) => class_exit_code(e.class()),
        None => ExitCode::from(1),
    }
}

/// Print an error either as a JSON object or as a plain message on stderr.
fn report_error(err: &anyhow::Error, json: bool) {
    if json {
        let (kind, status) = match err.downcast_ref::<ConvertError>() {
            Some(e) => (e.kind(), e.class().status_code()),
            None => ("internal", 500),
        };
        println!(
            "{}",
            serde_json::json!({
                "status": "error",
                "kind": kind,
                "code": status,
                "detail": err.to_string(),
            })
        );
    } else {
        eprintln!("error: {err:#}");
    }
}

/// Convert files (or stdin) into a project.
fn cmd_convert(
    config: &Config,
    files: &[PathBuf],
    project: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let converter = Converter::new(config);

    if let [single] = files {
        let outcome = convert_one(&converter, single, project)?;
        print_outcome(&outcome, json)?;
        return Ok(ExitCode::SUCCESS);
    }

    // Reject a bad project name once instead of per file.
    convert::validate_project_name(project)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Converting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let mut outcomes = Vec::new();
    let mut failures: Vec<(PathBuf, ConvertError)> = Vec::new();
    for path in files {
        match convert_one(&converter, path, project) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Conversion failed");
                failures.push((path.clone(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if json {
        let errors: Vec<serde_json::Value> = failures
            .iter()
            .map(|(path, e)| {
                serde_json::json!({
                    "file": path.to_string_lossy(),
                    "kind": e.kind(),
                    "code": e.class().status_code(),
                    "detail": e.to_string(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "converted": outcomes,
                "failed": errors,
            }))?
        );
    } else {
        for outcome in &outcomes {
            print_outcome(outcome, false)?;
        }
        for (path, e) in &failures {
            eprintln!("  {}: {e}", path.display());
        }
        println!(
            "  Converted {} of {} message(s)",
            outcomes.len(),
            files.len()
        );
    }

    Ok(match failures.first() {
        None => ExitCode::SUCCESS,
        Some((_, e)) => class_exit_code(e.class()),
    })
}

fn convert_one(
    converter: &Converter,
    path: &Path,
    project: &str,
) -> Result<ConversionOutcome, ConvertError> {
    if path == Path::new("-") {
        converter.convert(&mut std::io::stdin().lock(), project)
    } else {
        converter.convert_file(path, project)
    }
}

fn print_outcome(outcome: &ConversionOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!("  {:<14} {}", "Project", outcome.project_name);
    println!("  {:<14} {}", "File", outcome.path.display());
    if outcome.created_project {
        println!("  {:<14} yes", "New project");
    }
    if !outcome.saved_attachments.is_empty() {
        println!(
            "  {:<14} {}",
            "Attachments",
            outcome.saved_attachments.join(", ")
        );
    }
    if !outcome.skipped_attachments.is_empty() {
        println!(
            "  {:<14} {}",
            "Skipped",
            outcome.skipped_attachments.join(", ")
        );
    }
    Ok(())
}

/// Print the parsed metadata of a message.
fn cmd_inspect(file: &Path, json: bool) -> anyhow::Result<()> {
    let mut input = std::fs::File::open(file).map_err(|e| ConvertError::io(file, e))?;
    let message = convert::inspect(&mut input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<12} {}", "Subject", message.subject);
    println!("  {:<12} {}", "From", message.sender_address);
    println!("  {:<12} {}", "To", message.recipients.join(", "));
    if !message.cc_recipients.is_empty() {
        println!("  {:<12} {}", "Cc", message.cc_recipients.join(", "));
    }
    println!("  {:<12} {}", "Date", message.sent_at.to_rfc3339());
    println!(
        "  {:<12} {}",
        "Body",
        if message.body_html.is_empty() {
            "text"
        } else {
            "html"
        }
    );

    if !message.attachments.is_empty() {
        println!();
        println!("  {:<40} {:<30} {:>10}", "Attachment", "Type", "Size");
        println!("  {}", "-".repeat(82));
        for att in &message.attachments {
            let name: String = att.filename.chars().take(39).collect();
            println!(
                "  {:<40} {:<30} {:>10}",
                name,
                att.content_type,
                format_size(att.size_bytes, BINARY)
            );
        }
    }

    if !message.inline_images.is_empty() {
        println!();
        for img in &message.inline_images {
            println!("  inline  {} <{}> {}", img.filename, img.content_id, img.content_type);
        }
    }
    println!();
    Ok(())
}

/// List projects under both roots.
fn cmd_projects(config: &Config, json: bool) -> anyhow::Result<()> {
    let projects = listing::list_projects(&config.storage.roots())?;

    if json {
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "projects": names }))?
        );
        return Ok(());
    }

    for project in &projects {
        let marker = if project.in_inbox { " (inbox)" } else { "" };
        println!("  {}{marker}", project.name);
    }
    Ok(())
}

/// List stored messages of one project.
fn cmd_list(config: &Config, project: &str, json: bool) -> anyhow::Result<()> {
    let name = convert::validate_project_name(project)?;
    let artifacts = listing::list_artifacts(&name, &config.storage.roots())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "project_name": name,
                "emails": artifacts,
            }))?
        );
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    for artifact in &artifacts {
        println!(
            "  {:<70} {:>10}",
            artifact.filename,
            format_size(artifact.size_bytes, BINARY)
        );
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "eml2md", &mut std::io::stdout());
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

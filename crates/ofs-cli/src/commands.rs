use std::process::ExitCode;

use anyhow::Context;
use colored::{ColoredString, Colorize};
use ofs_dirstate::{AddRemoveError, Status, StatusCode};
use ofs_types::{canonicalize, canonicalize_with_base, getcwd, resolve_real_path, AbsolutePath, RelativePath};
use ofs_workdir::Workdir;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Status(args) => cmd_status(args, &format),
        Command::Add(args) => cmd_add(args),
        Command::Rm(args) => cmd_rm(args),
        Command::Snapshot(_) => cmd_snapshot(),
        Command::Canonicalize(args) => cmd_canonicalize(args),
        Command::Realpath(args) => cmd_realpath(args),
        Command::DebugStatus(_) => cmd_debug_status(),
    }
}

/// The working copy containing the process working directory.
fn open_here() -> anyhow::Result<(Workdir, AbsolutePath)> {
    let cwd = getcwd()?;
    let workdir = Workdir::discover(cwd.as_path())?;
    debug!(root = %workdir.root(), cwd = %cwd, "working copy found");
    Ok((workdir, cwd))
}

fn resolve_paths(workdir: &Workdir, cwd: &AbsolutePath, paths: &[String]) -> anyhow::Result<Vec<RelativePath>> {
    paths
        .iter()
        .map(|p| workdir.relativize(p, cwd).with_context(|| format!("invalid path {p:?}")))
        .collect()
}

/// One stderr line per error; exit 1 if there were any.
fn report(errors: &[AddRemoveError]) -> ExitCode {
    for err in errors {
        eprintln!("{}", err.to_string().red());
    }
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn paint(code: StatusCode, text: String) -> ColoredString {
    match code {
        StatusCode::Modified => text.blue(),
        StatusCode::Added => text.green(),
        StatusCode::Removed => text.red(),
        StatusCode::Missing => text.cyan().bold(),
        StatusCode::NotTracked => text.magenta(),
        StatusCode::Ignored => text.dimmed(),
        StatusCode::Clean => text.normal(),
    }
}

fn print_status(status: &Status) {
    for (path, code) in status.iter() {
        println!("{}", paint(code, format!("{} {}", code.as_char(), path)));
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<ExitCode> {
    let path = args.path.unwrap_or_else(|| ".".into());
    let workdir = Workdir::init(&path).with_context(|| format!("cannot initialize {path}"))?;
    println!("{} Initialized ofs working copy in {}", "✓".green().bold(), workdir.root().to_string().bold());
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(args: StatusArgs, format: &OutputFormat) -> anyhow::Result<ExitCode> {
    let (workdir, _) = open_here()?;
    let status = workdir.status(args.ignored)?;
    match format {
        OutputFormat::Text => print_status(&status),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status.to_wire())?),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    let (workdir, cwd) = open_here()?;
    let paths = resolve_paths(&workdir, &cwd, &args.paths)?;
    let errors = workdir.add(&paths)?;
    Ok(report(&errors))
}

fn cmd_rm(args: RmArgs) -> anyhow::Result<ExitCode> {
    let (workdir, cwd) = open_here()?;
    let paths = resolve_paths(&workdir, &cwd, &args.paths)?;
    let errors = workdir.remove(&paths, args.force)?;
    Ok(report(&errors))
}

fn cmd_snapshot() -> anyhow::Result<ExitCode> {
    let (workdir, _) = open_here()?;
    let summary = workdir.snapshot()?;
    println!("{} Snapshot {}", "✓".green().bold(), summary.root_id.short_hex().yellow());
    println!(
        "  {} added, {} modified, {} removed",
        summary.added.to_string().green(),
        summary.modified.to_string().blue(),
        summary.removed.to_string().red()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_canonicalize(args: CanonicalizeArgs) -> anyhow::Result<ExitCode> {
    let path = match &args.base {
        Some(base) => {
            if !base.starts_with('/') {
                anyhow::bail!("--base must be an absolute path, got {base:?}");
            }
            let base = canonicalize_with_base(base, &AbsolutePath::root());
            canonicalize_with_base(&args.path, &base)
        }
        None => canonicalize(&args.path)?,
    };
    println!("{path}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_realpath(args: RealpathArgs) -> anyhow::Result<ExitCode> {
    println!("{}", resolve_real_path(&args.path)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_debug_status() -> anyhow::Result<ExitCode> {
    let (workdir, _) = open_here()?;
    println!("root: {}", workdir.root());
    match workdir.head()? {
        Some(id) => println!("head: {id}"),
        None => println!("head: (none)"),
    }
    print!("{}", workdir.status(true)?);
    let directives = workdir.directives()?;
    println!("directives: {}", directives.len());
    for (path, directive) in &directives {
        println!("  {directive} {path}");
    }
    Ok(ExitCode::SUCCESS)
}

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ofs",
    about = "Overlay working copy: status, add, remove and snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a working copy in a directory
    Init(InitArgs),
    /// Show changed, added, removed, missing and untracked files
    Status(StatusArgs),
    /// Start tracking files at the next snapshot
    Add(AddArgs),
    /// Stop tracking files at the next snapshot
    Rm(RmArgs),
    /// Record the working copy as the new base snapshot
    Snapshot(SnapshotArgs),
    /// Lexically normalize a path
    Canonicalize(CanonicalizeArgs),
    /// Resolve a path on disk, following symlinks
    Realpath(RealpathArgs),
    /// Dump the raw status listing and pending directives
    DebugStatus(DebugStatusArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Also list ignored files
    #[arg(short, long)]
    pub ignored: bool,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Remove even if the file has uncommitted changes
    #[arg(short, long)]
    pub force: bool,
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct SnapshotArgs {}

#[derive(Args)]
pub struct CanonicalizeArgs {
    pub path: String,
    /// Absolute base for relative input (defaults to the working directory)
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args)]
pub struct RealpathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct DebugStatusArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["ofs", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(InitArgs { path: None })));
    }

    #[test]
    fn parse_init_path() {
        let cli = Cli::try_parse_from(["ofs", "init", "/tmp/wc"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.path, Some("/tmp/wc".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_status_ignored() {
        let cli = Cli::try_parse_from(["ofs", "status", "-i"]).unwrap();
        if let Command::Status(args) = cli.command {
            assert!(args.ignored);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_add_many() {
        let cli = Cli::try_parse_from(["ofs", "add", "a", "dir/b"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.paths, vec!["a", "dir/b"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn add_requires_a_path() {
        assert!(Cli::try_parse_from(["ofs", "add"]).is_err());
    }

    #[test]
    fn parse_rm_force() {
        let cli = Cli::try_parse_from(["ofs", "rm", "-f", "x"]).unwrap();
        if let Command::Rm(args) = cli.command {
            assert!(args.force);
            assert_eq!(args.paths, vec!["x"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_canonicalize_with_base() {
        let cli = Cli::try_parse_from(["ofs", "canonicalize", "a/../b", "--base", "/x/y"]).unwrap();
        if let Command::Canonicalize(args) = cli.command {
            assert_eq!(args.path, "a/../b");
            assert_eq!(args.base, Some("/x/y".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_debug_status() {
        let cli = Cli::try_parse_from(["ofs", "debug-status"]).unwrap();
        assert!(matches!(cli.command, Command::DebugStatus(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["ofs", "--verbose", "snapshot"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["ofs", "--format", "json", "status"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}

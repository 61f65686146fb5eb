use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitdav",
    about = "Read-only WebDAV view of git branch heads",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Server configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the DAV server
    Serve(ServeArgs),
    /// List a directory
    Ls(LsArgs),
    /// Print a file's content
    Cat(EntryArgs),
    /// Show an entry's metadata
    Stat(EntryArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct EntryArgs {
    /// Request path, e.g. /org/repo/_dav/README.md
    pub path: String,
    /// Act as this configured user instead of anonymously
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct LsArgs {
    #[command(flatten)]
    pub entry: EntryArgs,
    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["gitdav", "serve", "--config", "gitdav.toml", "--bind", "0.0.0.0:8080"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gitdav.toml")));
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_ls_with_limit() {
        let cli = Cli::try_parse_from(["gitdav", "ls", "/org/repo/_dav", "-n", "5", "--user", "alice"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.entry.path, "/org/repo/_dav");
            assert_eq!(args.entry.user.as_deref(), Some("alice"));
            assert_eq!(args.limit, Some(5));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_cat() {
        let cli = Cli::try_parse_from(["gitdav", "cat", "/org/repo/_dav/a.txt"]).unwrap();
        if let Command::Cat(args) = cli.command {
            assert_eq!(args.path, "/org/repo/_dav/a.txt");
            assert!(args.user.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_stat() {
        let cli = Cli::try_parse_from(["gitdav", "stat", "/org/repo/_dav"]).unwrap();
        assert!(matches!(cli.command, Command::Stat(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["gitdav", "--verbose", "stat", "/x"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["gitdav", "--format", "json", "stat", "/x"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use gitdav_gate::{PermissionGate, Requester, StaticDirectory};
use gitdav_server::{DavServer, ServerConfig};
use gitdav_store::GitRepositoryStorage;
use gitdav_vfs::{Metadata, VirtualFileSystem};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Ls(args) => cmd_ls(&config, args, &cli.format),
        Command::Cat(args) => cmd_cat(&config, args),
        Command::Stat(args) => cmd_stat(&config, args, &cli.format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    let server = DavServer::new(config)?;
    println!(
        "{} gitdav serving {} on {}",
        "✓".green().bold(),
        server.config().repos_root.display().to_string().bold(),
        server.config().bind_addr.to_string().cyan()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

/// Build the facade the server would use, straight from configuration.
fn open_vfs(config: &ServerConfig) -> anyhow::Result<VirtualFileSystem> {
    let directory = StaticDirectory::from_config(&config.directory)?;
    let gate = PermissionGate::new(Arc::new(directory), config.gate_config());
    let storage = Arc::new(GitRepositoryStorage::new(&config.repos_root));
    Ok(VirtualFileSystem::new(&config.vfs, gate, storage)?)
}

/// The requester for `--user`, carrying the admin flag from configuration.
fn requester(config: &ServerConfig, user: Option<&str>) -> Requester {
    let Some(name) = user else {
        return Requester::anonymous();
    };
    match config.directory.users.iter().find(|u| u.name == name) {
        Some(u) if u.admin => Requester::admin(name),
        _ => Requester::user(name),
    }
}

fn cmd_ls(config: &ServerConfig, args: LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let vfs = open_vfs(config)?;
    let who = requester(config, args.entry.user.as_deref());
    let mut node = vfs.open_entry(&who, &args.entry.path)?;

    let limit = args.limit.unwrap_or(0);
    let entries = node.list(limit)?;
    let truncated = limit > 0 && !node.list(1)?.is_empty();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
            if truncated {
                println!("{}", "(more entries not shown)".dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_cat(config: &ServerConfig, args: EntryArgs) -> anyhow::Result<()> {
    let vfs = open_vfs(config)?;
    let who = requester(config, args.user.as_deref());
    let mut file = vfs.open_entry(&who, &args.path)?.into_file()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    std::io::copy(&mut file, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_stat(config: &ServerConfig, args: EntryArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let vfs = open_vfs(config)?;
    let who = requester(config, args.user.as_deref());
    let meta = vfs.stat(&who, &args.path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&meta)?),
        OutputFormat::Text => {
            let kind = if meta.is_directory { "directory" } else { "file" };
            println!("  Name: {}", meta.name.bold());
            println!("  Kind: {}", kind.cyan());
            println!("  Size: {}", meta.size);
            println!("  Mode: {}", meta.mode);
            println!("  Modified: {}", meta.mod_time.to_rfc3339().yellow());
            println!("  Object: {}", meta.object_id.to_hex().dimmed());
        }
    }
    Ok(())
}

fn format_entry(entry: &Metadata) -> String {
    let name = if entry.is_directory {
        format!("{}/", entry.name).blue().bold().to_string()
    } else {
        entry.name.clone()
    };
    format!(
        "{} {:>10} {} {}",
        entry.mode,
        entry.size,
        entry.object_id.short_hex().dimmed(),
        name
    )
}

//! CLI argument parsing for Treecast
//!
//! Defines the Command enum and parse_args() function for both commands.

use anyhow::Result;
use std::path::PathBuf;

pub fn print_usage() {
    eprintln!("Treecast - directory tree replication over TCP");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  treecast <command> [arguments]");
    eprintln!("  treecast --help");
    eprintln!();
    eprintln!("  treecast serve --root <DIR> --port <PORT> [--max-clients <N>]");
    eprintln!("  treecast follow --root <DIR> --server <HOST:PORT> [--ignore <LIST> | --ignore-file <FILE>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  serve     Watch a directory and stream its changes to connected clients");
    eprintln!("  follow    Connect to a server and replicate its changes locally");
    eprintln!();
    eprintln!("Serve arguments:");
    eprintln!("  --root <DIR>        Directory tree to replicate");
    eprintln!("  --port <PORT>       TCP port to listen on");
    eprintln!("  --max-clients <N>   Maximum concurrent clients (default: 5)");
    eprintln!();
    eprintln!("Follow arguments:");
    eprintln!("  --root <DIR>        Local directory receiving the replica");
    eprintln!("  --server <ADDR>     Server address as host:port");
    eprintln!("  --ignore <LIST>     Comma-separated extensions to skip (e.g. .mp4,.zip)");
    eprintln!("  --ignore-file <FILE> File of whitespace-separated extensions to skip");
}

pub enum Command {
    Serve {
        root: PathBuf,
        port: u16,
        max_clients: usize,
    },
    Follow {
        root: PathBuf,
        server: String,
        ignore: Option<String>,
        ignore_file: Option<PathBuf>,
    },
}

pub fn parse_args_impl<F>(print_version: F) -> Result<Command>
where
    F: FnOnce(),
{
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    // Handle --version and -V flags
    if command == "--version" || command == "-V" {
        print_version();
        std::process::exit(0);
    }

    // Handle --help and -h flags
    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    match command.as_str() {
        "serve" => {
            let mut root: Option<PathBuf> = None;
            let mut port: Option<u16> = None;
            let mut max_clients: usize = 5;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--root requires an argument"));
                        }
                        root = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    "--port" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--port requires an argument"));
                        }
                        port = Some(args[i + 1].parse()?);
                        i += 2;
                    }
                    "--max-clients" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--max-clients requires an argument"));
                        }
                        max_clients = args[i + 1].parse()?;
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            let root = root.ok_or_else(|| anyhow::anyhow!("--root is required"))?;
            let port = port.ok_or_else(|| anyhow::anyhow!("--port is required"))?;

            Ok(Command::Serve {
                root,
                port,
                max_clients,
            })
        }
        "follow" => {
            let mut root: Option<PathBuf> = None;
            let mut server: Option<String> = None;
            let mut ignore: Option<String> = None;
            let mut ignore_file: Option<PathBuf> = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--root requires an argument"));
                        }
                        root = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    "--server" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--server requires an argument"));
                        }
                        server = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--ignore" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--ignore requires an argument"));
                        }
                        ignore = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--ignore-file" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--ignore-file requires an argument"));
                        }
                        ignore_file = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            let root = root.ok_or_else(|| anyhow::anyhow!("--root is required"))?;
            let server = server.ok_or_else(|| anyhow::anyhow!("--server is required"))?;
            if ignore.is_some() && ignore_file.is_some() {
                return Err(anyhow::anyhow!(
                    "--ignore and --ignore-file are mutually exclusive"
                ));
            }

            Ok(Command::Follow {
                root,
                server,
                ignore,
                ignore_file,
            })
        }
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}

/// Convenience wrapper around parse_args_impl that uses the version module
pub fn parse_args() -> Result<Command> {
    parse_args_impl(|| println!("{}", treecast::version::version()))
}

//! Treecast CLI - directory tree replication over TCP
//!
//! Usage: treecast <command> [arguments]

mod cli;
mod follow_cmd;
mod serve_cmd;

use std::process::ExitCode;

use cli::Command;

fn main() -> ExitCode {
    let command = match cli::parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_usage();
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Serve {
            root,
            port,
            max_clients,
        } => serve_cmd::run_serve(root, port, max_clients),
        Command::Follow {
            root,
            server,
            ignore,
            ignore_file,
        } => follow_cmd::run_follow(root, server, ignore, ignore_file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

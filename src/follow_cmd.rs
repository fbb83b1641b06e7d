//! Follow command implementation

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use treecast::{client, read_ignore_file, FollowConfig};

pub fn run_follow(
    root: PathBuf,
    server: String,
    ignore: Option<String>,
    ignore_file: Option<PathBuf>,
) -> Result<()> {
    // Create shutdown flag
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // Register signal handlers for SIGINT and SIGTERM. The reader blocks on
    // the socket indefinitely, so shutdown here is by process termination.
    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;

        std::thread::spawn(move || {
            for _ in &mut signals {
                shutdown_clone.store(true, Ordering::SeqCst);
                std::process::exit(0);
            }
        });
    }

    let ignore_list = match (ignore, ignore_file) {
        (Some(list), None) => list,
        (None, Some(path)) => read_ignore_file(&path)?,
        (None, None) => String::new(),
        (Some(_), Some(_)) => unreachable!("rejected during argument parsing"),
    };

    let config = FollowConfig {
        root,
        server,
        ignore_list,
    };
    client::run(&config, shutdown)
}

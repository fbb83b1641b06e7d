//! Serve command implementation

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use treecast::{ServeConfig, SyncServer};

pub fn run_serve(root: PathBuf, port: u16, max_clients: usize) -> Result<()> {
    // Create shutdown flag
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // Register signal handlers for SIGINT and SIGTERM
    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;

        std::thread::spawn(move || {
            for _ in &mut signals {
                shutdown_clone.store(true, Ordering::SeqCst);
                break;
            }
        });
    }

    let config = ServeConfig {
        root,
        port,
        max_clients,
    };
    let server = SyncServer::bind(&config)?;

    println!(
        "Treecast serving {} on port {} ({} directories watched, up to {} clients)",
        config.root.display(),
        server.local_addr()?.port(),
        server.watch_count(),
        config.max_clients
    );

    server.run(shutdown)
}

//! End-to-end replication tests: a real server and real followers over
//! localhost TCP, exercising the whole pipeline from raw notification to
//! replicated filesystem state.

use std::fs;
use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use treecast::{client, FollowConfig, ServeConfig, SyncServer};

/// Helper: poll until a condition holds or the timeout elapses
fn wait_until<F: Fn() -> bool>(timeout_ms: u64, condition: F) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        sleep(Duration::from_millis(50));
    }
}

fn file_equals(path: &Path, expected: &[u8]) -> bool {
    fs::read(path).map(|content| content == expected).unwrap_or(false)
}

struct Harness {
    server_root: PathBuf,
    server_addr: String,
    shutdown: Arc<AtomicBool>,
    _server_dir: TempDir,
}

impl Harness {
    fn start(max_clients: usize) -> Self {
        let server_dir = TempDir::new().unwrap();
        let server_root = server_dir.path().canonicalize().unwrap();

        let server = SyncServer::bind(&ServeConfig {
            root: server_root.clone(),
            port: 0,
            max_clients,
        })
        .unwrap();
        let port = server.local_addr().unwrap().port();

        let shutdown = Arc::new(AtomicBool::new(false));
        let server_shutdown = Arc::clone(&shutdown);
        thread::spawn(move || server.run(server_shutdown).unwrap());

        Self {
            server_root,
            server_addr: format!("127.0.0.1:{}", port),
            shutdown,
            _server_dir: server_dir,
        }
    }

    /// Connect a follower replicating into a fresh directory. The returned
    /// TempDir keeps the replica alive for the duration of the test.
    fn follower(&self, ignore_list: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let config = FollowConfig {
            root: root.clone(),
            server: self.server_addr.clone(),
            ignore_list: ignore_list.to_string(),
        };
        let shutdown = Arc::new(AtomicBool::new(false));
        thread::spawn(move || client::run(&config, shutdown));
        (dir, root)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[test]
fn test_replication_with_per_client_filters() {
    let harness = Harness::start(5);
    // Let the watcher and accept loop settle
    sleep(Duration::from_millis(300));

    let (_filtered_dir, filtered) = harness.follower(".mp4,.zip");
    let (_unfiltered_dir, unfiltered) = harness.follower("");
    sleep(Duration::from_millis(500));

    // File creation replicates byte-identically to both clients
    fs::write(harness.server_root.join("notes.txt"), b"hello").unwrap();
    assert!(
        wait_until(5000, || file_equals(&filtered.join("notes.txt"), b"hello")),
        "filtered client should receive notes.txt"
    );
    assert!(
        wait_until(5000, || file_equals(&unfiltered.join("notes.txt"), b"hello")),
        "unfiltered client should receive notes.txt"
    );

    // An ignored extension reaches only the client that does not filter it
    fs::write(harness.server_root.join("clip.mp4"), b"video-bytes").unwrap();
    assert!(wait_until(5000, || file_equals(
        &unfiltered.join("clip.mp4"),
        b"video-bytes"
    )));

    // Marker file: once the filtered client has it, clip.mp4 would already
    // have arrived there if it had ever been sent
    fs::write(harness.server_root.join("marker.txt"), b"m").unwrap();
    assert!(wait_until(5000, || file_equals(
        &filtered.join("marker.txt"),
        b"m"
    )));
    assert!(
        !filtered.join("clip.mp4").exists(),
        "ignored extension must not reach the filtering client"
    );

    // Directory creation
    fs::create_dir(harness.server_root.join("assets")).unwrap();
    assert!(wait_until(5000, || filtered.join("assets").is_dir()));
    assert!(wait_until(5000, || unfiltered.join("assets").is_dir()));

    // A file inside the new directory (the dynamically registered watch)
    fs::write(harness.server_root.join("assets/logo.txt"), b"logo").unwrap();
    assert!(wait_until(5000, || file_equals(
        &unfiltered.join("assets/logo.txt"),
        b"logo"
    )));

    // Rename within the tree: both halves arrive inside the correlation
    // window and become a rename with content preserved
    fs::rename(
        harness.server_root.join("notes.txt"),
        harness.server_root.join("renamed.txt"),
    )
    .unwrap();
    assert!(wait_until(5000, || file_equals(
        &unfiltered.join("renamed.txt"),
        b"hello"
    )));
    assert!(wait_until(5000, || !unfiltered.join("notes.txt").exists()));

    // Recursive directory deletion
    fs::remove_dir_all(harness.server_root.join("assets")).unwrap();
    assert!(wait_until(5000, || !unfiltered.join("assets").exists()));
    assert!(wait_until(5000, || !filtered.join("assets").exists()));
}

#[test]
fn test_directory_moved_in_from_outside_is_snapshotted() {
    let harness = Harness::start(5);
    sleep(Duration::from_millis(300));

    let (_replica_dir, replica) = harness.follower("");
    sleep(Duration::from_millis(500));

    // Build a subtree outside the watched root, then move it in atomically
    let staging = TempDir::new().unwrap();
    fs::create_dir_all(staging.path().join("pack/sub")).unwrap();
    fs::write(staging.path().join("pack/top.txt"), b"top").unwrap();
    fs::write(staging.path().join("pack/sub/deep.txt"), b"deep").unwrap();
    fs::rename(staging.path().join("pack"), harness.server_root.join("pack")).unwrap();

    // The follower ends up with the same tree as if each item had been
    // created individually
    assert!(wait_until(8000, || file_equals(
        &replica.join("pack/top.txt"),
        b"top"
    )));
    assert!(wait_until(8000, || file_equals(
        &replica.join("pack/sub/deep.txt"),
        b"deep"
    )));

    // The snapshot also registered watches: mutations inside the moved-in
    // subtree keep replicating
    fs::write(harness.server_root.join("pack/sub/late.txt"), b"late").unwrap();
    assert!(wait_until(8000, || file_equals(
        &replica.join("pack/sub/late.txt"),
        b"late"
    )));
}

#[test]
fn test_move_out_of_tree_becomes_delete_after_timeout() {
    let harness = Harness::start(5);
    sleep(Duration::from_millis(300));

    let (_replica_dir, replica) = harness.follower("");
    sleep(Duration::from_millis(500));

    fs::write(harness.server_root.join("leaving.txt"), b"bye").unwrap();
    assert!(wait_until(5000, || file_equals(
        &replica.join("leaving.txt"),
        b"bye"
    )));

    // Rename out of the watched tree: only MOVED_FROM reaches the client
    let outside = TempDir::new().unwrap();
    fs::rename(
        harness.server_root.join("leaving.txt"),
        outside.path().join("leaving.txt"),
    )
    .unwrap();

    // After the correlation window the unmatched move resolves as a delete
    assert!(
        wait_until(8000, || !replica.join("leaving.txt").exists()),
        "unmatched MOVED_FROM should delete the old path after the window"
    );
}

#[test]
fn test_capacity_limit_refuses_excess_clients() {
    let harness = Harness::start(1);
    sleep(Duration::from_millis(300));

    let first = TcpStream::connect(&harness.server_addr).unwrap();
    sleep(Duration::from_millis(400));

    // Second connection is refused: the server drops it immediately
    let mut second = TcpStream::connect(&harness.server_addr).unwrap();
    second
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = [0u8; 16];
    match second.read(&mut buf) {
        Ok(0) => {}                // clean close
        Err(_) => {}               // reset also counts as refused
        Ok(n) => panic!("refused connection unexpectedly received {} bytes", n),
    }

    drop(first);
}

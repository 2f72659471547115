//! Pool client example.
//!
//! This example starts a local echo server and drives a socket pool
//! against it: reuse after release, separate sessions, and teardown.
//!
//! Run with: RUST_LOG=sockpool_rs=debug cargo run --example pool_client

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use sockpool_rs::connection::{AcquireOptions, PoolConfig, PoolRegistry};
use sockpool_rs::transport::TcpProvider;
use sockpool_rs::SCHEME_HTTP;
use tracing_subscriber::EnvFilter;

const HOST: &str = "127.0.0.1";

fn spawn_echo_server() -> std::io::Result<u16> {
    let listener = TcpListener::bind((HOST, 0))?;
    let port = listener.local_addr()?.port();

    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut buf = [0u8; 1024];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 || stream.write_all(&buf[..n]).is_err() {
                        break;
                    }
                }
            });
        }
    });
    Ok(port)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = spawn_echo_server()?;
    println!("Echo server listening on {HOST}:{port}");

    let provider = Arc::new(TcpProvider);
    let mut registry = PoolRegistry::with_config(PoolConfig::default().with_max_attempts(3));
    let pool = registry.get_or_create(&provider);

    // Example 1: Acquire, talk, release
    println!("\n--- Example 1: Acquire and Release ---");
    let handle = {
        let mut pool = pool.lock();
        let handle = pool.acquire(HOST, port, SCHEME_HTTP, AcquireOptions::new())?;
        let socket = pool.socket_mut(handle)?;
        socket.send_all(b"Hello, pool!")?;
        let reply = socket.recv(64)?;
        println!("Socket {handle}: {:?}", String::from_utf8_lossy(&reply));
        pool.release(handle)?;
        handle
    };

    // Example 2: Same key reuses the released socket
    println!("\n--- Example 2: Reuse ---");
    {
        let mut pool = pool.lock();
        let reused = pool.acquire(HOST, port, SCHEME_HTTP, AcquireOptions::new())?;
        println!("Reused: {} (was {handle})", reused == handle);

        // Still checked out, so a second acquire conflicts
        if let Err(e) = pool.acquire(HOST, port, SCHEME_HTTP, AcquireOptions::new()) {
            println!("Second acquire: {e}");
        }
        pool.release(reused)?;
    }

    // Example 3: Sessions get their own sockets
    println!("\n--- Example 3: Sessions ---");
    {
        let mut pool = pool.lock();
        for session in 1..=3 {
            let options = AcquireOptions::new().with_session_id(session);
            let handle = pool.acquire(HOST, port, SCHEME_HTTP, options)?;
            println!("Session {session}: socket {handle}");
            pool.release(handle)?;
        }
        println!(
            "Managed: {}, free: {}",
            pool.managed_count(),
            pool.free_count()
        );
        println!("Stats: {:?}", pool.stats());
    }

    // Example 4: Teardown
    println!("\n--- Example 4: Close All ---");
    let drained = registry.close_all(Some(&provider), true)?;
    println!(
        "Closed {} sockets ({} close failures)",
        drained.closed, drained.close_failures
    );

    println!("\nDone!");
    Ok(())
}

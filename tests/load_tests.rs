use std::sync::{Arc, Barrier};
use std::thread;

use strait::ObjectCache;

/// Deterministic mixing for test workloads; no RNG crate needed.
fn lcg(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

#[cfg(test)]
mod cache_contention_tests {
    use super::*;

    const WORKERS: usize = 8;
    const OPS_PER_WORKER: usize = 2_000;
    const URI_UNIVERSE: u64 = 24;
    const CAPACITY: usize = 20_000;
    const MAX_OBJECT: usize = 2_000;

    #[test]
    fn test_mixed_put_get_remove_keeps_invariants() {
        let cache = Arc::new(ObjectCache::new(CAPACITY, MAX_OBJECT));
        let barrier = Arc::new(Barrier::new(WORKERS + 1));
        let mut handles = Vec::new();

        for worker in 0..WORKERS {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                let mut state = worker as u64 + 1;
                barrier.wait();
                for _ in 0..OPS_PER_WORKER {
                    let r = lcg(&mut state);
                    let uri = format!("obj-{}", r % URI_UNIVERSE);
                    match r % 10 {
                        0..=5 => {
                            let fill = (r % 251) as u8;
                            let len = (r % MAX_OBJECT as u64) as usize;
                            cache.put(&uri, &vec![fill; len]);
                        }
                        6..=8 => {
                            if let Some(payload) = cache.get(&uri) {
                                // every stored payload is homogeneous, so a
                                // torn copy would show mixed bytes
                                if let Some(&first) = payload.first() {
                                    assert!(
                                        payload.iter().all(|&b| b == first),
                                        "torn payload observed for {uri}"
                                    );
                                }
                            }
                        }
                        _ => cache.remove(&uri),
                    }
                }
            }));
        }

        barrier.wait();
        for handle in handles {
            handle.join().expect("worker panicked");
        }

        // Quiescent invariant sweep
        assert!(cache.size() <= CAPACITY, "byte quota violated");

        let mut live_bytes = 0;
        let mut live_entries = 0;
        for i in 0..URI_UNIVERSE {
            if let Some(payload) = cache.get(&format!("obj-{i}")) {
                live_bytes += payload.len();
                live_entries += 1;
            }
        }
        assert_eq!(live_bytes, cache.size(), "byte total out of sync with entries");
        assert_eq!(live_entries, cache.len(), "entry count out of sync with index");
    }

    #[test]
    fn test_concurrent_readers_see_whole_payloads() {
        let cache = Arc::new(ObjectCache::new(1 << 20, 1 << 16));
        cache.put("shared", &vec![b'S'; 10_000]);

        let barrier = Arc::new(Barrier::new(WORKERS + 1));
        let mut handles = Vec::new();
        for _ in 0..WORKERS {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    let payload = cache.get("shared").expect("entry vanished");
                    assert_eq!(payload.len(), 10_000);
                    assert!(payload.iter().all(|&b| b == b'S'));
                }
            }));
        }

        barrier.wait();
        for handle in handles {
            handle.join().expect("reader panicked");
        }
    }

    #[test]
    fn test_racing_puts_for_one_uri_leave_one_entry() {
        let cache = Arc::new(ObjectCache::new(1 << 20, 1 << 16));
        let barrier = Arc::new(Barrier::new(WORKERS + 1));
        let mut handles = Vec::new();

        for worker in 0..WORKERS {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    cache.put("contended", &vec![worker as u8; 1_000]);
                }
            }));
        }

        barrier.wait();
        for handle in handles {
            handle.join().expect("writer panicked");
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 1_000);
        let winner = cache.get("contended").unwrap();
        assert!(winner.iter().all(|&b| b == winner[0]), "payload must be whole");
    }
}

#[cfg(test)]
mod proxy_load_tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use strait::{server, MAX_CACHE_SIZE, MAX_OBJECT_SIZE};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    struct Fixture {
        proxy: SocketAddr,
        origin: SocketAddr,
        connections: Arc<AtomicUsize>,
        cache: Arc<ObjectCache>,
    }

    async fn spawn_fixture(body: Vec<u8>) -> Fixture {
        let origin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = origin_listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = origin_listener.accept().await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let body = body.clone();
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => {
                                head.extend_from_slice(&chunk[..n]);
                                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                        }
                    }
                    let head = format!(
                        "HTTP/1.0 200 OK\r\nContent-Length: {}\r\n\r\n",
                        body.len()
                    );
                    let _ = stream.write_all(head.as_bytes()).await;
                    let _ = stream.write_all(&body).await;
                });
            }
        });

        let cache = Arc::new(ObjectCache::new(MAX_CACHE_SIZE, MAX_OBJECT_SIZE));
        let proxy_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy = proxy_listener.local_addr().unwrap();
        tokio::spawn(server::serve(proxy_listener, Arc::clone(&cache)));

        Fixture {
            proxy,
            origin,
            connections,
            cache,
        }
    }

    async fn fetch(proxy: SocketAddr, origin: SocketAddr) -> Vec<u8> {
        let mut stream = TcpStream::connect(proxy).await.unwrap();
        let request = format!("GET http://{origin}/hot HTTP/1.0\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clients_one_hot_uri() {
        const CLIENTS: usize = 8;
        let body = vec![b'H'; 4_000];
        let fixture = spawn_fixture(body.clone()).await;

        let mut tasks = Vec::new();
        for _ in 0..CLIENTS {
            tasks.push(tokio::spawn(fetch(fixture.proxy, fixture.origin)));
        }

        let mut expected = format!("HTTP/1.0 200 OK\r\nContent-Length: {}\r\n\r\n", body.len())
            .into_bytes();
        expected.extend_from_slice(&body);
        for task in tasks {
            let response = task.await.unwrap();
            assert_eq!(response, expected, "every client must get the whole object");
        }

        // All racing clients may have missed, but by now at least one relay
        // has stored the object; the next fetch must not reach the origin.
        let before = fixture.connections.load(Ordering::SeqCst);
        assert!(before >= 1 && before <= CLIENTS);
        let response = fetch(fixture.proxy, fixture.origin).await;
        assert_eq!(response, expected);
        assert_eq!(fixture.connections.load(Ordering::SeqCst), before);
        assert_eq!(fixture.cache.len(), 1);
    }
}

use hlld_client::{Client, ClientError, ConnectionConfig, SetAttributes};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Number of `create` attempts answered with `Delete in progress` after a drop.
const DELETE_DELAY: u32 = 2;

#[derive(Default)]
struct FakeState {
    sets: HashMap<String, HashSet<String>>,
    deleting: HashMap<String, u32>,
}

impl FakeState {
    fn handle(&mut self, line: &str) -> String {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (verb, key, args) = match parts.as_slice() {
            [verb, key, args @ ..] => (*verb, key.to_string(), args),
            _ => return "Client Error: Command not supported\n".to_string(),
        };

        match verb {
            "create" => {
                if let Some(remaining) = self.deleting.get_mut(&key) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return "Delete in progress\n".to_string();
                    }
                }
                if self.sets.contains_key(&key) {
                    return "Exists\n".to_string();
                }
                self.sets.insert(key, HashSet::new());
                "Done\n".to_string()
            }
            "set" | "bulk" => match self.sets.get_mut(&key) {
                Some(values) if !args.is_empty() => {
                    values.extend(args.iter().map(|v| v.to_string()));
                    "Done\n".to_string()
                }
                Some(_) => "Client Error: Must provide set name and key\n".to_string(),
                None => "Set does not exist\n".to_string(),
            },
            "list" => match self.sets.get(&key) {
                Some(values) => format!("START\n{} 0.010000 16 1024 {}\nEND\n", key, values.len()),
                None => "START\nEND\n".to_string(),
            },
            "drop" => {
                if self.sets.remove(&key).is_some() {
                    self.deleting.insert(key, DELETE_DELAY);
                    "Done\n".to_string()
                } else {
                    "Set does not exist\n".to_string()
                }
            }
            _ => "Client Error: Command not supported\n".to_string(),
        }
    }
}

/// Starts an in-process server speaking the hlld text protocol.
///
/// Block replies are written in two pieces to exercise reassembly.
async fn start_fake_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(Mutex::new(FakeState::default()));

    tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            let state = state.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let reply = state.lock().unwrap().handle(&line);
                    let (head, tail) = reply.split_at(reply.len().min(3));
                    write_half.write_all(head.as_bytes()).await.unwrap();
                    write_half.flush().await.unwrap();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    write_half.write_all(tail.as_bytes()).await.unwrap();
                }
            });
        }
    });

    addr
}

/// Starts a server that reads commands but never answers.
async fn start_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    });

    addr
}

/// Starts a server that closes the connection halfway through a block reply.
async fn start_truncating_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = socket.into_split();
        let mut lines = BufReader::new(read_half).lines();
        if let Ok(Some(_)) = lines.next_line().await {
            write_half
                .write_all(b"START\nhlld-test 0 0 0 7\n")
                .await
                .unwrap();
            write_half.shutdown().await.unwrap();
        }
    });

    addr
}

async fn connect(addr: SocketAddr) -> Client<TcpStream> {
    Client::connect(&ConnectionConfig::new(addr.to_string()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let addr = start_fake_server().await;
    let mut client = connect(addr).await;

    let attrs = SetAttributes::new()
        .with_precision(16)
        .with_error_bound(0.01)
        .with_in_memory(true);
    client.create("hlld-test", Some(&attrs)).await.unwrap();

    client.set("hlld-test", "abc").await.unwrap();
    assert_eq!(client.list("hlld-test").await.unwrap(), 1);

    client.bulk("hlld-test", &["ed", "op", "cff"]).await.unwrap();
    assert_eq!(client.list("hlld-test").await.unwrap(), 4);

    client.drop("hlld-test").await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_sequential_commands_get_their_own_replies() {
    let addr = start_fake_server().await;
    let mut client = connect(addr).await;

    client.create("ordered", None).await.unwrap();
    assert!(matches!(
        client.create("ordered", None).await,
        Err(ClientError::KeyExists)
    ));
    client.set("ordered", "x").await.unwrap();
    assert_eq!(client.list("ordered").await.unwrap(), 1);
    assert!(matches!(
        client.set("missing", "x").await,
        Err(ClientError::Protocol(_))
    ));
    assert_eq!(client.list("ordered").await.unwrap(), 1);
}

#[tokio::test]
async fn test_retry_while_delete_in_progress() {
    let addr = start_fake_server().await;
    let mut client = connect(addr).await;

    client.create("recycled", None).await.unwrap();
    client.drop("recycled").await.unwrap();

    // The client never retries; a delete in progress is handled here.
    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        match client.create("recycled", None).await {
            Err(err) if err.is_retryable() && attempts < 5 => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            other => break other,
        }
    };

    result.unwrap();
    assert_eq!(attempts, DELETE_DELAY + 1);
    client.drop("recycled").await.unwrap();
}

#[tokio::test]
async fn test_list_missing_set_is_protocol_error() {
    let addr = start_fake_server().await;
    let mut client = connect(addr).await;

    let err = client.list("nope").await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_deadline_is_transport_error() {
    let addr = start_silent_server().await;
    let config =
        ConnectionConfig::new(addr.to_string()).with_request_timeout(Duration::from_millis(100));
    let mut client = Client::connect(&config).await.unwrap();

    let err = client.list("slow").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
    assert!(err.is_transport());

    // The connection is unusable after a transport failure.
    assert!(!client.is_connected());
    assert!(matches!(
        client.set("slow", "x").await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_block_without_end_is_protocol_error() {
    let addr = start_truncating_server().await;
    let mut client = connect(addr).await;

    let err = client.list("hlld-test").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(hlld_client::ProtocolError::MalformedBlock(_))
    ));
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = Client::connect(&ConnectionConfig::new(addr.to_string())).await;
    match result {
        Err(err) => assert!(err.is_transport()),
        Ok(_) => panic!("connect to a closed port succeeded"),
    }
}

#[tokio::test]
async fn test_operations_after_close() {
    let addr = start_fake_server().await;
    let mut client = connect(addr).await;

    client.close().await.unwrap();
    client.close().await.unwrap();

    assert!(matches!(
        client.create("k", None).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_independent_handles_run_concurrently() {
    let addr = start_fake_server().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    first.create("left", None).await.unwrap();
    second.create("right", None).await.unwrap();

    let (a, b) = tokio::join!(
        async {
            first.bulk("left", &["1", "2"]).await?;
            Ok::<i64, ClientError>(first.list("left").await?)
        },
        async {
            second.bulk("right", &["1", "2", "3"]).await?;
            Ok::<i64, ClientError>(second.list("right").await?)
        }
    );

    assert_eq!(a.unwrap(), 2);
    assert_eq!(b.unwrap(), 3);
}

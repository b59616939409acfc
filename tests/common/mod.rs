use std::sync::Once;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use weft::Server;

static INIT: Once = Once::new();

pub fn init_log() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Start a server on an ephemeral port; returns its address and a
/// shutdown trigger.
pub async fn start(server: Server) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        server.run_until(listener, rx).await.unwrap();
    });

    (addr, tx)
}

/// Read one http response: the full head, then a `Content-Length` body.
pub async fn read_response(tcp: &mut TcpStream) -> (String, Vec<u8>) {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    while !raw.ends_with(b"\r\n\r\n") {
        let n = tcp.read(&mut byte).await.unwrap();
        assert!(n > 0, "eof inside response head");
        raw.push(byte[0]);
    }
    let head = String::from_utf8(raw).unwrap();

    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .map(|v| v.parse::<usize>().unwrap())
        .unwrap_or(0);

    let mut body = vec![0u8; content_length];
    tcp.read_exact(&mut body).await.unwrap();
    (head, body)
}

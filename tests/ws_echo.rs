mod common;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use weft::conn::{Context, Handler, HandlerFuture, SessionFuture, WsSession};
use weft::frame::mask::{apply_mask, new_rand_key};
use weft::frame::{Fin, FrameHead, Mask, OpCode, PayloadLen};
use weft::handshake::derive_accept_key;
use weft::ws::{FrameSender, Message};
use weft::{Priority, Server};

const SEC_KEY: &[u8] = b"dGhlIHNhbXBsZSBub25jZQ==";

struct Echo;

struct EchoSession {
    sender: Option<FrameSender>,
}

impl Handler for Echo {
    fn handle<'a>(&'a self, ctx: &'a mut Context<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            ctx.accept_websocket(Box::new(EchoSession { sender: None }));
            Ok(())
        })
    }
}

impl WsSession for EchoSession {
    fn on_open(&mut self, sender: FrameSender) {
        self.sender = Some(sender);
    }

    fn on_message(&mut self, message: Message) -> SessionFuture<'_> {
        Box::pin(async move {
            if let Some(sender) = &self.sender {
                match message {
                    Message::Text(payload) => sender.send_text(payload),
                    Message::Binary(payload) => sender.send_binary(payload),
                }
            }
        })
    }
}

fn server() -> Server {
    let mut server = Server::new().workers(1);
    server.route(&["GET"], "/ws", Priority::Medium, Echo);
    server
}

async fn upgrade(addr: &str) -> TcpStream {
    let mut tcp = TcpStream::connect(addr).await.unwrap();
    tcp.write_all(
        format!(
            "GET /ws HTTP/1.1\r\nHost: t\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
            std::str::from_utf8(SEC_KEY).unwrap()
        )
        .as_bytes(),
    )
    .await
    .unwrap();

    let (head, _) = common::read_response(&mut tcp).await;
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    let accept = head
        .lines()
        .find_map(|l| l.strip_prefix("Sec-WebSocket-Accept: "))
        .unwrap();
    assert_eq!(accept.as_bytes(), derive_accept_key(SEC_KEY));

    tcp
}

fn client_frame(fin: Fin, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let key = new_rand_key();
    let head = FrameHead::new(
        fin,
        opcode,
        Mask::Key(key),
        PayloadLen::from_num(payload.len() as u64),
    );
    let mut wire = Vec::new();
    head.encode_to_vec(&mut wire);
    let mut masked = payload.to_vec();
    apply_mask(key, &mut masked);
    wire.extend_from_slice(&masked);
    wire
}

/// Read one unmasked server frame off the socket.
async fn read_frame(tcp: &mut TcpStream) -> (OpCode, Vec<u8>) {
    let mut fixed = [0u8; 2];
    tcp.read_exact(&mut fixed).await.unwrap();
    let opcode = OpCode::from_flag(fixed[0]).unwrap();
    assert!(Fin::from_flag(fixed[0]).unwrap().is_set());

    let mut len = PayloadLen::from_flag(fixed[1]);
    match len.extra_len() {
        0 => {}
        2 => {
            let mut ext = [0u8; 2];
            tcp.read_exact(&mut ext).await.unwrap();
            len = PayloadLen::from_byte2(ext);
        }
        _ => {
            let mut ext = [0u8; 8];
            tcp.read_exact(&mut ext).await.unwrap();
            len = PayloadLen::from_byte8(ext);
        }
    }

    let mut payload = vec![0u8; len.to_num() as usize];
    tcp.read_exact(&mut payload).await.unwrap();
    (opcode, payload)
}

#[tokio::test]
async fn upgrade_and_echo() {
    common::init_log();
    let (addr, _stop) = common::start(server()).await;

    let mut tcp = upgrade(&addr).await;

    for round in 1..=5_u32 {
        let data = format!("echo #{}", round);
        tcp.write_all(&client_frame(Fin::Y, OpCode::Text, data.as_bytes()))
            .await
            .unwrap();

        let (opcode, payload) = read_frame(&mut tcp).await;
        assert_eq!(opcode, OpCode::Text);
        assert_eq!(payload, data.as_bytes());
    }
}

#[tokio::test]
async fn fragmented_message_reassembled() {
    common::init_log();
    let (addr, _stop) = common::start(server()).await;

    let mut tcp = upgrade(&addr).await;

    tcp.write_all(&client_frame(Fin::N, OpCode::Binary, b"frag"))
        .await
        .unwrap();
    tcp.write_all(&client_frame(Fin::N, OpCode::Continue, b"ment"))
        .await
        .unwrap();
    tcp.write_all(&client_frame(Fin::Y, OpCode::Continue, b"ed"))
        .await
        .unwrap();

    // exactly one echo for the three fragments
    let (opcode, payload) = read_frame(&mut tcp).await;
    assert_eq!(opcode, OpCode::Binary);
    assert_eq!(payload, b"fragmented");
}

#[tokio::test]
async fn ping_answered_in_order() {
    common::init_log();
    let (addr, _stop) = common::start(server()).await;

    let mut tcp = upgrade(&addr).await;

    tcp.write_all(&client_frame(Fin::Y, OpCode::Text, b"before"))
        .await
        .unwrap();
    tcp.write_all(&client_frame(Fin::Y, OpCode::Ping, b"mark"))
        .await
        .unwrap();

    let (opcode, payload) = read_frame(&mut tcp).await;
    assert_eq!(opcode, OpCode::Text);
    assert_eq!(payload, b"before");

    let (opcode, payload) = read_frame(&mut tcp).await;
    assert_eq!(opcode, OpCode::Pong);
    assert_eq!(payload, b"mark");
}

#[tokio::test]
async fn close_is_echoed() {
    common::init_log();
    let (addr, _stop) = common::start(server()).await;

    let mut tcp = upgrade(&addr).await;

    // 1000, normal closure
    tcp.write_all(&client_frame(Fin::Y, OpCode::Close, &[0x03, 0xe8]))
        .await
        .unwrap();

    let (opcode, payload) = read_frame(&mut tcp).await;
    assert_eq!(opcode, OpCode::Close);
    assert_eq!(payload, [0x03, 0xe8]);

    let mut rest = Vec::new();
    tcp.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn frames_behind_the_handshake() {
    common::init_log();
    let (addr, _stop) = common::start(server()).await;

    // handshake and a first frame in one burst
    let mut tcp = TcpStream::connect(&addr).await.unwrap();
    let mut burst = format!(
        "GET /ws HTTP/1.1\r\nHost: t\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        std::str::from_utf8(SEC_KEY).unwrap()
    )
    .into_bytes();
    burst.extend(client_frame(Fin::Y, OpCode::Text, b"eager"));
    tcp.write_all(&burst).await.unwrap();

    let (head, _) = common::read_response(&mut tcp).await;
    assert!(head.starts_with("HTTP/1.1 101"));

    let (opcode, payload) = read_frame(&mut tcp).await;
    assert_eq!(opcode, OpCode::Text);
    assert_eq!(payload, b"eager");
}

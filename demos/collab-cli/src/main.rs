//! Minimal interactive client for the huddle relay.
//!
//! Creates or joins a session, then broadcasts each stdin line to the
//! other members and prints whatever they broadcast.
//!
//! ```text
//! collab-cli 127.0.0.1:4000 create alpha
//! collab-cli 127.0.0.1:4000 join alpha
//! ```

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use huddle_protocol::{
    ClientMessageKind, Frame, FrameCodec, ServerMessageKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (addr, mode, session) = match (args.next(), args.next(), args.next())
    {
        (Some(addr), Some(mode), Some(session)) => (addr, mode, session),
        _ => {
            eprintln!("usage: collab-cli <addr> <create|join> <session>");
            std::process::exit(2);
        }
    };
    let kind = match mode.as_str() {
        "create" => ClientMessageKind::CreateSession,
        "join" => ClientMessageKind::JoinSession,
        other => {
            eprintln!("unknown mode '{other}', expected create or join");
            std::process::exit(2);
        }
    };

    let stream = TcpStream::connect(&addr).await?;
    let mut frames = Framed::new(stream, FrameCodec::client());
    frames
        .send(Frame::new(kind.to_wire(), Bytes::from(session.into_bytes())))
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            incoming = frames.next() => match incoming {
                Some(Ok(frame)) => print_frame(&frame),
                Some(Err(e)) => {
                    eprintln!("protocol error: {e}");
                    break;
                }
                None => {
                    eprintln!("server closed the connection");
                    break;
                }
            },
            line = lines.next_line() => match line? {
                Some(text) => {
                    frames
                        .send(Frame::new(
                            ClientMessageKind::Broadcast.to_wire(),
                            Bytes::from(text.into_bytes()),
                        ))
                        .await?;
                }
                None => break, // stdin closed
            },
        }
    }

    Ok(())
}

fn print_frame(frame: &Frame) {
    let text = String::from_utf8_lossy(&frame.payload);
    match ServerMessageKind::from_wire(frame.kind) {
        Some(ServerMessageKind::CreatedSession) => {
            eprintln!("created session '{text}'");
        }
        Some(ServerMessageKind::JoinedSession) => {
            eprintln!("joined session '{text}'");
        }
        Some(ServerMessageKind::BroadcastCommand) => {
            println!("{text}");
        }
        None => {
            eprintln!("unknown server frame type {:#x}", frame.kind);
        }
    }
}

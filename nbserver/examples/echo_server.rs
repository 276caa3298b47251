//! Serveur d'écho minimal : chaque trame texte revient dans un évènement
//! d'erreur de classe FAILURE. Pratique pour tester un client websocket.
//!
//! ```sh
//! cargo run --example echo_server
//! websocat ws://127.0.0.1:9821/echo
//! ```

use async_trait::async_trait;
use nbprotocol::{ErrorEvent, ErrorType, Event, Message};
use nbserver::{ClientSession, Server, SessionError, WebsocketMuxer};
use std::sync::Arc;

struct EchoServer;

#[async_trait]
impl Server for EchoServer {
    async fn accept(&self, message: &str, session: &ClientSession) -> Result<(), SessionError> {
        if message == "close" {
            return Err(SessionError::CloseConnection);
        }
        let echo = Message::event(Event::Error(ErrorEvent::new(ErrorType::Failure, message)));
        session.send(&echo)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut muxer = WebsocketMuxer::new();
    muxer.register("/echo", Arc::new(EchoServer))?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:9821").await?;
    println!("echo server on ws://127.0.0.1:9821/echo");
    axum::serve(listener, muxer.into_router()).await?;
    Ok(())
}

//! Le muxer websocket : accepte les connexions persistantes et redirige
//! chaque session vers le handler enregistré sur son chemin d'URL.

use crate::codes::{BAD_CLIENT, UNSUPPORTED_URI};
use crate::error::{safe_close_message, RegisterError, SessionError};
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use futures::FutureExt;
use nbprotocol::Message;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Forme d'URL acceptée pour l'enregistrement d'un handler.
static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?\w*(/\w*)*/?$").expect("url regex is valid"));

/// Le handle d'écriture d'un pair connecté.
///
/// Créé à la connexion, détruit à la fermeture. La fermeture de la
/// connexion annule les envois encore en file.
pub struct ClientSession {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientSession {
    /// Construit une session et le récepteur de ses trames sortantes.
    ///
    /// Le muxer draine le récepteur vers la socket ; les tests le lisent
    /// directement.
    pub fn channel() -> (ClientSession, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ClientSession {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Met un message en file d'envoi vers le pair.
    pub fn send(&self, message: &Message) -> Result<(), SessionError> {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropping unserializable outbound message: {}", e);
                return Err(SessionError::Gone);
            }
        };
        self.tx.send(frame).map_err(|_| SessionError::Gone)
    }
}

/// Un handler de trames enregistré sur le muxer.
#[async_trait]
pub trait Server: Send + Sync {
    /// Accepte une trame texte du client.
    ///
    /// Ne doit pas bloquer : un travail long se consigne vite dans un
    /// datastore local et se consulte par requêtes ultérieures, pour que
    /// la boucle de trames continue de tourner.
    async fn accept(&self, message: &str, session: &ClientSession) -> Result<(), SessionError>;
}

/// Routeur de connexions websocket par chemin d'URL.
#[derive(Default)]
pub struct WebsocketMuxer {
    servers: HashMap<String, Arc<dyn Server>>,
}

impl WebsocketMuxer {
    pub fn new() -> Self {
        WebsocketMuxer::default()
    }

    /// Enregistre un handler sur un chemin.
    ///
    /// Le chemin doit ressembler à une URL (`^/?\w*(/\w*)*/?$`). Un
    /// enregistrement en double remplace le précédent avec un warning.
    pub fn register(&mut self, path: &str, server: Arc<dyn Server>) -> Result<(), RegisterError> {
        if !URL_REGEX.is_match(path) {
            return Err(RegisterError::InvalidPath(path.to_string()));
        }
        if self.servers.contains_key(path) {
            warn!("path '{}' already registered on muxer, replacing", path);
        }
        self.servers.insert(path.to_string(), server);
        Ok(())
    }

    /// Transforme le muxer en routeur axum : toute requête d'upgrade, quel
    /// que soit son chemin, passe par la table d'enregistrement.
    pub fn into_router(self) -> Router {
        let muxer = Arc::new(self);
        Router::new()
            .route("/", any(handle_upgrade))
            .route("/{*rest}", any(handle_upgrade))
            .with_state(muxer)
    }

    async fn run_session(&self, mut socket: WebSocket, path: String) {
        let Some(server) = self.servers.get(&path).cloned() else {
            debug!("user attempted to connect to path '{}', which doesn't exist", path);
            close_socket(
                &mut socket,
                UNSUPPORTED_URI,
                &format!("path '{}' not found", path),
            )
            .await;
            return;
        };

        let (session, mut outgoing) = ClientSession::channel();
        info!("Client {} connected on '{}'", session.id(), path);

        loop {
            tokio::select! {
                frame = outgoing.recv() => {
                    // La session vit dans cette boucle, le canal ne peut se
                    // fermer qu'avec elle.
                    let Some(frame) = frame else { break };
                    if socket.send(WsMessage::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                incoming = socket.recv() => {
                    let Some(Ok(frame)) = incoming else { break };
                    if !self.handle_frame(frame, &server, &session, &mut socket, &mut outgoing, &path).await {
                        break;
                    }
                }
            }
        }
        debug!("server loop finished for connection path '{}'", path);
    }

    /// Traite une trame entrante. Retourne `false` quand la session doit
    /// se terminer.
    async fn handle_frame(
        &self,
        frame: WsMessage,
        server: &Arc<dyn Server>,
        session: &ClientSession,
        socket: &mut WebSocket,
        outgoing: &mut mpsc::UnboundedReceiver<String>,
        path: &str,
    ) -> bool {
        match frame {
            WsMessage::Text(text) => {
                // Un handler qui panique est un bug du handler : on le
                // loggue sans emporter ni le processus ni la connexion.
                let result = AssertUnwindSafe(server.accept(text.as_str(), session))
                    .catch_unwind()
                    .await;
                if flush_outgoing(socket, outgoing).await.is_err() {
                    return false;
                }
                match result {
                    Err(panic) => {
                        error!("handler @ '{}' panicked: {}", path, panic_message(&panic));
                        true
                    }
                    Ok(Ok(())) => true,
                    Ok(Err(SessionError::CloseConnection)) => {
                        debug!("client @ '{}' asked to close the connection", path);
                        let _ = socket.send(WsMessage::Close(None)).await;
                        false
                    }
                    Ok(Err(SessionError::Client(reason))) => {
                        warn!(
                            "client @ '{}' misbehaved: '{}', closing the connection",
                            path, reason
                        );
                        close_socket(socket, BAD_CLIENT, &reason).await;
                        false
                    }
                    Ok(Err(SessionError::Gone)) => false,
                }
            }
            WsMessage::Binary(_) => {
                warn!("client @ '{}' sent a binary frame, closing the connection", path);
                close_socket(socket, BAD_CLIENT, "this server does not accept binary frames")
                    .await;
                false
            }
            WsMessage::Close(_) => false,
            WsMessage::Ping(_) | WsMessage::Pong(_) => true,
        }
    }
}

async fn handle_upgrade(
    State(muxer): State<Arc<WebsocketMuxer>>,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    let path = uri.path().to_string();
    ws.on_upgrade(move |socket| async move { muxer.run_session(socket, path).await })
}

/// Envoie les trames sortantes déjà en file, dans l'ordre.
async fn flush_outgoing(
    socket: &mut WebSocket,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), axum::Error> {
    while let Ok(frame) = outgoing.try_recv() {
        socket.send(WsMessage::Text(frame.into())).await?;
    }
    Ok(())
}

async fn close_socket(socket: &mut WebSocket, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: safe_close_message(reason).into(),
    };
    if let Err(e) = socket.send(WsMessage::Close(Some(frame))).await {
        debug!("close frame not delivered: {}", e);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

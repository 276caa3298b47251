//! # nbserver - Serveur de commandes websocket de NoiseBox
//!
//! Deux étages :
//!
//! - [`WebsocketMuxer`] : accepte les connexions websocket persistantes,
//!   route chaque connexion vers le [`Server`] enregistré sur son chemin
//!   d'URL, traduit les erreurs de handler en codes de fermeture bien
//!   définis. Les trames d'une même connexion sont servies strictement
//!   dans l'ordre de réception.
//! - [`MediaServer`] : le handler du protocole V1. Parse chaque trame en
//!   [`nbprotocol::Message`], route la commande vers son handler, émet les
//!   évènements de réponse, rattrape et expurge les erreurs.
//!
//! Une défaillance par trame n'emporte jamais la connexion, sauf quand il
//! est structurellement dangereux de continuer (trame binaire, violation
//! de protocole) : on émet UN évènement d'erreur et on continue.

mod codes;
mod convert;
mod error;
mod muxer;
mod pagination;
mod server;

pub use codes::{BAD_CLIENT, UNSUPPORTED_URI};
pub use convert::{playlist_to_wire, song_to_wire};
pub use error::{safe_close_message, RegisterError, SessionError};
pub use muxer::{ClientSession, Server, WebsocketMuxer};
pub use pagination::{page_out, page_to_string, string_to_page, Page, PageError,
    DEFAULT_MAX_RESPONSE_SIZE};
pub use server::MediaServer;

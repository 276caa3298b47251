//! # nbprotocol - Schéma du protocole de commandes V1
//!
//! Le serveur de commandes NoiseBox parle un protocole websocket texte :
//! chaque trame est un objet JSON enveloppé dans un [`Message`] qui porte
//! exactement UN [`Command`] (requête du client) ou UN [`Event`]
//! (notification du serveur).
//!
//! Tous les champs des payloads sont optionnels : cela amortit les
//! évolutions mineures du schéma et évite de figer des champs pendant que
//! le développement continue. Client et serveur valident chacun de leur
//! côté et signalent les champs logiquement manquants par un évènement
//! d'erreur.
//!
//! Les discriminants (`command_name` / `event_name`) forment des ensembles
//! clos ; la validation du discriminant a lieu exactement une fois au
//! parsing, le reste du système travaille sur les variantes typées.

mod message;
mod schema;
mod types;

pub use message::{
    simplify_validation_error, Command, CommandPayload, Event, EventPayload,
    ListPlaylistsCommand, ListPlaylistsEvent, ListSongsCommand, ListSongsEvent, Message,
    NextSongCommand, PlayStateEvent, ProtocolError, SongPlayingEvent, TogglePlayCommand,
    COMMAND_NAMES, EVENT_NAMES, PARAMETERLESS_COMMANDS,
};
pub use schema::write_schemas;
pub use types::{ErrorDataEnv, ErrorEvent, ErrorType, Playlist, Song, UNEXPECTED_ERROR_MESSAGE};

/// Version du protocole décrite par cette crate.
pub const VERSION: &str = "v1";

/// Chemin websocket où le serveur de commandes V1 est exposé.
pub const SERVING_PATH: &str = "/noisebox/command_server/v1";

/// Port d'écoute par défaut du serveur de commandes.
pub const DEFAULT_PORT: u16 = 9821;

//! Enveloppe [`Message`] et variantes typées de commandes/évènements.
//!
//! Le parsing se fait en deux temps : l'enveloppe et le discriminant sont
//! validés à la main pour produire des [`ErrorEvent`] précis (classe
//! `CLIENT_ERROR`), puis le payload est désérialisé vers la variante
//! typée. Une fois `Message::parse` passé, le reste du système ne revoit
//! jamais de JSON brut.

use crate::types::{ErrorEvent, ErrorType, Playlist, Song};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Noms de commandes reconnus par le serveur V1.
pub const COMMAND_NAMES: [&str; 4] = ["TOGGLE_PLAY", "NEXT_SONG", "LIST_SONGS", "LIST_PLAYLISTS"];

/// Noms d'évènements émis par le serveur V1.
pub const EVENT_NAMES: [&str; 5] = [
    "ERROR",
    "PLAY_STATE",
    "SONG_PLAYING",
    "LIST_SONGS",
    "LIST_PLAYLISTS",
];

/// Commandes exécutables sans payload : la validation ne leur en réclame
/// pas. `TOGGLE_PLAY` en fait partie puisque `play_state` est optionnel.
pub const PARAMETERLESS_COMMANDS: [&str; 4] =
    ["TOGGLE_PLAY", "NEXT_SONG", "LIST_SONGS", "LIST_PLAYLISTS"];

/// Erreurs d'utilisation du protocole côté programme (unwrap sur le
/// mauvais type, évènement non géré).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid type, message '{actual}' is not type '{expected}'")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("{kind} '{name}' not implemented or expected on this server")]
    UnsupportedMessageType { kind: &'static str, name: String },
}

/// Bascule l'état de lecture. Peut aussi forcer l'état absolu
/// lecture/pause via `play_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TogglePlayCommand {
    /// Si présent, l'état à imposer ; sinon le serveur prend l'opposé de
    /// l'état courant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_state: Option<bool>,
}

/// Saute au morceau suivant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NextSongCommand {}

/// Demande la liste des chansons référençables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListSongsCommand {}

/// Demande la liste des playlists référençables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPlaylistsCommand {}

/// Informe le client de l'état de lecture courant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlayStateEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_play_state: Option<bool>,
}

/// Informe le client qu'un nouveau morceau est en cours de lecture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SongPlayingEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_song: Option<Song>,
}

/// Liste de chansons, généralement en réponse à `LIST_SONGS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListSongsEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<Song>>,
}

/// Liste de playlists, généralement en réponse à `LIST_PLAYLISTS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPlaylistsEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Vec<Playlist>>,
}

/// Une commande est une instruction : le serveur la reçoit puis agit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "command_name")]
pub enum Command {
    #[serde(rename = "TOGGLE_PLAY")]
    TogglePlay(TogglePlayCommand),
    #[serde(rename = "NEXT_SONG")]
    NextSong(NextSongCommand),
    #[serde(rename = "LIST_SONGS")]
    ListSongs(ListSongsCommand),
    #[serde(rename = "LIST_PLAYLISTS")]
    ListPlaylists(ListPlaylistsCommand),
}

impl Command {
    /// Le discriminant wire de cette commande.
    pub fn name(&self) -> &'static str {
        match self {
            Command::TogglePlay(_) => TogglePlayCommand::NAME,
            Command::NextSong(_) => NextSongCommand::NAME,
            Command::ListSongs(_) => ListSongsCommand::NAME,
            Command::ListPlaylists(_) => ListPlaylistsCommand::NAME,
        }
    }
}

/// Un évènement est une information sur le monde : le client le reçoit.
///
/// Généralement émis en réponse à une commande, mais pas toujours. Les
/// composants côté client s'abonnent aux évènements qui les concernent :
/// une list box aux `LIST_PLAYLISTS`, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event_name")]
pub enum Event {
    #[serde(rename = "ERROR")]
    Error(ErrorEvent),
    #[serde(rename = "PLAY_STATE")]
    PlayState(PlayStateEvent),
    #[serde(rename = "SONG_PLAYING")]
    SongPlaying(SongPlayingEvent),
    #[serde(rename = "LIST_SONGS")]
    ListSongs(ListSongsEvent),
    #[serde(rename = "LIST_PLAYLISTS")]
    ListPlaylists(ListPlaylistsEvent),
}

impl Event {
    /// Le discriminant wire de cet évènement.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Error(_) => ErrorEvent::NAME,
            Event::PlayState(_) => PlayStateEvent::NAME,
            Event::SongPlaying(_) => SongPlayingEvent::NAME,
            Event::ListSongs(_) => ListSongsEvent::NAME,
            Event::ListPlaylists(_) => ListPlaylistsEvent::NAME,
        }
    }
}

/// Payload de commande : sait s'envelopper dans un [`Message`] et s'en
/// extraire. L'enveloppement est idempotent.
pub trait CommandPayload: Sized + Clone {
    const NAME: &'static str;

    fn into_command(self) -> Command;

    fn from_command(command: &Command) -> Option<&Self>;

    fn wrap(self) -> Message {
        Message::command(self.into_command())
    }
}

/// Payload d'évènement, symétrique de [`CommandPayload`].
pub trait EventPayload: Sized + Clone {
    const NAME: &'static str;

    fn into_event(self) -> Event;

    fn from_event(event: &Event) -> Option<&Self>;

    fn wrap(self) -> Message {
        Message::event(self.into_event())
    }
}

macro_rules! impl_command_payload {
    ($payload:ty, $variant:ident, $name:literal) => {
        impl CommandPayload for $payload {
            const NAME: &'static str = $name;

            fn into_command(self) -> Command {
                Command::$variant(self)
            }

            fn from_command(command: &Command) -> Option<&Self> {
                match command {
                    Command::$variant(payload) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_event_payload {
    ($payload:ty, $variant:ident, $name:literal) => {
        impl EventPayload for $payload {
            const NAME: &'static str = $name;

            fn into_event(self) -> Event {
                Event::$variant(self)
            }

            fn from_event(event: &Event) -> Option<&Self> {
                match event {
                    Event::$variant(payload) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

impl_command_payload!(TogglePlayCommand, TogglePlay, "TOGGLE_PLAY");
impl_command_payload!(NextSongCommand, NextSong, "NEXT_SONG");
impl_command_payload!(ListSongsCommand, ListSongs, "LIST_SONGS");
impl_command_payload!(ListPlaylistsCommand, ListPlaylists, "LIST_PLAYLISTS");

impl_event_payload!(ErrorEvent, Error, "ERROR");
impl_event_payload!(PlayStateEvent, PlayState, "PLAY_STATE");
impl_event_payload!(SongPlayingEvent, SongPlaying, "SONG_PLAYING");
impl_event_payload!(ListSongsEvent, ListSongs, "LIST_SONGS");
impl_event_payload!(ListPlaylistsEvent, ListPlaylists, "LIST_PLAYLISTS");

/// L'enveloppe wire : exactement un des deux champs est renseigné.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}

impl Message {
    pub fn command(command: Command) -> Self {
        Message {
            command: Some(command),
            event: None,
        }
    }

    pub fn event(event: Event) -> Self {
        Message {
            command: None,
            event: Some(event),
        }
    }

    /// Extrait le payload de commande typé `T`.
    ///
    /// Échoue si le message ne porte pas de commande ou si le discriminant
    /// ne correspond pas à `T`. Idempotent avec [`CommandPayload::wrap`].
    pub fn unwrap_command<T: CommandPayload>(&self) -> Result<T, ProtocolError> {
        let command = self.command.as_ref().ok_or_else(|| ProtocolError::TypeMismatch {
            expected: T::NAME,
            actual: self.describe(),
        })?;
        T::from_command(command)
            .cloned()
            .ok_or_else(|| ProtocolError::TypeMismatch {
                expected: T::NAME,
                actual: command.name().to_string(),
            })
    }

    /// Extrait le payload d'évènement typé `T`. Voir [`Self::unwrap_command`].
    pub fn unwrap_event<T: EventPayload>(&self) -> Result<T, ProtocolError> {
        let event = self.event.as_ref().ok_or_else(|| ProtocolError::TypeMismatch {
            expected: T::NAME,
            actual: self.describe(),
        })?;
        T::from_event(event)
            .cloned()
            .ok_or_else(|| ProtocolError::TypeMismatch {
                expected: T::NAME,
                actual: event.name().to_string(),
            })
    }

    fn describe(&self) -> String {
        match (&self.command, &self.event) {
            (Some(command), _) => format!("command '{}'", command.name()),
            (_, Some(event)) => format!("event '{}'", event.name()),
            _ => "empty message".to_string(),
        }
    }

    /// Sérialise l'enveloppe en JSON wire (optionnels absents omis).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse et valide une trame texte.
    ///
    /// Toute défaillance est rendue sous forme d'[`ErrorEvent`] prêt à
    /// émettre (classe `CLIENT_ERROR`), `originating_command` déjà
    /// renseigné avec la trame brute.
    pub fn parse(raw: &str) -> Result<Message, Box<ErrorEvent>> {
        let client_error = |message: String| -> Box<ErrorEvent> {
            Box::new(
                ErrorEvent::new(ErrorType::ClientError, message)
                    .with_originating_command(raw.to_string()),
            )
        };
        let validation_error = |e: &serde_json::Error| -> Box<ErrorEvent> {
            let mut event = client_error("Message failed validation.".to_string());
            event.error_data = Some(simplify_validation_error(e));
            event
        };

        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return Err(validation_error(&e)),
        };

        let object = value.as_object().ok_or_else(|| {
            client_error(format!(
                "Expected a JSON object with a 'command' or 'event' field, got '{}'",
                value
            ))
        })?;

        let command = object.get("command");
        let event = object.get("event");
        match (command, event) {
            (Some(_), Some(_)) => {
                return Err(client_error(
                    "Expected exactly one of 'command' or 'event' to be set, got both".to_string(),
                ));
            }
            (None, None) => {
                return Err(client_error(
                    "Expected exactly one of 'command' or 'event' to be set, got neither"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if let Some(payload) = command {
            let name = discriminator(payload, "command_name", raw)?;
            if !COMMAND_NAMES.contains(&name.as_str()) {
                return Err(client_error(format!(
                    "Could not find command name '{}'. Valid names: {:?}",
                    name, COMMAND_NAMES
                )));
            }
            check_payload_expected(payload, &name, raw)?;
            let command: Command = match serde_json::from_value(payload.clone()) {
                Ok(command) => command,
                Err(e) => return Err(validation_error(&e)),
            };
            return Ok(Message::command(command));
        }

        // Forcément un évènement à ce point.
        let payload = event.unwrap_or(&Value::Null);
        let name = discriminator(payload, "event_name", raw)?;
        if !EVENT_NAMES.contains(&name.as_str()) {
            return Err(client_error(format!(
                "Could not find event name '{}'. Valid names: {:?}",
                name, EVENT_NAMES
            )));
        }
        let event: Event = match serde_json::from_value(payload.clone()) {
            Ok(event) => event,
            Err(e) => return Err(validation_error(&e)),
        };
        Ok(Message::event(event))
    }
}

/// Extrait le discriminant (`command_name`/`event_name`) du payload.
fn discriminator(payload: &Value, field: &str, raw: &str) -> Result<String, Box<ErrorEvent>> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Box::new(
                ErrorEvent::new(
                    ErrorType::ClientError,
                    format!("{} must be specified on the input message", field),
                )
                .with_originating_command(raw.to_string()),
            )
        })
}

/// Les commandes hors de [`PARAMETERLESS_COMMANDS`] doivent apporter un
/// payload au-delà du seul discriminant.
fn check_payload_expected(payload: &Value, name: &str, raw: &str) -> Result<(), Box<ErrorEvent>> {
    if PARAMETERLESS_COMMANDS.contains(&name) {
        return Ok(());
    }
    let has_fields = payload
        .as_object()
        .map(|o| o.keys().any(|k| k != "command_name"))
        .unwrap_or(false);
    if has_fields {
        return Ok(());
    }
    Err(Box::new(
        ErrorEvent::new(
            ErrorType::ClientError,
            format!("Payload expected for command '{}'", name),
        )
        .with_originating_command(raw.to_string()),
    ))
}

/// Résume une erreur de désérialisation pour le champ `error_data`.
///
/// Le client n'a pas envie de lire une erreur serde brute multi-schémas ;
/// on garde le format groupé historique, avec les échecs de motif regex
/// d'un côté et le reste de l'autre. serde ne produit pas d'échec de motif
/// à ce jour, le premier groupe reste donc vide.
pub fn simplify_validation_error(error: &serde_json::Error) -> String {
    format!(
        "Message failed validation.\n  'Other' type failures: {{\n\t{}\n}}",
        error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorDataEnv;

    fn all_commands() -> Vec<Command> {
        vec![
            Command::TogglePlay(TogglePlayCommand {
                play_state: Some(true),
            }),
            Command::TogglePlay(TogglePlayCommand::default()),
            Command::NextSong(NextSongCommand::default()),
            Command::ListSongs(ListSongsCommand::default()),
            Command::ListPlaylists(ListPlaylistsCommand::default()),
        ]
    }

    fn all_events() -> Vec<Event> {
        vec![
            Event::Error(ErrorEvent::new(ErrorType::Failure, "boom").with_data("details")),
            Event::PlayState(PlayStateEvent {
                new_play_state: Some(false),
            }),
            Event::SongPlaying(SongPlayingEvent {
                current_song: Some(Song {
                    name: Some("intro".to_string()),
                    local_path: Some("/music/intro.flac".to_string()),
                    ..Song::default()
                }),
            }),
            Event::ListSongs(ListSongsEvent {
                songs: Some(vec![Song::default()]),
            }),
            Event::ListPlaylists(ListPlaylistsEvent {
                playlists: Some(vec![Playlist {
                    name: Some("mix".to_string()),
                    songs: Some(vec!["intro".to_string()]),
                    ..Playlist::default()
                }]),
            }),
        ]
    }

    #[test]
    fn test_round_trip_all_commands() {
        for command in all_commands() {
            let message = Message::command(command);
            let parsed = Message::parse(&message.to_json().unwrap()).unwrap();
            assert_eq!(parsed, message);
        }
    }

    #[test]
    fn test_round_trip_all_events() {
        for event in all_events() {
            let message = Message::event(event);
            let parsed = Message::parse(&message.to_json().unwrap()).unwrap();
            assert_eq!(parsed, message);
        }
    }

    #[test]
    fn test_wire_shape_uses_discriminator_field() {
        let message = Message::command(Command::NextSong(NextSongCommand::default()));
        assert_eq!(
            message.to_json().unwrap(),
            "{\"command\":{\"command_name\":\"NEXT_SONG\"}}"
        );

        let message = Message::event(Event::PlayState(PlayStateEvent {
            new_play_state: Some(true),
        }));
        assert_eq!(
            message.to_json().unwrap(),
            "{\"event\":{\"event_name\":\"PLAY_STATE\",\"new_play_state\":true}}"
        );
    }

    #[test]
    fn test_wrap_unwrap_round_trip() {
        let payload = TogglePlayCommand {
            play_state: Some(false),
        };
        let unwrapped: TogglePlayCommand = payload.clone().wrap().unwrap_command().unwrap();
        assert_eq!(unwrapped, payload);

        let payload = PlayStateEvent {
            new_play_state: Some(true),
        };
        let unwrapped: PlayStateEvent = payload.clone().wrap().unwrap_event().unwrap();
        assert_eq!(unwrapped, payload);
    }

    #[test]
    fn test_unwrap_wrong_type_fails() {
        let message = NextSongCommand::default().wrap();
        let err = message.unwrap_command::<TogglePlayCommand>().unwrap_err();
        assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
        assert!(err.to_string().contains("TOGGLE_PLAY"));

        let err = message.unwrap_event::<PlayStateEvent>().unwrap_err();
        assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_rejects_both_set() {
        let raw = r#"{"command": {"command_name": "NEXT_SONG"}, "event": {"event_name": "ERROR"}}"#;
        let err = Message::parse(raw).unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::ClientError));
        assert!(err.error_message.as_deref().unwrap().contains("got both"));
        assert_eq!(err.originating_command.as_deref(), Some(raw));
    }

    #[test]
    fn test_parse_rejects_neither_set() {
        let err = Message::parse("{}").unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::ClientError));
        assert!(err.error_message.as_deref().unwrap().contains("got neither"));
    }

    #[test]
    fn test_parse_rejects_unknown_command_name() {
        let raw = r#"{"command": {"command_name": "FLORBUS"}}"#;
        let err = Message::parse(raw).unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::ClientError));
        assert!(err
            .error_message
            .as_deref()
            .unwrap()
            .contains("Could not find command name 'FLORBUS'"));
    }

    #[test]
    fn test_parse_rejects_missing_discriminator() {
        let raw = r#"{"command": {"play_state": true}}"#;
        let err = Message::parse(raw).unwrap_err();
        assert!(err
            .error_message
            .as_deref()
            .unwrap()
            .contains("command_name must be specified"));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = Message::parse("{florbus").unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::ClientError));
        assert!(err.error_data.as_deref().unwrap().contains("failures"));
        assert_eq!(err.error_env, Some(ErrorDataEnv::Debug));
    }

    #[test]
    fn test_parse_parameterless_without_payload() {
        for name in PARAMETERLESS_COMMANDS {
            let raw = format!(r#"{{"command": {{"command_name": "{}"}}}}"#, name);
            let message = Message::parse(&raw).unwrap();
            assert_eq!(message.command.unwrap().name(), name);
        }
    }

    #[test]
    fn test_parse_bad_payload_type_reports_validation_summary() {
        let raw = r#"{"command": {"command_name": "TOGGLE_PLAY", "play_state": "florbus"}}"#;
        let err = Message::parse(raw).unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::ClientError));
        assert!(err
            .error_data
            .as_deref()
            .unwrap()
            .starts_with("Message failed validation."));
    }
}

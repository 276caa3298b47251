//! Le handler du protocole V1 : liaison entre le schéma de messages et le
//! contrôleur de lecture.
//!
//! Chaque trame texte est parsée en [`Message`], routée vers le handler de
//! sa commande, et la réponse repart en évènement vers la session
//! émettrice. Toute erreur échappée d'un handler est rattrapée, convertie
//! en évènement `ERROR` et expurgée selon le mode debug de la
//! configuration : jamais une défaillance par trame ne ferme la connexion.

use crate::convert::{playlist_to_wire, song_to_wire};
use crate::error::SessionError;
use crate::muxer::{ClientSession, Server};
use crate::pagination::{page_out, DEFAULT_MAX_RESPONSE_SIZE};
use async_trait::async_trait;
use nbconfig::Config;
use nbcontrol::Controller;
use nbprotocol::{
    Command, ErrorEvent, ErrorType, Event, EventPayload, ListPlaylistsEvent, ListSongsEvent,
    Message, PlayStateEvent, ProtocolError, SongPlayingEvent, TogglePlayCommand,
    UNEXPECTED_ERROR_MESSAGE,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Le serveur de commandes média V1.
pub struct MediaServer {
    controller: Arc<Mutex<Controller>>,
    config: Config,
}

impl MediaServer {
    pub fn new(controller: Arc<Mutex<Controller>>, config: Config) -> Self {
        MediaServer { controller, config }
    }

    /// Émet un évènement d'erreur vers la session, expurgé si le processus
    /// n'est pas en mode debug.
    fn send_error(&self, session: &ClientSession, event: ErrorEvent) -> Result<(), SessionError> {
        let event = if self.config.debug {
            event
        } else {
            event.for_prod()
        };
        session.send(&Message::event(Event::Error(event)))
    }

    fn lock_controller(&self, raw: &str) -> Result<MutexGuard<'_, Controller>, ErrorEvent> {
        self.controller.lock().map_err(|_| {
            ErrorEvent::new(ErrorType::InternalError, UNEXPECTED_ERROR_MESSAGE)
                .with_data("controller state poisoned by an earlier panic".to_string())
                .with_originating_command(raw.to_string())
        })
    }

    /// Convertit une erreur du contrôleur en évènement d'erreur.
    fn controller_error(&self, error: nbcontrol::Error, raw: &str) -> ErrorEvent {
        if error.is_user_error() {
            return ErrorEvent::new(ErrorType::UserError, error.to_string())
                .with_originating_command(raw.to_string());
        }
        if matches!(
            error,
            nbcontrol::Error::Library(nblibrary::Error::Io { .. })
        ) {
            return ErrorEvent::new(ErrorType::Failure, error.to_string())
                .with_originating_command(raw.to_string());
        }
        ErrorEvent::new(ErrorType::InternalError, UNEXPECTED_ERROR_MESSAGE)
            .with_data(error.to_string())
            .with_originating_command(raw.to_string())
    }

    fn dispatch(&self, command: Command, raw: &str) -> Result<Event, ErrorEvent> {
        match command {
            Command::TogglePlay(toggle) => self.toggle_play(toggle, raw),
            Command::NextSong(_) => self.next_song(raw),
            Command::ListSongs(_) => self.list_songs(raw),
            Command::ListPlaylists(_) => self.list_playlists(raw),
        }
    }

    fn toggle_play(&self, toggle: TogglePlayCommand, raw: &str) -> Result<Event, ErrorEvent> {
        let mut controller = self.lock_controller(raw)?;
        match toggle.play_state {
            None => controller.toggle_pause(),
            Some(play) => controller.set_pause(!play),
        }
        Ok(PlayStateEvent {
            new_play_state: Some(controller.playing()),
        }
        .into_event())
    }

    /// `NEXT_SONG` saute le morceau courant : arrêt, avance de l'arbre,
    /// lecture du résultat. `current_song` reste absent quand la file est
    /// épuisée.
    fn next_song(&self, raw: &str) -> Result<Event, ErrorEvent> {
        let mut controller = self.lock_controller(raw)?;
        let uri = controller
            .next_track()
            .map_err(|e| self.controller_error(e, raw))?;
        let current_song = uri.and_then(|uri| {
            controller
                .library()
                .list_songs()
                .into_iter()
                .find(|song| song.uri() == uri)
                .map(|song| song_to_wire(&song))
        });
        Ok(SongPlayingEvent { current_song }.into_event())
    }

    fn list_songs(&self, raw: &str) -> Result<Event, ErrorEvent> {
        let controller = self.lock_controller(raw)?;
        let songs: Vec<nbprotocol::Song> = controller
            .library()
            .list_songs()
            .iter()
            .map(song_to_wire)
            .collect();
        drop(controller);

        // Première page : les commandes V1 ne portent pas encore de jeton.
        let (page, _next) = page_out(&songs, DEFAULT_MAX_RESPONSE_SIZE, None)
            .map_err(|e| self.pagination_error(e, raw))?;
        Ok(ListSongsEvent {
            songs: Some(page.to_vec()),
        }
        .into_event())
    }

    fn list_playlists(&self, raw: &str) -> Result<Event, ErrorEvent> {
        let controller = self.lock_controller(raw)?;
        let playlists: Vec<nbprotocol::Playlist> = controller
            .library()
            .list_playlists()
            .iter()
            .map(|(name, songs)| playlist_to_wire(name, songs))
            .collect();
        drop(controller);

        let (page, _next) = page_out(&playlists, DEFAULT_MAX_RESPONSE_SIZE, None)
            .map_err(|e| self.pagination_error(e, raw))?;
        Ok(ListPlaylistsEvent {
            playlists: Some(page.to_vec()),
        }
        .into_event())
    }

    fn pagination_error(&self, error: crate::pagination::PageError, raw: &str) -> ErrorEvent {
        ErrorEvent::new(ErrorType::ClientError, error.to_string())
            .with_originating_command(raw.to_string())
    }

    /// Route un évènement entrant. Les `ERROR` des clients sont journalisés
    /// et ignorés ; tout autre évènement n'a rien à faire côté serveur.
    fn handle_event(
        &self,
        event: Event,
        raw: &str,
        session: &ClientSession,
    ) -> Result<(), SessionError> {
        match event {
            Event::Error(error) => {
                warn!("Client {} reported an error: {:?}", session.id(), error);
                Ok(())
            }
            other => {
                let unsupported = ProtocolError::UnsupportedMessageType {
                    kind: "Event",
                    name: other.name().to_string(),
                };
                self.send_error(
                    session,
                    ErrorEvent::new(ErrorType::ClientError, unsupported.to_string())
                        .with_originating_command(raw.to_string()),
                )
            }
        }
    }
}

#[async_trait]
impl Server for MediaServer {
    async fn accept(&self, message: &str, session: &ClientSession) -> Result<(), SessionError> {
        let parsed = match Message::parse(message) {
            Ok(parsed) => parsed,
            Err(error_event) => {
                debug!("Frame from {} failed validation", session.id());
                return self.send_error(session, *error_event);
            }
        };

        if let Some(event) = parsed.event {
            return self.handle_event(event, message, session);
        }

        // Message::parse garantit exactement un des deux champs.
        let Some(command) = parsed.command else {
            return Ok(());
        };
        debug!("Client {} sent {}", session.id(), command.name());
        match self.dispatch(command, message) {
            Ok(event) => session.send(&Message::event(event)),
            Err(error_event) => self.send_error(session, error_event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbcontrol::NullPlayer;
    use nblibrary::{MediaLibrary, Song};
    use nbprotocol::ErrorDataEnv;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_library(dir: &TempDir) -> MediaLibrary {
        let mut library = MediaLibrary::new();
        for alias in ["s1", "s2", "s3"] {
            let path = dir.path().join(format!("{}.flac", alias));
            fs::write(&path, b"audio").unwrap();
            library
                .add_song(
                    Song::new(alias, path.to_str().unwrap(), "").unwrap(),
                    false,
                )
                .unwrap();
        }
        library.create_playlist("P", false).unwrap();
        library.add_song_to_playlist("s1", "P").unwrap();
        library.add_song_to_playlist("s2", "P").unwrap();
        library
    }

    fn media_server(dir: &TempDir, debug: bool) -> (MediaServer, Arc<Mutex<Controller>>) {
        let controller = Arc::new(Mutex::new(Controller::new(
            Box::new(NullPlayer::new()),
            test_library(dir),
        )));
        let config = Config::builder().debug(debug).build();
        (MediaServer::new(controller.clone(), config), controller)
    }

    async fn accept_one(
        server: &MediaServer,
        frame: &str,
    ) -> (ClientSession, UnboundedReceiver<String>, Message) {
        let (session, mut rx) = ClientSession::channel();
        server.accept(frame, &session).await.unwrap();
        let reply = rx.try_recv().expect("expected one reply event");
        (session, rx, Message::parse(&reply).unwrap())
    }

    fn error_of(message: &Message) -> ErrorEvent {
        message.unwrap_event::<ErrorEvent>().expect("expected an ERROR event")
    }

    #[tokio::test]
    async fn test_toggle_play_from_paused() {
        let dir = tempfile::tempdir().unwrap();
        let (server, controller) = media_server(&dir, true);
        assert!(!controller.lock().unwrap().playing());

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "TOGGLE_PLAY"}}"#).await;
        let play_state: PlayStateEvent = reply.unwrap_event().unwrap();
        assert_eq!(play_state.new_play_state, Some(true));
        assert!(controller.lock().unwrap().playing());
    }

    #[tokio::test]
    async fn test_toggle_play_explicit_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (server, controller) = media_server(&dir, true);
        controller.lock().unwrap().set_pause(false);
        assert!(controller.lock().unwrap().playing());

        let frame = r#"{"command": {"command_name": "TOGGLE_PLAY", "play_state": true}}"#;
        let (_s, _rx, reply) = accept_one(&server, frame).await;
        let play_state: PlayStateEvent = reply.unwrap_event().unwrap();
        assert_eq!(play_state.new_play_state, Some(true));
        assert!(controller.lock().unwrap().playing());
    }

    #[tokio::test]
    async fn test_unknown_command_name() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let frame = r#"{"command": {"command_name": "FLORBUS"}}"#;
        let (_s, _rx, reply) = accept_one(&server, frame).await;
        let error = error_of(&reply);
        assert_eq!(error.error_type, Some(ErrorType::ClientError));
        assert!(error
            .error_message
            .as_deref()
            .unwrap()
            .contains("Could not find command name 'FLORBUS'"));
        assert_eq!(error.originating_command.as_deref(), Some(frame));
    }

    #[tokio::test]
    async fn test_invalid_json_reports_validation_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let (_s, _rx, reply) = accept_one(&server, "{florbus").await;
        let error = error_of(&reply);
        assert_eq!(error.error_type, Some(ErrorType::ClientError));
        assert!(error.error_data.as_deref().unwrap().contains("failures"));
        assert_eq!(error.error_env, Some(ErrorDataEnv::Debug));
    }

    #[tokio::test]
    async fn test_production_redaction_of_client_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, false);

        let (_s, _rx, reply) = accept_one(&server, "{florbus").await;
        let error = error_of(&reply);
        assert_eq!(error.error_env, Some(ErrorDataEnv::Production));
        assert_eq!(error.error_data, None);
        assert_eq!(error.originating_command, None);
    }

    #[tokio::test]
    async fn test_production_redaction_of_internal_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (server, controller) = media_server(&dir, false);

        // On empoisonne le mutex du contrôleur pour forcer le chemin
        // d'erreur interne.
        let poisoned = controller.clone();
        std::thread::spawn(move || {
            let _guard = poisoned.lock().unwrap();
            panic!("poison");
        })
        .join()
        .unwrap_err();

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "TOGGLE_PLAY"}}"#).await;
        let error = error_of(&reply);
        assert_eq!(error.error_type, Some(ErrorType::InternalError));
        assert_eq!(error.error_message.as_deref(), Some(UNEXPECTED_ERROR_MESSAGE));
        assert_eq!(error.error_data, None);
        assert_eq!(error.error_env, Some(ErrorDataEnv::Production));
    }

    #[tokio::test]
    async fn test_internal_error_keeps_data_in_debug() {
        let dir = tempfile::tempdir().unwrap();
        let (server, controller) = media_server(&dir, true);

        let poisoned = controller.clone();
        std::thread::spawn(move || {
            let _guard = poisoned.lock().unwrap();
            panic!("poison");
        })
        .join()
        .unwrap_err();

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "TOGGLE_PLAY"}}"#).await;
        let error = error_of(&reply);
        assert_eq!(error.error_type, Some(ErrorType::InternalError));
        assert!(error.error_message.as_deref().unwrap().starts_with("Unexpected error"));
        assert!(error.error_data.is_some());
        assert_eq!(error.error_env, Some(ErrorDataEnv::Debug));
    }

    #[tokio::test]
    async fn test_next_song_skips_current() {
        let dir = tempfile::tempdir().unwrap();
        let (server, controller) = media_server(&dir, true);
        controller.lock().unwrap().play("P").unwrap();

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "NEXT_SONG"}}"#).await;
        let playing: SongPlayingEvent = reply.unwrap_event().unwrap();
        let song = playing.current_song.unwrap();
        assert_eq!(song.name.as_deref(), Some("s2"));

        // File épuisée : current_song absent.
        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "NEXT_SONG"}}"#).await;
        let playing: SongPlayingEvent = reply.unwrap_event().unwrap();
        assert!(playing.current_song.is_none());
    }

    #[tokio::test]
    async fn test_list_songs_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "LIST_SONGS"}}"#).await;
        let listing: ListSongsEvent = reply.unwrap_event().unwrap();
        let names: Vec<String> = listing
            .songs
            .unwrap()
            .into_iter()
            .filter_map(|song| song.name)
            .collect();
        assert_eq!(names, vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_list_playlists_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let (_s, _rx, reply) =
            accept_one(&server, r#"{"command": {"command_name": "LIST_PLAYLISTS"}}"#).await;
        let listing: ListPlaylistsEvent = reply.unwrap_event().unwrap();
        let playlists = listing.playlists.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].name.as_deref(), Some("P"));
        assert_eq!(
            playlists[0].songs.as_deref(),
            Some(&["s1".to_string(), "s2".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_incoming_error_event_is_logged_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let frame = r#"{"event": {"event_name": "ERROR", "error_message": "client side boom"}}"#;
        let (session, mut rx) = ClientSession::channel();
        server.accept(frame, &session).await.unwrap();
        assert!(rx.try_recv().is_err(), "ERROR events should not be answered");
    }

    #[tokio::test]
    async fn test_unexpected_event_type_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _controller) = media_server(&dir, true);

        let frame = r#"{"event": {"event_name": "PLAY_STATE", "new_play_state": true}}"#;
        let (_s, _rx, reply) = accept_one(&server, frame).await;
        let error = error_of(&reply);
        assert_eq!(error.error_type, Some(ErrorType::ClientError));
        assert!(error
            .error_message
            .as_deref()
            .unwrap()
            .contains("PLAY_STATE"));
    }
}

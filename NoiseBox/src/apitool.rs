//! Client une-commande pour le serveur de commandes : construit la
//! commande depuis la ligne de commande, l'envoie sur la websocket,
//! affiche la première réponse du serveur.

use anyhow::{bail, Context};
use futures::{SinkExt, StreamExt};
use nbconfig::Config;
use nbprotocol::{
    Command, ListPlaylistsCommand, ListSongsCommand, Message, NextSongCommand, TogglePlayCommand,
    COMMAND_NAMES, SERVING_PATH,
};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::debug;

/// Construit la commande V1 depuis son nom et ses arguments bruts.
fn build_command(name: &str, args: &[String]) -> anyhow::Result<Command> {
    match name {
        "TOGGLE_PLAY" => {
            let play_state = match args.first() {
                None => None,
                Some(raw) => Some(raw.parse::<bool>().with_context(|| {
                    format!("TOGGLE_PLAY takes an optional true/false, got '{}'", raw)
                })?),
            };
            Ok(Command::TogglePlay(TogglePlayCommand { play_state }))
        }
        "NEXT_SONG" => Ok(Command::NextSong(NextSongCommand::default())),
        "LIST_SONGS" => Ok(Command::ListSongs(ListSongsCommand::default())),
        "LIST_PLAYLISTS" => Ok(Command::ListPlaylists(ListPlaylistsCommand::default())),
        other => bail!(
            "unknown command '{}', valid commands: {:?}",
            other,
            COMMAND_NAMES
        ),
    }
}

/// Envoie une commande et affiche la réponse. Code retour non nul sur
/// erreur d'argument ou de connexion.
pub async fn run(config: &Config, command_name: &str, args: &[String]) -> anyhow::Result<()> {
    let command = build_command(command_name, args)?;
    let url = format!("ws://{}:{}{}", config.host, config.port, SERVING_PATH);

    let (mut socket, _) = connect_async(&url)
        .await
        .with_context(|| format!("could not connect to '{}'", url))?;
    debug!("connected to {}", url);

    let frame = Message::command(command)
        .to_json()
        .context("could not serialize the command")?;
    socket.send(WsMessage::Text(frame)).await?;

    while let Some(frame) = socket.next().await {
        match frame? {
            WsMessage::Text(text) => {
                // Réponse rendue lisible si c'est bien du JSON, brute sinon.
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                    Err(_) => println!("{}", text),
                }
                break;
            }
            WsMessage::Close(frame) => {
                bail!("server closed the connection: {:?}", frame);
            }
            _ => continue,
        }
    }

    socket.close(None).await.ok();
    Ok(())
}

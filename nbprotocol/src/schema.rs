//! Export des schémas JSON des types wire, pour les clients et les
//! implémentations tierces du serveur de commandes.

use crate::message::{
    Command, Event, ListPlaylistsCommand, ListPlaylistsEvent, ListSongsCommand, ListSongsEvent,
    Message, NextSongCommand, PlayStateEvent, SongPlayingEvent, TogglePlayCommand,
};
use crate::types::{ErrorEvent, Playlist, Song};
use crate::VERSION;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;
use utoipa::openapi::{RefOr, Schema};
use utoipa::PartialSchema;

fn schema_entries() -> Vec<(&'static str, RefOr<Schema>)> {
    vec![
        // Objets
        ("Song", Song::schema()),
        ("Playlist", Playlist::schema()),
        // Commandes
        ("TogglePlayCommand", TogglePlayCommand::schema()),
        ("NextSongCommand", NextSongCommand::schema()),
        ("ListSongsCommand", ListSongsCommand::schema()),
        ("ListPlaylistsCommand", ListPlaylistsCommand::schema()),
        // Évènements
        ("ErrorEvent", ErrorEvent::schema()),
        ("PlayStateEvent", PlayStateEvent::schema()),
        ("SongPlayingEvent", SongPlayingEvent::schema()),
        ("ListSongsEvent", ListSongsEvent::schema()),
        ("ListPlaylistsEvent", ListPlaylistsEvent::schema()),
        // Enveloppe
        ("Command", Command::schema()),
        ("Event", Event::schema()),
        ("Message", Message::schema()),
    ]
}

/// Écrit un fichier `<Type>.json` par type wire dans `<out_dir>/v1/`.
pub fn write_schemas(out_dir: &Path) -> io::Result<()> {
    let out_dir = out_dir.join(VERSION);
    fs::create_dir_all(&out_dir)?;
    info!("printing schema files to: {}", out_dir.display());
    for (name, schema) in schema_entries() {
        let rendered = serde_json::to_string_pretty(&schema)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(out_dir.join(format!("{}.json", name)), rendered)?;
    }
    info!("finished writing.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_schemas_creates_one_file_per_type() {
        let dir = tempfile::tempdir().unwrap();
        write_schemas(dir.path()).unwrap();

        let v1 = dir.path().join(VERSION);
        for (name, _) in schema_entries() {
            let path = v1.join(format!("{}.json", name));
            assert!(path.is_file(), "missing schema for {}", name);
            let raw = fs::read_to_string(&path).unwrap();
            // Chaque fichier doit être du JSON valide.
            serde_json::from_str::<serde_json::Value>(&raw).unwrap();
        }
    }
}

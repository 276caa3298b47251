//! Conversion des types de la bibliothèque vers les objets wire V1.

use nbprotocol::{Playlist, Song};

/// Projette une chanson de la bibliothèque vers sa forme wire.
///
/// La description vide est omise plutôt qu'envoyée comme chaîne vide.
pub fn song_to_wire(song: &nblibrary::Song) -> Song {
    Song {
        name: Some(song.alias().to_string()),
        description: match song.description() {
            "" => None,
            description => Some(description.to_string()),
        },
        metadata: None,
        local_path: Some(song.uri().to_string()),
    }
}

/// Projette une playlist `(nom, alias)` vers sa forme wire.
pub fn playlist_to_wire(name: &str, songs: &[String]) -> Playlist {
    Playlist {
        name: Some(name.to_string()),
        description: None,
        metadata: None,
        songs: Some(songs.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_song_to_wire_omits_empty_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.flac");
        fs::write(&path, b"audio").unwrap();
        let uri = path.to_str().unwrap();

        let song = nblibrary::Song::new("a", uri, "").unwrap();
        let wire = song_to_wire(&song);
        assert_eq!(wire.name.as_deref(), Some("a"));
        assert_eq!(wire.description, None);
        assert_eq!(wire.local_path.as_deref(), Some(uri));

        let song = nblibrary::Song::new("b", uri, "a banger").unwrap();
        assert_eq!(song_to_wire(&song).description.as_deref(), Some("a banger"));
    }

    #[test]
    fn test_playlist_to_wire() {
        let wire = playlist_to_wire("mix", &["a".to_string(), "b".to_string()]);
        assert_eq!(wire.name.as_deref(), Some("mix"));
        assert_eq!(wire.songs.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }
}

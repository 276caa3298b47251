//! # nblibrary - Bibliothèque musicale de NoiseBox
//!
//! Cette crate stocke les chansons et playlists du lecteur :
//! - Chansons indexées par alias court, plus lisible qu'une URI
//! - Playlists nommées : séquences ordonnées d'alias (doublons permis)
//! - Résolution alias/playlist vers une liste d'URIs à jouer
//! - Sérialisation vers un document JSON versionné
//!
//! Tous les accesseurs `get_*`/`list_*` retournent des copies défensives.
//!
//! # Exemples
//!
//! ```no_run
//! use nblibrary::{MediaLibrary, Song};
//!
//! let mut library = MediaLibrary::new();
//! library.add_song(Song::new("intro", "/music/intro.flac", "")?, false)?;
//! library.create_playlist("morning", false)?;
//! library.add_song_to_playlist("intro", "morning")?;
//!
//! let uris = library.resolve("morning")?;
//! assert_eq!(uris, vec!["/music/intro.flac".to_string()]);
//! # Ok::<(), nblibrary::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

mod error;

pub use error::{Error, Result};

/// Version courante du format de document. À incrémenter à chaque
/// changement de `to_document`.
pub const LIBRARY_VERSION: f64 = 1.0;

const VERSION_FIELD: &str = "version";

/// Une chanson référencée par la bibliothèque.
///
/// L'égalité porte sur `(alias, uri)` uniquement : la description est une
/// métadonnée, pas une clé.
#[derive(Debug, Clone)]
pub struct Song {
    /// Alias unique dans une bibliothèque, choisi par l'utilisateur.
    alias: String,

    /// URI du fichier audio. Doit exister localement à la construction.
    uri: String,

    /// Description libre, purement informative.
    description: String,
}

impl Song {
    /// Crée une chanson après validation de l'alias et de l'URI.
    ///
    /// L'URI doit pointer vers un fichier local existant au moment de la
    /// construction.
    pub fn new(
        alias: impl Into<String>,
        uri: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let alias = alias.into();
        let uri = uri.into();
        if alias.is_empty() {
            return Err(Error::IllegalArgument(
                "Expected non-empty alias for song, got \"\"".to_string(),
            ));
        }
        check_file_exists(&uri)?;
        Ok(Song {
            alias,
            uri,
            description: description.into(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        // La description est explicitement ignorée : ce n'est pas une clé.
        self.alias == other.alias && self.uri == other.uri
    }
}

impl Eq for Song {}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Song{{alias: '{}', uri: '{}', description: '{}'}}",
            self.alias, self.uri, self.description
        )
    }
}

fn check_file_exists(uri: &str) -> Result<()> {
    if Path::new(uri).is_file() {
        return Ok(());
    }
    Err(Error::NotFound(format!("Could not find file '{}'", uri)))
}

/// Bibliothèque musicale : chansons par alias, playlists nommées.
///
/// Les listes (`list_songs`, `list_playlists`) sont ordonnées par insertion.
/// Une playlist peut contenir un alias devenu orphelin si la chanson a été
/// écrasée ou supprimée après coup ; `resolve` tolère ces absences.
#[derive(Debug, Default, Clone)]
pub struct MediaLibrary {
    song_map: HashMap<String, Song>,
    song_order: Vec<String>,
    playlists: HashMap<String, Vec<String>>,
    playlist_order: Vec<String>,
}

impl PartialEq for MediaLibrary {
    fn eq(&self, other: &Self) -> bool {
        // L'ordre d'insertion est du confort d'affichage, pas une clé.
        self.song_map == other.song_map && self.playlists == other.playlists
    }
}

impl Eq for MediaLibrary {}

impl MediaLibrary {
    /// Crée une bibliothèque vide.
    pub fn new() -> Self {
        MediaLibrary::default()
    }

    /// Ajoute une chanson sous son alias.
    ///
    /// Échoue avec `AlreadyExists` si l'alias est pris et que `overwrite`
    /// est faux.
    pub fn add_song(&mut self, song: Song, overwrite: bool) -> Result<()> {
        if let Some(existing) = self.song_map.get(&song.alias) {
            if !overwrite {
                return Err(Error::AlreadyExists(format!(
                    "Song '{}' already exists in the library as '{}'",
                    song, existing
                )));
            }
        } else {
            self.song_order.push(song.alias.clone());
        }
        self.song_map.insert(song.alias.clone(), song);
        Ok(())
    }

    /// Retourne une copie défensive de la chanson.
    pub fn get_song(&self, alias: &str) -> Result<Song> {
        self.song_map.get(alias).cloned().ok_or_else(|| {
            Error::NotFound(format!("Could not find song '{}' in the library", alias))
        })
    }

    /// Toutes les chansons, dans l'ordre d'insertion.
    pub fn list_songs(&self) -> Vec<Song> {
        self.song_order
            .iter()
            .filter_map(|alias| self.song_map.get(alias).cloned())
            .collect()
    }

    /// Crée une playlist vide.
    pub fn create_playlist(&mut self, name: &str, overwrite: bool) -> Result<()> {
        if name.is_empty() {
            return Err(Error::IllegalArgument(
                "Expected name for playlist, got \"\"".to_string(),
            ));
        }
        if let Some(existing) = self.playlists.get(name) {
            if !overwrite {
                return Err(Error::AlreadyExists(format!(
                    "Playlist '{}' already exists! {{{:?}}}",
                    name, existing
                )));
            }
        } else {
            self.playlist_order.push(name.to_string());
        }
        self.playlists.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Ajoute un alias en fin de playlist. L'alias et la playlist doivent
    /// exister au moment de l'insertion.
    pub fn add_song_to_playlist(&mut self, alias: &str, name: &str) -> Result<()> {
        if !self.playlists.contains_key(name) {
            return Err(Error::NotFound(format!(
                "Couldn't find playlist '{}' when adding song '{}'",
                name, alias
            )));
        }
        if !self.song_map.contains_key(alias) {
            return Err(Error::NotFound(format!("Couldn't find song '{}'", alias)));
        }
        // Les deux existent, l'entry ne peut pas manquer.
        if let Some(playlist) = self.playlists.get_mut(name) {
            playlist.push(alias.to_string());
        }
        Ok(())
    }

    /// Retire la première occurrence de l'alias dans la playlist.
    pub fn remove_from_playlist(&mut self, alias: &str, name: &str) -> Result<()> {
        let playlist = self.playlists.get_mut(name).ok_or_else(|| {
            Error::NotFound(format!(
                "Playlist '{}' not found in playlist collection",
                name
            ))
        })?;
        let position = playlist.iter().position(|a| a == alias).ok_or_else(|| {
            Error::NotFound(format!(
                "Song '{}' not found in playlist '{}'",
                alias, name
            ))
        })?;
        playlist.remove(position);
        Ok(())
    }

    /// Retourne une copie défensive de la playlist.
    pub fn get_playlist(&self, name: &str) -> Result<Vec<String>> {
        self.playlists.get(name).cloned().ok_or_else(|| {
            Error::NotFound(format!(
                "Playlist '{}' not found in playlist collection",
                name
            ))
        })
    }

    /// Toutes les playlists `(nom, alias)`, dans l'ordre d'insertion.
    pub fn list_playlists(&self) -> Vec<(String, Vec<String>)> {
        self.playlist_order
            .iter()
            .filter_map(|name| {
                self.playlists
                    .get(name)
                    .map(|songs| (name.clone(), songs.clone()))
            })
            .collect()
    }

    /// Résout un identifiant vers les URIs à jouer : playlist d'abord,
    /// sinon alias de chanson seule.
    ///
    /// Les alias orphelins d'une playlist sont ignorés avec un warning.
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        if let Ok(aliases) = self.get_playlist(name) {
            let mut uris = Vec::with_capacity(aliases.len());
            for alias in &aliases {
                match self.get_song(alias) {
                    Ok(song) => uris.push(song.uri),
                    Err(_) => {
                        warn!(
                            "Playlist '{}' references missing song '{}', skipping",
                            name, alias
                        );
                    }
                }
            }
            return Ok(uris);
        }
        Ok(vec![self.get_song(name)?.uri])
    }

    /// Sérialise la bibliothèque vers un document JSON versionné.
    pub fn to_document(&self) -> serde_json::Value {
        let songs: Vec<SongDocV1> = self
            .list_songs()
            .into_iter()
            .map(|song| SongDocV1 {
                version: LIBRARY_VERSION,
                alias: song.alias,
                uri: song.uri,
                description: song.description,
            })
            .collect();
        let playlists: HashMap<String, Vec<String>> = self
            .list_playlists()
            .into_iter()
            .collect();
        serde_json::json!({
            "version": LIBRARY_VERSION,
            "songs": songs,
            "playlists": playlists,
        })
    }

    /// Reconstruit une bibliothèque depuis un document versionné.
    ///
    /// Le champ `version` de tête choisit le parseur ; une version inconnue
    /// échoue avec `BadFormat`.
    pub fn from_document(document: &serde_json::Value) -> Result<Self> {
        let version = document
            .get(VERSION_FIELD)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| {
                Error::BadFormat(format!(
                    "bad version field, expected number, got '{}'",
                    document.get(VERSION_FIELD).unwrap_or(&serde_json::Value::Null)
                ))
            })?;

        match version {
            v if v == 1.0 => Self::parse_v1(document),
            other => Err(Error::BadFormat(format!(
                "unknown library version '{}'",
                other
            ))),
        }
    }

    fn parse_v1(document: &serde_json::Value) -> Result<Self> {
        let doc: LibraryDocV1 = serde_json::from_value(document.clone())
            .map_err(|e| Error::BadFormat(e.to_string()))?;

        let mut library = MediaLibrary::new();
        for song in doc.songs {
            library.add_song(Song::new(song.alias, song.uri, song.description)?, false)?;
        }
        let mut names: Vec<&String> = doc.playlists.keys().collect();
        names.sort();
        for name in names {
            library.create_playlist(name, false)?;
            // On réinsère directement : le document peut légitimement
            // contenir des alias orphelins.
            if let Some(playlist) = library.playlists.get_mut(name) {
                playlist.extend(doc.playlists[name].iter().cloned());
            }
        }
        Ok(library)
    }

    /// Écrit le document JSON de la bibliothèque dans un fichier.
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = serde_json::to_string_pretty(&self.to_document())
            .map_err(|e| Error::BadFormat(e.to_string()))?;
        fs::write(path, rendered).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Charge une bibliothèque depuis un fichier document.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| Error::BadFormat(e.to_string()))?;
        Self::from_document(&document)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SongDocV1 {
    version: f64,
    alias: String,
    uri: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct LibraryDocV1 {
    #[allow(dead_code)]
    version: f64,
    #[serde(default)]
    songs: Vec<SongDocV1>,
    #[serde(default)]
    playlists: HashMap<String, Vec<String>>,
}

//! Le contrat du moteur audio, et son implémentation muette.
//!
//! Le vrai moteur de décodage est un collaborateur externe : il est
//! quasiment impossible de tester correctement un contrat avec une
//! bibliothèque audio native. L'interface est donc gardée aussi petite que
//! possible pour qu'une implémentation factice soit triviale, et que tout
//! problème d'intégration saute aux yeux avec un minimum de tests manuels.

use crate::error::Result;
use std::fmt;
use tracing::{debug, info};

/// Callback invoqué par le moteur audio à la fin de chaque morceau.
///
/// Appelé depuis le thread audio du moteur : il ne doit PAS muter l'arbre
/// d'oracles directement, seulement poster vers le domaine de
/// synchronisation du contrôleur.
pub type TrackEndCallback = Box<dyn Fn() + Send + Sync>;

/// Une sortie audio telle qu'énumérée par le moteur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Identifiant système, passé à [`Player::set_device`].
    pub id: String,

    /// Description lisible, montrée à l'utilisateur.
    pub description: String,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Contrat minimal du moteur audio.
pub trait Player: Send {
    /// Joue l'URI donnée, en remplaçant la lecture en cours.
    fn play(&mut self, uri: &str) -> Result<()>;

    fn stop(&mut self);

    fn set_pause(&mut self, paused: bool);

    /// Vrai si le moteur rend effectivement de l'audio (lecture, buffering
    /// ou ouverture du flux).
    fn playing(&self) -> bool;

    fn set_device(&mut self, device_id: &str) -> Result<()>;

    fn list_devices(&self) -> Vec<AudioDevice>;

    /// Installe le callback de fin de morceau. Un seul callback à la fois.
    fn next_track_callback(&mut self, callback: TrackEndCallback);
}

/// Player sans moteur audio : trace les appels et tient l'état, ne rend
/// rien. Sert d'implémentation par défaut du processus hôte et de doublure
/// dans les tests.
#[derive(Default)]
pub struct NullPlayer {
    current: Option<String>,
    playing: bool,
    device: Option<String>,
    callback: Option<TrackEndCallback>,
}

impl NullPlayer {
    pub fn new() -> Self {
        NullPlayer::default()
    }

    /// L'URI en cours de « lecture », pour les assertions de test.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Simule la fin du morceau en cours : invoque le callback installé.
    pub fn finish_track(&self) {
        if let Some(callback) = &self.callback {
            callback();
        }
    }
}

impl Player for NullPlayer {
    fn play(&mut self, uri: &str) -> Result<()> {
        info!("🎵 NullPlayer playing '{}'", uri);
        self.current = Some(uri.to_string());
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.current = None;
        self.playing = false;
    }

    fn set_pause(&mut self, paused: bool) {
        self.playing = !paused;
    }

    fn playing(&self) -> bool {
        self.playing
    }

    fn set_device(&mut self, device_id: &str) -> Result<()> {
        debug!("NullPlayer output device set to '{}'", device_id);
        self.device = Some(device_id.to_string());
        Ok(())
    }

    fn list_devices(&self) -> Vec<AudioDevice> {
        vec![AudioDevice {
            id: "default".to_string(),
            description: "Default audio output".to_string(),
        }]
    }

    fn next_track_callback(&mut self, callback: TrackEndCallback) {
        self.callback = Some(callback);
    }
}

//! # nbcontrol - Contrôleur de lecture de NoiseBox
//!
//! Cette crate relie la bibliothèque musicale, l'arbre d'oracles et le
//! moteur audio :
//! - Trait [`Player`] : le contrat minimal attendu du moteur audio
//! - [`Controller`] : traduit les actions utilisateur (play, queue,
//!   interrupt, pause...) en mutations d'arbre et en appels au player
//! - [`AudioDevices`] : instantané indexé des sorties audio, invalidé à
//!   chaque rafraîchissement
//!
//! Le contrôleur possède une topologie d'oracles fixe :
//! `Interrupt(Switch(Chain))`. La chaîne est la file d'attente de
//! l'utilisateur ; le switch permet de remplacer toute la file d'un coup
//! (sur `play`) ; la couche interrupt injecte une lecture courte puis rend
//! la main à la file.
//!
//! Côté concurrence, le contrôleur n'est pas thread-safe par lui-même :
//! l'hôte le partage derrière un `Mutex`, et le callback fin-de-morceau du
//! player (appelé depuis le thread audio) ne fait que poster dans une
//! boîte aux lettres crossbeam consommée côté contrôleur.

mod controller;
mod error;
mod player;

pub use controller::{AudioDevices, Controller};
pub use error::{Error, Result};
pub use player::{AudioDevice, NullPlayer, Player, TrackEndCallback};

//! Objets du schéma V1 : chansons, playlists et évènements d'erreur.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Message générique présenté quand une erreur interne est expurgée pour
/// la production.
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "Unexpected error encountered while processing the command.";

/// Une chanson telle que vue par les clients du protocole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Song {
    /// Nom lisible de la chanson. Unique dans une bibliothèque, sert de
    /// référence partout ailleurs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description lisible, purement informative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Métadonnées clé/valeur additionnelles, non spécifiées à ce jour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,

    /// Chemin du fichier du point de vue du serveur local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// Une playlist telle que vue par les clients du protocole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Playlist {
    /// Nom de la playlist, choisi par l'utilisateur. Unique dans une
    /// bibliothèque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,

    /// Liste ordonnée d'alias de chansons (`Song.name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<String>>,
}

/// Classes d'échec d'une commande. Indique où chercher, et si une nouvelle
/// tentative a une chance d'aboutir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Échec « normal » : l'utilisateur final a fourni une mauvaise entrée.
    UserError,

    /// Le code client a fait quelque chose d'invalide au niveau protocole.
    ClientError,

    /// Échec runtime attendu : I/O, fichier manquant, etc.
    Failure,

    /// Quelque chose a vraiment mal tourné : erreur imprévue, non rattrapée
    /// plus tôt dans le traitement.
    InternalError,
}

/// Indique si les données de diagnostic d'une erreur ont été expurgées.
///
/// Un développeur qui voit `DEBUG` sans `error_data` ne cherchera pas au
/// même endroit qu'avec `PRODUCTION` sans `error_data` ; l'information vaut
/// d'être transportée même quand elle semble évidente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorDataEnv {
    /// En production : données de debug expurgées.
    Production,

    /// En développement : données de debug conservées.
    Debug,
}

/// Quelque chose s'est mal passé et le pair à l'autre bout du fil doit le
/// savoir.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEvent {
    /// Message d'erreur destiné à l'utilisateur. Toujours renseigné.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Classe d'erreur (voir [`ErrorType`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,

    /// Données destinées aux développeurs et aux machines. Absentes des
    /// builds de production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<String>,

    /// Environnement ciblé par les données de retour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_env: Option<ErrorDataEnv>,

    /// La commande brute à l'origine de cet évènement. Absente en
    /// production, absente aussi pour les erreurs sans commande
    /// contributrice. Peut être une chaîne non parsée.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originating_command: Option<String>,
}

impl ErrorEvent {
    /// Crée un évènement d'erreur en mode DEBUG (données conservées).
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        ErrorEvent {
            error_message: Some(message.into()),
            error_type: Some(error_type),
            error_data: None,
            error_env: Some(ErrorDataEnv::Debug),
            originating_command: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.error_data = Some(data.into());
        self
    }

    pub fn with_originating_command(mut self, command: impl Into<String>) -> Self {
        self.originating_command = Some(command.into());
        self
    }

    /// Version expurgée pour la production : les données de diagnostic et
    /// la commande d'origine disparaissent, et le message d'une erreur
    /// interne est remplacé par un générique.
    pub fn for_prod(&self) -> ErrorEvent {
        let error_message = if self.error_type == Some(ErrorType::InternalError) {
            Some(UNEXPECTED_ERROR_MESSAGE.to_string())
        } else {
            self.error_message.clone()
        };
        ErrorEvent {
            error_message,
            error_type: self.error_type,
            error_data: None,
            error_env: Some(ErrorDataEnv::Production),
            originating_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorType::UserError).unwrap(),
            "\"USER_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorType::InternalError).unwrap(),
            "\"INTERNAL_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorDataEnv::Production).unwrap(),
            "\"PRODUCTION\""
        );
    }

    #[test]
    fn test_for_prod_scrubs_data() {
        let event = ErrorEvent::new(ErrorType::Failure, "disk on fire")
            .with_data("stack trace goes here")
            .with_originating_command("{\"command\": ...}");

        let scrubbed = event.for_prod();
        assert_eq!(scrubbed.error_message.as_deref(), Some("disk on fire"));
        assert_eq!(scrubbed.error_env, Some(ErrorDataEnv::Production));
        assert_eq!(scrubbed.error_data, None);
        assert_eq!(scrubbed.originating_command, None);
    }

    #[test]
    fn test_for_prod_hides_internal_error_message() {
        let event = ErrorEvent::new(ErrorType::InternalError, "index out of bounds at oracle.rs")
            .with_data("backtrace");
        let scrubbed = event.for_prod();
        assert_eq!(scrubbed.error_message.as_deref(), Some(UNEXPECTED_ERROR_MESSAGE));
        assert_eq!(scrubbed.error_data, None);
    }

    #[test]
    fn test_unset_optionals_are_omitted() {
        let song = Song {
            name: Some("intro".to_string()),
            ..Song::default()
        };
        let rendered = serde_json::to_string(&song).unwrap();
        assert_eq!(rendered, "{\"name\":\"intro\"}");
    }
}

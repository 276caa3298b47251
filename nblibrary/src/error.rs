//! Types d'erreurs pour nblibrary

use std::path::PathBuf;

/// Erreurs de la bibliothèque musicale
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Une chanson, une playlist ou un fichier référencé est introuvable.
    #[error("{0}")]
    NotFound(String),

    /// Ajout sans `overwrite` d'un alias ou d'un nom déjà présent.
    #[error("{0}")]
    AlreadyExists(String),

    /// Argument invalide (alias vide, nom de playlist vide, ...).
    #[error("{0}")]
    IllegalArgument(String),

    /// Document sérialisé invalide (version inconnue, champ manquant).
    #[error("Bad library format: {0}")]
    BadFormat(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Vrai pour les erreurs imputables à l'utilisateur, qui se corrigent
    /// en réessayant avec une entrée valide.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::AlreadyExists(_) | Error::IllegalArgument(_)
        )
    }
}

/// Type Result spécialisé pour nblibrary
pub type Result<T> = std::result::Result<T, Error>;

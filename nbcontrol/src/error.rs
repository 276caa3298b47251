//! Types d'erreurs pour nbcontrol

/// Erreurs du contrôleur de lecture
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Accès à un instantané de périphériques déjà invalidé par un
    /// `list_devices()` ultérieur.
    #[error("Invalid object - already freed.")]
    UseAfterFree,

    #[error("No audio device at index {0}")]
    NoSuchDevice(usize),

    #[error(transparent)]
    Library(#[from] nblibrary::Error),

    #[error("Player error: {0}")]
    Player(String),
}

impl Error {
    /// Vrai pour les erreurs imputables à l'utilisateur.
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::Library(e) => e.is_user_error(),
            Error::NoSuchDevice(_) => true,
            _ => false,
        }
    }
}

/// Type Result spécialisé pour nbcontrol
pub type Result<T> = std::result::Result<T, Error>;

//! Erreurs de session et de registre du muxer.

/// Longueur maximale d'une raison de fermeture websocket, en octets.
const MAX_CLOSE_REASON: usize = 125;

const TRUNC_MARKER: &str = " <trunc>";

/// Flux de contrôle d'un handler : tout autre échec est un bug du handler,
/// loggé par le muxer sans faire tomber le processus.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Le client a demandé la fermeture de la connexion. Fermeture normale.
    #[error("connection close requested")]
    CloseConnection,

    /// Le client a violé le protocole : fermeture avec `BAD_CLIENT` et la
    /// raison donnée (tronquée).
    #[error("{0}")]
    Client(String),

    /// Le pair n'est plus là, la session ne peut plus émettre.
    #[error("client session is gone, cannot send")]
    Gone,
}

/// Erreurs d'enregistrement d'un handler sur le muxer.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("input path '{0}' does not match the expected url shape")]
    InvalidPath(String),
}

/// Tronque une raison de fermeture aux limites de mots pour tenir dans les
/// 125 octets autorisés par une trame Close, en ajoutant ` <trunc>` quand
/// quelque chose a été coupé.
pub fn safe_close_message(reason: &str) -> String {
    if reason.len() < MAX_CLOSE_REASON {
        return reason.to_string();
    }

    let mut total = String::new();
    for word in reason.split_whitespace() {
        let candidate_len = if total.is_empty() {
            word.len()
        } else {
            total.len() + 1 + word.len()
        };
        if candidate_len + TRUNC_MARKER.len() > MAX_CLOSE_REASON {
            return format!("{}{}", total, TRUNC_MARKER);
        }
        if !total.is_empty() {
            total.push(' ');
        }
        total.push_str(word);
    }
    // Tout le message tient une fois les blancs normalisés.
    format!("{}{}", total, TRUNC_MARKER)
}

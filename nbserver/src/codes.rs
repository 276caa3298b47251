//! Codes de fermeture websocket du serveur.
//!
//! La RFC 6455 réserve la plage 4000-4999 aux applications ; les valeurs
//! font écho à leurs analogues HTTP.

/// Aucun handler n'est enregistré sur le chemin demandé.
pub const UNSUPPORTED_URI: u16 = 4404;

/// Le client a violé le protocole : trame binaire, ou faute signalée par
/// le handler.
pub const BAD_CLIENT: u16 = 4400;

//! # NoiseBox Configuration Module
//!
//! Ce module fournit la configuration du processus NoiseBox :
//! - Chargement depuis un fichier YAML optionnel
//! - Fusion avec la configuration par défaut embarquée
//! - Surcharge par variables d'environnement (`NOISEBOX_CONFIG__*`)
//! - Struct immuable passée explicitement à la construction des composants
//!
//! Contrairement à un singleton global, la [`Config`] est construite une
//! fois au démarrage puis passée par valeur (ou `Arc`) aux composants qui
//! en ont besoin. Les sites d'appel ne lisent jamais l'état global du
//! processus.
//!
//! ## Usage
//!
//! ```
//! use nbconfig::Config;
//!
//! let config = Config::builder().debug(true).port(9900).build();
//! assert!(config.debug);
//! assert_eq!(config.port, 9900);
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("noisebox.yaml");

const ENV_PREFIX: &str = "NOISEBOX_CONFIG__";

// Default values for configuration
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9821;
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Erreurs de chargement de configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file '{path}': {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    BadEnvValue { key: String, value: String },
}

/// Type Result spécialisé pour nbconfig
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration immuable du processus.
///
/// Construite une seule fois au démarrage via [`Config::builder`] ou
/// [`Config::load`], puis partagée en lecture seule.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Mode debug : les évènements d'erreur conservent leurs données de
    /// diagnostic au lieu d'être expurgés pour la production.
    pub debug: bool,

    /// Adresse d'écoute du serveur de commandes.
    pub host: String,

    /// Port d'écoute du serveur de commandes.
    pub port: u16,

    /// Niveau de log dédié au serveur de transport (ex: "warn").
    pub server_log_level: Option<String>,

    /// Bibliothèque à charger au démarrage, si présente.
    pub library_path: Option<PathBuf>,

    /// Répertoire des fichiers de log horodatés.
    pub log_dir: PathBuf,
}

/// Représentation partielle lue depuis un fichier YAML : tous les champs
/// sont optionnels, les absents gardent leur valeur par défaut.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    debug: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    server_log_level: Option<String>,
    library_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        // Le YAML embarqué est la source des valeurs par défaut. Il est
        // compilé dans le binaire, son parsing ne peut pas échouer au runtime
        // sans qu'un test unitaire ne l'ait déjà détecté.
        let base: FileConfig = serde_yaml::from_str(DEFAULT_CONFIG).unwrap_or_default();
        Config {
            debug: base.debug.unwrap_or(false),
            host: base.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: base.port.unwrap_or(DEFAULT_PORT),
            server_log_level: base.server_log_level,
            library_path: base.library_path,
            log_dir: base.log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        }
    }
}

impl Config {
    /// Crée un builder initialisé avec les valeurs par défaut embarquées.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Charge la configuration complète : défauts embarqués, puis fichier
    /// utilisateur (s'il existe), puis variables d'environnement.
    ///
    /// # Arguments
    ///
    /// * `path` - Fichier YAML utilisateur optionnel
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.merge_file(path)?;
        }
        builder = builder.merge_env()?;
        Ok(builder.build())
    }
}

/// Builder de [`Config`] : fusionne défauts, fichier, environnement et flags.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn server_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.server_log_level = Some(level.into());
        self
    }

    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_path = Some(path.into());
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// Fusionne un fichier YAML utilisateur. Les champs absents du fichier
    /// conservent leur valeur courante.
    pub fn merge_file(mut self, path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = serde_yaml::from_str(&raw).map_err(|source| Error::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        self.config = merge(self.config, file);
        Ok(self)
    }

    /// Applique les surcharges d'environnement `NOISEBOX_CONFIG__<CHAMP>`.
    ///
    /// Ex: `NOISEBOX_CONFIG__PORT=9900` remplace le port d'écoute.
    pub fn merge_env(mut self) -> Result<Self> {
        for (key, value) in env::vars() {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field.to_ascii_lowercase().as_str() {
                "debug" => {
                    self.config.debug = parse_bool(&key, &value)?;
                }
                "host" => self.config.host = value,
                "port" => {
                    self.config.port = value
                        .parse()
                        .map_err(|_| Error::BadEnvValue { key, value })?;
                }
                "server_log_level" => self.config.server_log_level = Some(value),
                "library_path" => self.config.library_path = Some(PathBuf::from(value)),
                "log_dir" => self.config.log_dir = PathBuf::from(value),
                _ => {
                    tracing::warn!("Ignoring unknown config override '{}'", key);
                }
            }
        }
        Ok(self)
    }

    pub fn build(self) -> Config {
        self.config
    }
}

fn merge(base: Config, file: FileConfig) -> Config {
    Config {
        debug: file.debug.unwrap_or(base.debug),
        host: file.host.unwrap_or(base.host),
        port: file.port.unwrap_or(base.port),
        server_log_level: file.server_log_level.or(base.server_log_level),
        library_path: file.library_path.or(base.library_path),
        log_dir: file.log_dir.unwrap_or(base.log_dir),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::BadEnvValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

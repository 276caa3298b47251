//! Assemblage du processus hôte `mediaplayer` : bibliothèque, contrôleur,
//! serveur de commandes websocket et console locale.

use crate::commands;
use crate::console::Console;
use anyhow::Context;
use nbconfig::Config;
use nbcontrol::{Controller, NullPlayer};
use nblibrary::MediaLibrary;
use nbprotocol::SERVING_PATH;
use nbserver::{MediaServer, WebsocketMuxer};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Lance le lecteur : serveur de commandes + console locale, jusqu'à
/// Ctrl+C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    // ========== Phase 1 : bibliothèque et contrôleur ==========
    let mut library = MediaLibrary::new();
    if let Some(path) = &config.library_path {
        if path.is_file() {
            library = MediaLibrary::load(path)
                .with_context(|| format!("loading library from '{}'", path.display()))?;
            info!("📚 Loaded {} songs from '{}'", library.list_songs().len(), path.display());
        }
    }

    let mut controller = Controller::new(Box::new(NullPlayer::new()), library);
    let track_end_rx = controller
        .take_track_end_receiver()
        .context("track-end receiver already taken")?;
    let controller = Arc::new(Mutex::new(controller));

    // La boîte aux lettres fin-de-morceau : seul point d'entrée du thread
    // audio vers l'arbre d'oracles.
    {
        let controller = controller.clone();
        std::thread::Builder::new()
            .name("track-end".to_string())
            .spawn(move || {
                for () in track_end_rx.iter() {
                    match controller.lock() {
                        Ok(mut controller) => {
                            if let Err(e) = controller.next_track() {
                                warn!("Track advance failed: {}", e);
                            }
                        }
                        Err(_) => {
                            error!("Controller mutex poisoned, stopping the track-end loop");
                            return;
                        }
                    }
                }
            })
            .context("spawning the track-end thread")?;
    }

    // ========== Phase 2 : console locale ==========
    {
        let controller = controller.clone();
        std::thread::Builder::new()
            .name("local-console".to_string())
            .spawn(move || {
                let console = Console::start();
                commands::run_loop(&console, &controller);
            })
            .context("spawning the console thread")?;
    }

    // ========== Phase 3 : serveur de commandes ==========
    let mut muxer = WebsocketMuxer::new();
    let media_server = MediaServer::new(controller.clone(), config.clone());
    muxer
        .register(SERVING_PATH, Arc::new(media_server))
        .context("registering the media server")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("🚀 NoiseBox command server listening on ws://{}{}", addr, SERVING_PATH);

    let router = muxer.into_router();
    let server_task = tokio::spawn(async move { axum::serve(listener, router).await });
    tokio::select! {
        result = server_task => {
            result.context("command server task panicked")?
                .context("command server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }
    Ok(())
}

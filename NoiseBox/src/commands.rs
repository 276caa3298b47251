//! Commandes de la console locale.
//!
//! Chaque commande est une entrée de registre : un nom, une ligne d'usage,
//! une aide et un handler. Les erreurs utilisateur s'affichent et la
//! boucle continue ; tout le reste part dans les logs.

use crate::console::{Console, ConsoleInput};
use nbcontrol::Controller;
use nblibrary::{MediaLibrary, Song};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Control(#[from] nbcontrol::Error),

    #[error(transparent)]
    Library(#[from] nblibrary::Error),

    #[error("controller state poisoned by an earlier panic")]
    Poisoned,
}

impl CommandError {
    fn is_user_error(&self) -> bool {
        match self {
            CommandError::Usage(_) => true,
            CommandError::Control(e) => e.is_user_error(),
            CommandError::Library(e) => e.is_user_error(),
            CommandError::Poisoned => false,
        }
    }
}

type Handler = fn(&[String], &Arc<Mutex<Controller>>) -> Result<(), CommandError>;

/// Une commande de console enregistrée.
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    handler: Handler,
}

fn lock(controller: &Arc<Mutex<Controller>>) -> Result<MutexGuard<'_, Controller>, CommandError> {
    controller.lock().map_err(|_| CommandError::Poisoned)
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, CommandError> {
    args.get(index)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            CommandError::Usage(format!("Expected required argument {}, but got: \"\"", name))
        })
}

/// Toutes les commandes disponibles, dans l'ordre d'affichage de l'aide.
pub fn registry() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "addsong",
            usage: "addsong <alias> <path> [description]",
            help: "Adds a new song to the library",
            handler: |args, controller| {
                let alias = required(args, 0, "song_alias")?;
                let path = required(args, 1, "song_path")?;
                let description = args.get(2).cloned().unwrap_or_default();
                let song = Song::new(alias, path, description)?;
                lock(controller)?.library_mut().add_song(song, false)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "describesong",
            usage: "describesong <alias>",
            help: "Show everything the library knows about a song",
            handler: |args, controller| {
                let alias = required(args, 0, "song_alias")?;
                let song = lock(controller)?.library().get_song(alias)?;
                println!("{}", song);
                Ok(())
            },
        },
        CommandSpec {
            name: "listsongs",
            usage: "listsongs",
            help: "Lists all songs in the library",
            handler: |_args, controller| {
                for song in lock(controller)?.library().list_songs() {
                    println!("  {}: {}", song.alias(), song.uri());
                }
                Ok(())
            },
        },
        CommandSpec {
            name: "listplaylists",
            usage: "listplaylists",
            help: "Lists all playlists in the library",
            handler: |_args, controller| {
                for (name, songs) in lock(controller)?.library().list_playlists() {
                    println!("  {}: {:?}", name, songs);
                }
                Ok(())
            },
        },
        CommandSpec {
            name: "createplaylist",
            usage: "createplaylist <name>",
            help: "Create a new playlist to start adding songs",
            handler: |args, controller| {
                let name = required(args, 0, "playlist_name")?;
                lock(controller)?.library_mut().create_playlist(name, false)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "addsongtoplaylist",
            usage: "addsongtoplaylist <playlist> <alias>",
            help: "Add a song to a playlist",
            handler: |args, controller| {
                let playlist = required(args, 0, "playlist_name")?;
                let alias = required(args, 1, "song_alias")?;
                lock(controller)?
                    .library_mut()
                    .add_song_to_playlist(alias, playlist)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "play",
            usage: "play <alias-or-playlist>",
            help: "Drop the current queue and play this now",
            handler: |args, controller| {
                let name = required(args, 0, "name")?;
                lock(controller)?.play(name)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "queue",
            usage: "queue <alias-or-playlist>",
            help: "Tack songs onto the end of the queue",
            handler: |args, controller| {
                let name = required(args, 0, "name")?;
                lock(controller)?.queue(name)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "queuerepeat",
            usage: "queuerepeat <alias-or-playlist> [times]",
            help: "Queue songs on repeat; no count means forever",
            handler: |args, controller| {
                let name = required(args, 0, "name")?;
                let times = match args.get(1) {
                    None => None,
                    Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                        CommandError::Usage(format!("Expected a repeat count, got '{}'", raw))
                    })?),
                };
                lock(controller)?.queue_repeat(name, times)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "interrupt",
            usage: "interrupt <alias-or-playlist>",
            help: "Play this right now, then give the queue back",
            handler: |args, controller| {
                let name = required(args, 0, "name")?;
                lock(controller)?.interrupt_with(name)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "pause",
            usage: "pause",
            help: "Toggle playback pause",
            handler: |_args, controller| {
                lock(controller)?.toggle_pause();
                Ok(())
            },
        },
        CommandSpec {
            name: "stop",
            usage: "stop",
            help: "Stop playback",
            handler: |_args, controller| {
                lock(controller)?.stop();
                Ok(())
            },
        },
        CommandSpec {
            name: "next",
            usage: "next",
            help: "Skip to the next song in the queue",
            handler: |_args, controller| {
                match lock(controller)?.next_track()? {
                    Some(uri) => println!("Now playing: {}", uri),
                    None => println!("Nothing left to play."),
                }
                Ok(())
            },
        },
        CommandSpec {
            name: "devices",
            usage: "devices",
            help: "List audio output devices",
            handler: |_args, controller| {
                print!("{}", lock(controller)?.list_devices());
                Ok(())
            },
        },
        CommandSpec {
            name: "setdevice",
            usage: "setdevice <index>",
            help: "Select the audio output device by index",
            handler: |args, controller| {
                let raw = required(args, 0, "device_index")?;
                let index = raw.parse::<usize>().map_err(|_| {
                    CommandError::Usage(format!("Expected a device index, got '{}'", raw))
                })?;
                lock(controller)?.set_device(index)?;
                Ok(())
            },
        },
        CommandSpec {
            name: "getdevice",
            usage: "getdevice",
            help: "Show the selected audio output device",
            handler: |_args, controller| {
                match lock(controller)?.get_device() {
                    Some(device) => println!("{}", device),
                    None => println!("No device selected; using the default output."),
                }
                Ok(())
            },
        },
        CommandSpec {
            name: "savelibrary",
            usage: "savelibrary <path>",
            help: "Write the library to a JSON document",
            handler: |args, controller| {
                let path = required(args, 0, "path")?;
                lock(controller)?.library().save(Path::new(path))?;
                Ok(())
            },
        },
        CommandSpec {
            name: "loadlibrary",
            usage: "loadlibrary <path>",
            help: "Replace the library with a saved JSON document",
            handler: |args, controller| {
                let path = required(args, 0, "path")?;
                let library = MediaLibrary::load(Path::new(path))?;
                *lock(controller)?.library_mut() = library;
                Ok(())
            },
        },
    ]
}

/// Boucle de consommation de la console : une commande à la fois, jusqu'à
/// `exit` ou la fin du flux d'entrée.
pub fn run_loop(console: &Console, controller: &Arc<Mutex<Controller>>) {
    let commands = registry();
    for input in console.commands() {
        process(&commands, &input, controller);
    }
    println!("Exiting now...");
}

fn process(commands: &[CommandSpec], input: &ConsoleInput, controller: &Arc<Mutex<Controller>>) {
    match input.command.as_str() {
        "help" => {
            match input.arguments.first() {
                None => {
                    for spec in commands {
                        println!("  {:<22} {}", spec.name, spec.help);
                    }
                }
                Some(name) => match commands.iter().find(|spec| spec.name == name) {
                    Some(spec) => println!("{}\n  usage: {}", spec.help, spec.usage),
                    None => println!("Cannot find command '{}'.", name),
                },
            }
            return;
        }
        "commands" => {
            let names: Vec<&str> = commands.iter().map(|spec| spec.name).collect();
            println!("Available commands: [\n  {}\n]", names.join("\n  "));
            return;
        }
        _ => {}
    }

    let Some(spec) = commands.iter().find(|spec| spec.name == input.command) else {
        println!(
            "Command not found: '{}' - discarding args '{:?}'",
            input.command, input.arguments
        );
        return;
    };
    match (spec.handler)(&input.arguments, controller) {
        Ok(()) => {}
        Err(e) if e.is_user_error() => println!("{}", e),
        Err(e) => error!("Command '{}' failed: {}", input.command, e),
    }
}

//! Console interactive locale.
//!
//! Un peu plus touffu qu'attendu : l'utilisateur s'attend à une
//! interprétation non bloquante de ses commandes, et les conditions de
//! course arrivent vite dès qu'on mélange stdin et threads. Le lecteur
//! tourne donc sur son propre thread et ne fait que poster des
//! [`ConsoleInput`] dans un canal ; le consommateur itère dessus à son
//! rythme.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Une ligne de commande parsée : le mot-clé et ses arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInput {
    pub command: String,
    pub arguments: Vec<String>,
}

/// La console : lit des lignes sur son thread, produit des commandes.
pub struct Console {
    rx: Receiver<ConsoleInput>,
}

impl Console {
    /// Démarre la console sur stdin/stdout.
    pub fn start() -> Console {
        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name("console-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                let mut lines = stdin.lock();
                reader_loop(&mut lines, &tx, true);
            })
            .expect("spawning the console reader thread cannot fail at startup");
        Console { rx }
    }

    /// Démarre la console sur un lecteur arbitraire. Pour les tests.
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Console {
        let (tx, rx) = unbounded();
        thread::spawn(move || {
            let mut reader = reader;
            reader_loop(&mut reader, &tx, false);
        });
        Console { rx }
    }

    /// Itère sur les commandes, en bloquant. S'arrête sur `exit` ou à la
    /// fermeture du flux d'entrée.
    pub fn commands(&self) -> impl Iterator<Item = ConsoleInput> + '_ {
        self.rx.iter().take_while(|input| input.command != "exit")
    }

    /// Attend la prochaine commande avec un timeout. Pour les harnais de
    /// test : `None` signifie « rien pour l'instant ».
    pub fn poll(&self, timeout: Duration) -> Option<ConsoleInput> {
        match self.rx.recv_timeout(timeout) {
            Ok(input) => Some(input),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn reader_loop(reader: &mut impl BufRead, tx: &Sender<ConsoleInput>, prompt: bool) {
    loop {
        if prompt {
            print!(">>> ");
            let _ = std::io::stdout().flush();
        }
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => {
                // EOF : on ferme proprement la boucle de consommation.
                let _ = tx.send(ConsoleInput {
                    command: "exit".to_string(),
                    arguments: Vec::new(),
                });
                return;
            }
            Ok(_) => {}
        }

        let words = split_line(&line);
        let Some((command, arguments)) = words.split_first() else {
            // L'utilisateur n'a rien tapé de significatif.
            continue;
        };
        let input = ConsoleInput {
            command: command.clone(),
            arguments: arguments.to_vec(),
        };
        debug!("console input: {:?}", input);
        if tx.send(input).is_err() {
            return;
        }
    }
}

/// Découpe une ligne en mots, les guillemets simples et doubles groupant
/// les espaces. Pas d'échappement : une contrainte acceptable pour une
/// console locale.
pub fn split_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

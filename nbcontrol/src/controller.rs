//! Le contrôleur : état de lecture longue durée au-dessus du moteur audio.
//!
//! Au-delà des passe-plats lecture/pause, le contrôleur maintient la
//! hiérarchie d'oracles qui décide de ce qui se joue dans les dizaines de
//! minutes à venir. Au sommet, l'oracle d'interruption garantit que ce que
//! l'utilisateur veut entendre *tout de suite* passe devant tout. En
//! dessous, le switch porte la chaîne courante et permet de la remplacer
//! atomiquement sur un `play`. La chaîne, enfin, aligne les playlists et
//! répétitions en file d'attente.
//!
//! À chaque fin de morceau : d'abord l'interruption si elle a encore
//! quelque chose, sinon la suite de la file, sinon le silence.

use crate::error::{Error, Result};
use crate::player::{AudioDevice, Player};
use crossbeam_channel::{unbounded, Receiver};
use nblibrary::MediaLibrary;
use nboracle::{ChainOracle, InterruptOracle, Oracle, SwitchOracle};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Instantané indexé des sorties audio.
///
/// L'utilisateur dit « joue sur le périphérique 3 » plutôt que d'épeler un
/// identifiant système. L'index n'est un handle stable que jusqu'au
/// prochain `list_devices()`, qui libère l'instantané précédent : tout
/// accès ultérieur échoue avec [`Error::UseAfterFree`].
#[derive(Debug)]
pub struct AudioDevices {
    devices: Vec<AudioDevice>,
    valid: AtomicBool,
}

impl AudioDevices {
    fn new(devices: Vec<AudioDevice>) -> Self {
        AudioDevices {
            devices,
            valid: AtomicBool::new(true),
        }
    }

    pub fn valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Invalide l'instantané. Idempotent.
    pub fn free(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Le périphérique à l'index donné.
    pub fn device_for_index(&self, index: usize) -> Result<AudioDevice> {
        if !self.valid() {
            return Err(Error::UseAfterFree);
        }
        self.devices
            .get(index)
            .cloned()
            .ok_or(Error::NoSuchDevice(index))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl fmt::Display for AudioDevices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid() {
            return write!(f, "Invalid object - already freed.");
        }
        for (index, device) in self.devices.iter().enumerate() {
            writeln!(f, "\t{}: {}", index, device)?;
        }
        Ok(())
    }
}

/// Le contrôleur de lecture.
pub struct Controller {
    library: MediaLibrary,
    player: Box<dyn Player>,
    root: InterruptOracle,
    devices: Arc<AudioDevices>,
    selected_device: Option<AudioDevice>,
    track_end_rx: Option<Receiver<()>>,
}

impl Controller {
    /// Assemble le contrôleur : topologie d'oracles fixe, callback fin de
    /// morceau branché sur la boîte aux lettres, premier kick du player.
    pub fn new(mut player: Box<dyn Player>, library: MediaLibrary) -> Self {
        let mut switch = SwitchOracle::new();
        switch.set_child(Oracle::chain());
        let root = InterruptOracle::new(Oracle::Switch(switch));

        let (tx, rx) = unbounded::<()>();
        player.next_track_callback(Box::new(move || {
            // Thread audio : on poste, on ne mute rien.
            let _ = tx.send(());
        }));

        let devices = Arc::new(AudioDevices::new(player.list_devices()));

        let mut controller = Controller {
            library,
            player,
            root,
            devices,
            selected_device: None,
            track_end_rx: Some(rx),
        };
        // Kick initial, comme un play_oracle sur un arbre vide : ne joue
        // rien mais met l'arbre dans son état de départ.
        if let Err(e) = controller.next_track() {
            debug!("Initial kick failed: {}", e);
        }
        controller
    }

    /// La boîte aux lettres fin-de-morceau. À consommer depuis un thread
    /// dédié AVANT de partager le contrôleur derrière son mutex, sous
    /// peine d'interblocage.
    pub fn take_track_end_receiver(&mut self) -> Option<Receiver<()>> {
        self.track_end_rx.take()
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut MediaLibrary {
        &mut self.library
    }

    fn switch_mut(&mut self) -> &mut SwitchOracle {
        match self.root.default_mut() {
            Oracle::Switch(switch) => switch,
            _ => unreachable!("controller topology is fixed: Interrupt -> Switch -> Chain"),
        }
    }

    fn chain_mut(&mut self) -> &mut ChainOracle {
        match self.switch_mut().child_mut() {
            Some(Oracle::Chain(chain)) => chain,
            _ => unreachable!("controller topology is fixed: Interrupt -> Switch -> Chain"),
        }
    }

    /// Remplace toute la file par le contenu de `name` et lance la
    /// lecture. L'interruption en cours, s'il y en a une, est abandonnée.
    pub fn play(&mut self, name: &str) -> Result<Option<String>> {
        let songs = self.library.resolve(name)?;
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs));
        self.switch_mut().set_child(Oracle::Chain(chain));
        self.root.clear_interrupt();
        self.next_track()
    }

    /// Ajoute le contenu de `name` en fin de file.
    pub fn queue(&mut self, name: &str) -> Result<()> {
        let songs = self.library.resolve(name)?;
        self.chain_mut().add(Oracle::playlist(songs));
        Ok(())
    }

    /// Ajoute le contenu de `name` en fin de file, répété `times` fois
    /// (`None` = indéfiniment, `Some(0)` = rien du tout).
    pub fn queue_repeat(&mut self, name: &str, times: Option<u32>) -> Result<()> {
        let songs = self.library.resolve(name)?;
        self.chain_mut().add(Oracle::repeating(songs, times));
        Ok(())
    }

    /// Joue le contenu de `name` immédiatement ; la file reprendra là où
    /// elle en était une fois l'interruption épuisée.
    pub fn interrupt_with(&mut self, name: &str) -> Result<Option<String>> {
        let songs = self.library.resolve(name)?;
        self.root.interrupt(Oracle::playlist(songs));
        self.next_track()
    }

    /// Arrête la lecture en cours et passe au morceau suivant de l'arbre.
    ///
    /// Retourne l'URI jouée, ou `None` (et le player reste arrêté) si
    /// l'arbre est épuisé. C'est aussi le chemin emprunté à chaque fin de
    /// morceau signalée par la boîte aux lettres.
    pub fn next_track(&mut self) -> Result<Option<String>> {
        self.player.stop();
        match self.root.advance() {
            Some(uri) => {
                self.player.play(&uri)?;
                Ok(Some(uri))
            }
            None => {
                debug!("Oracle tree exhausted, playback stops");
                Ok(None)
            }
        }
    }

    /// L'URI sur laquelle l'arbre est positionné, sans le faire avancer.
    pub fn current_uri(&mut self) -> Option<String> {
        self.root.current()
    }

    /// Bascule lecture/pause.
    pub fn toggle_pause(&mut self) {
        let playing = self.player.playing();
        self.player.set_pause(playing);
    }

    pub fn set_pause(&mut self, paused: bool) {
        self.player.set_pause(paused);
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn playing(&self) -> bool {
        self.player.playing()
    }

    /// Rafraîchit et retourne l'instantané des sorties audio.
    ///
    /// L'instantané précédemment retourné est libéré : ses index ne sont
    /// plus des handles valides.
    pub fn list_devices(&mut self) -> Arc<AudioDevices> {
        self.devices.free();
        self.devices = Arc::new(AudioDevices::new(self.player.list_devices()));
        info!("Refreshed audio device snapshot ({} devices)", self.devices.len());
        Arc::clone(&self.devices)
    }

    /// Sélectionne la sortie audio par index dans l'instantané courant.
    pub fn set_device(&mut self, index: usize) -> Result<()> {
        let device = self.devices.device_for_index(index)?;
        self.player.set_device(&device.id)?;
        self.selected_device = Some(device);
        Ok(())
    }

    /// La sortie audio sélectionnée, si l'utilisateur en a choisi une.
    pub fn get_device(&self) -> Option<&AudioDevice> {
        self.selected_device.as_ref()
    }
}

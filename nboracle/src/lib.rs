//! # nboracle - Moteur de planification de NoiseBox
//!
//! Un « oracle » est un nœud de l'arbre de planification qui répond à deux
//! questions : quel morceau joue maintenant ([`Oracle::current`]) et quel
//! morceau vient ensuite ([`Oracle::advance`]). Les six variantes se
//! composent librement :
//!
//! - [`Oracle::Null`] : ne produit jamais rien
//! - `Playlist` : séquence finie, un morceau par `advance`
//! - `Repeating` : séquence répétée n fois, ou indéfiniment
//! - `Chain` : liste d'oracles enfants consommés dans l'ordre, append-only
//! - `Switch` : un seul enfant, remplaçable à tout moment
//! - `Interrupt` : un enfant « défaut » et un enfant « interruption »
//!   prioritaire tant qu'il n'est pas épuisé
//!
//! Le contrat de mémoïsation est serré et vérifié par les tests de ce
//! module : `current()` est stable entre deux appels et égal à la dernière
//! valeur rendue par `advance()` ; un `current()` qui a répondu « rien »
//! continue de répondre « rien » après mutation de l'arbre, jusqu'au
//! prochain `advance()`.
//!
//! Les oracles n'échouent jamais : l'épuisement se traduit par `None`.
//!
//! # Exemples
//!
//! ```
//! use nboracle::Oracle;
//!
//! let mut chain = Oracle::chain();
//! if let Oracle::Chain(c) = &mut chain {
//!     c.add(Oracle::playlist(vec!["a.flac".into(), "b.flac".into()]));
//! }
//! assert_eq!(chain.current().as_deref(), Some("a.flac"));
//! assert_eq!(chain.advance().as_deref(), Some("b.flac"));
//! assert_eq!(chain.advance(), None);
//! ```

/// Nœud de l'arbre de planification.
///
/// L'ensemble des variantes est clos : chaque opération est un `match`
/// exhaustif, une variante oubliée est une erreur de compilation.
#[derive(Debug)]
pub enum Oracle {
    /// Ne produit jamais rien.
    Null,
    Playlist(PlaylistOracle),
    Repeating(RepeatingOracle),
    Chain(ChainOracle),
    Switch(SwitchOracle),
    Interrupt(InterruptOracle),
}

impl Oracle {
    /// Oracle vide permanent.
    pub fn null() -> Self {
        Oracle::Null
    }

    /// Séquence finie d'URIs.
    pub fn playlist(songs: Vec<String>) -> Self {
        Oracle::Playlist(PlaylistOracle::new(songs))
    }

    /// Séquence répétée `times` fois (`None` = indéfiniment).
    pub fn repeating(songs: Vec<String>, times: Option<u32>) -> Self {
        Oracle::Repeating(RepeatingOracle::new(songs, times))
    }

    /// Chaîne vide, à remplir via [`ChainOracle::add`].
    pub fn chain() -> Self {
        Oracle::Chain(ChainOracle::new())
    }

    /// Switch sans enfant.
    pub fn switch() -> Self {
        Oracle::Switch(SwitchOracle::new())
    }

    /// Nœud d'interruption avec son oracle par défaut.
    pub fn interrupt(default: Oracle) -> Self {
        Oracle::Interrupt(InterruptOracle::new(default))
    }

    /// Le morceau en cours, ou `None`.
    pub fn current(&mut self) -> Option<String> {
        match self {
            Oracle::Null => None,
            Oracle::Playlist(oracle) => oracle.current(),
            Oracle::Repeating(oracle) => oracle.current(),
            Oracle::Chain(oracle) => oracle.current(),
            Oracle::Switch(oracle) => oracle.current(),
            Oracle::Interrupt(oracle) => oracle.current(),
        }
    }

    /// Passe au morceau suivant et le retourne, ou `None` si épuisé.
    pub fn advance(&mut self) -> Option<String> {
        match self {
            Oracle::Null => None,
            Oracle::Playlist(oracle) => oracle.advance(),
            Oracle::Repeating(oracle) => oracle.advance(),
            Oracle::Chain(oracle) => oracle.advance(),
            Oracle::Switch(oracle) => oracle.advance(),
            Oracle::Interrupt(oracle) => oracle.advance(),
        }
    }
}

/// Séquence finie : un morceau par `advance`, puis plus rien.
#[derive(Debug, Clone)]
pub struct PlaylistOracle {
    songs: Vec<String>,
    pos: usize,
}

impl PlaylistOracle {
    pub fn new(songs: Vec<String>) -> Self {
        PlaylistOracle { songs, pos: 0 }
    }

    pub fn current(&mut self) -> Option<String> {
        self.songs.get(self.pos).cloned()
    }

    pub fn advance(&mut self) -> Option<String> {
        if self.pos < self.songs.len() {
            self.pos += 1;
        }
        self.songs.get(self.pos).cloned()
    }
}

/// Séquence répétée un nombre fini ou infini de fois.
///
/// `times = Some(0)` et la séquence vide produisent un oracle
/// définitivement vide.
#[derive(Debug, Clone)]
pub struct RepeatingOracle {
    songs: Vec<String>,
    // Nombre de tours COMPLETS restant après le tour en cours.
    remaining: Option<u32>,
    pos: usize,
    exhausted: bool,
}

impl RepeatingOracle {
    pub fn new(songs: Vec<String>, times: Option<u32>) -> Self {
        let exhausted = songs.is_empty() || times == Some(0);
        RepeatingOracle {
            songs,
            remaining: times.map(|t| t.saturating_sub(1)),
            pos: 0,
            exhausted,
        }
    }

    pub fn current(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        self.songs.get(self.pos).cloned()
    }

    pub fn advance(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        self.pos += 1;
        if self.pos >= self.songs.len() {
            match self.remaining {
                None => self.pos = 0,
                Some(0) => {
                    self.exhausted = true;
                    return None;
                }
                Some(left) => {
                    self.remaining = Some(left - 1);
                    self.pos = 0;
                }
            }
        }
        self.songs.get(self.pos).cloned()
    }
}

/// Composition append-only d'oracles, consommés dans l'ordre.
///
/// Quand un enfant ne produit plus rien, la chaîne passe au suivant. Les
/// enfants ajoutés après épuisement sont lus au prochain `advance`.
#[derive(Debug)]
pub struct ChainOracle {
    children: Vec<Oracle>,
    ptr: usize,
    current_item: Option<String>,
    has_current: bool,
    // Vrai si le premier morceau de l'enfant pointé a déjà été consommé
    // via son current().
    drawn: bool,
}

impl Default for ChainOracle {
    fn default() -> Self {
        ChainOracle::new()
    }
}

impl ChainOracle {
    pub fn new() -> Self {
        ChainOracle {
            children: Vec::new(),
            ptr: 0,
            current_item: None,
            has_current: false,
            drawn: false,
        }
    }

    /// Ajoute un oracle en fin de chaîne. Append-only : aucun retrait.
    pub fn add(&mut self, oracle: Oracle) {
        self.children.push(oracle);
    }

    /// Vide la chaîne. Le morceau mémoïsé, lui, reste en place jusqu'au
    /// prochain `advance`.
    pub fn clear(&mut self) {
        self.children.clear();
        self.ptr = 0;
        self.drawn = false;
    }

    pub fn current(&mut self) -> Option<String> {
        if self.has_current {
            return self.current_item.clone();
        }
        self.scan_current()
    }

    pub fn advance(&mut self) -> Option<String> {
        if !self.has_current {
            // Un advance direct consomme d'abord le morceau courant, d'où le
            // saut apparent au deuxième morceau du premier enfant non vide.
            self.scan_current();
        }
        loop {
            match self.children.get_mut(self.ptr) {
                None => {
                    self.has_current = true;
                    self.current_item = None;
                    return None;
                }
                Some(child) => {
                    let item = if self.drawn {
                        child.advance()
                    } else {
                        self.drawn = true;
                        child.current()
                    };
                    match item {
                        Some(item) => {
                            self.has_current = true;
                            self.current_item = Some(item.clone());
                            return Some(item);
                        }
                        None => {
                            self.ptr += 1;
                            self.drawn = false;
                        }
                    }
                }
            }
        }
    }

    /// Matérialise le morceau courant en balayant les enfants depuis `ptr`.
    fn scan_current(&mut self) -> Option<String> {
        loop {
            match self.children.get_mut(self.ptr) {
                Some(child) => match child.current() {
                    Some(item) => {
                        self.has_current = true;
                        self.current_item = Some(item.clone());
                        self.drawn = true;
                        return Some(item);
                    }
                    None => self.ptr += 1,
                },
                None => {
                    self.has_current = true;
                    self.current_item = None;
                    if self.children.is_empty() {
                        // Sentinelle : les enfants ajoutés après coup ne
                        // seront lus qu'au prochain advance explicite.
                        self.children.push(Oracle::playlist(Vec::new()));
                    }
                    return None;
                }
            }
        }
    }
}

/// Indirection à un seul emplacement : l'enfant est remplaçable à tout
/// moment, le remplacement repart de son premier morceau.
#[derive(Debug)]
pub struct SwitchOracle {
    child: Option<Box<Oracle>>,
    drew_from_child: bool,
    // Armé à la construction, désarmé à la première observation d'un
    // enfant : le tout premier advance d'un switch jamais observé saute au
    // deuxième morceau de l'enfant.
    ignore_first_song: bool,
}

impl Default for SwitchOracle {
    fn default() -> Self {
        SwitchOracle::new()
    }
}

impl SwitchOracle {
    pub fn new() -> Self {
        SwitchOracle {
            child: None,
            drew_from_child: false,
            ignore_first_song: true,
        }
    }

    /// Remplace l'enfant courant. Le prochain `advance` repartira du
    /// premier morceau du remplaçant.
    pub fn set_child(&mut self, child: Oracle) {
        self.child = Some(Box::new(child));
        self.drew_from_child = false;
    }

    pub fn child_mut(&mut self) -> Option<&mut Oracle> {
        self.child.as_deref_mut()
    }

    pub fn current(&mut self) -> Option<String> {
        match &mut self.child {
            None => None,
            Some(child) => {
                let item = child.current();
                self.drew_from_child = true;
                self.ignore_first_song = false;
                item
            }
        }
    }

    pub fn advance(&mut self) -> Option<String> {
        match &mut self.child {
            None => None,
            Some(child) => {
                if self.drew_from_child {
                    child.advance()
                } else if self.ignore_first_song {
                    self.ignore_first_song = false;
                    self.drew_from_child = true;
                    let _ = child.current();
                    child.advance()
                } else {
                    self.drew_from_child = true;
                    child.current()
                }
            }
        }
    }
}

/// Nœud à deux emplacements : l'interruption passe avant le défaut tant
/// qu'elle produit quelque chose, puis est abandonnée silencieusement.
#[derive(Debug)]
pub struct InterruptOracle {
    default: Box<Oracle>,
    interrupt: Option<Box<Oracle>>,
    grabbed_first: bool,
}

impl InterruptOracle {
    pub fn new(default: Oracle) -> Self {
        InterruptOracle {
            default: Box::new(default),
            interrupt: None,
            grabbed_first: false,
        }
    }

    /// Installe (ou remplace) l'oracle d'interruption.
    pub fn interrupt(&mut self, oracle: Oracle) {
        self.interrupt = Some(Box::new(oracle));
        self.grabbed_first = false;
    }

    /// Abandonne l'interruption en cours, s'il y en a une.
    pub fn clear_interrupt(&mut self) {
        self.interrupt = None;
    }

    pub fn default_mut(&mut self) -> &mut Oracle {
        &mut self.default
    }

    pub fn current(&mut self) -> Option<String> {
        if let Some(interrupt) = &mut self.interrupt {
            if let Some(item) = interrupt.current() {
                self.grabbed_first = true;
                return Some(item);
            }
        }
        self.default.current()
    }

    pub fn advance(&mut self) -> Option<String> {
        if let Some(interrupt) = &mut self.interrupt {
            let item = if self.grabbed_first {
                interrupt.advance()
            } else {
                self.grabbed_first = true;
                interrupt.current()
            };
            if item.is_some() {
                return item;
            }
            // L'interruption n'a plus rien à offrir, on la laisse partir.
            self.interrupt = None;
        }
        self.default.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn songs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Consomme l'oracle : current() puis advance() jusqu'à `cap` éléments.
    fn collect(oracle: &mut Oracle, cap: usize) -> Vec<String> {
        let mut items = Vec::new();
        if let Some(first) = oracle.current() {
            items.push(first);
        }
        while items.len() < cap {
            match oracle.advance() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    #[test]
    fn test_null_yields_nothing() {
        let mut oracle = Oracle::null();
        assert_eq!(oracle.current(), None);
        assert_eq!(oracle.advance(), None);
    }

    #[test]
    fn test_playlist_yields_sequence_exactly() {
        let seq = songs(&["a", "b", "c"]);
        let mut oracle = Oracle::playlist(seq.clone());
        assert_eq!(collect(&mut oracle, 100), seq);
        // Une fois épuisé, advance reste à rien pour toujours.
        assert_eq!(oracle.advance(), None);
        assert_eq!(oracle.advance(), None);
        assert_eq!(oracle.current(), None);
    }

    #[test]
    fn test_playlist_empty() {
        let mut oracle = Oracle::playlist(Vec::new());
        assert_eq!(oracle.current(), None);
        assert_eq!(oracle.advance(), None);
    }

    #[test]
    fn test_playlist_current_is_stable() {
        let mut oracle = Oracle::playlist(songs(&["a", "b"]));
        assert_eq!(oracle.current().as_deref(), Some("a"));
        assert_eq!(oracle.current().as_deref(), Some("a"));
        assert_eq!(oracle.advance().as_deref(), Some("b"));
        assert_eq!(oracle.current().as_deref(), Some("b"));
    }

    #[test]
    fn test_repeating_finite() {
        let mut oracle = Oracle::repeating(songs(&["a", "b"]), Some(3));
        assert_eq!(collect(&mut oracle, 100), songs(&["a", "b", "a", "b", "a", "b"]));
        assert_eq!(oracle.advance(), None);
    }

    #[test]
    fn test_repeating_forever_caps_at_collection_limit() {
        let mut oracle = Oracle::repeating(songs(&["a", "b"]), None);
        let items = collect(&mut oracle, 100);
        assert_eq!(items.len(), 100);
        assert_eq!(items[0], "a");
        assert_eq!(items[99], "b");
        assert!(oracle.advance().is_some());
    }

    #[test]
    fn test_repeating_zero_times_is_empty() {
        let mut oracle = Oracle::repeating(songs(&["a"]), Some(0));
        assert_eq!(oracle.current(), None);
        assert_eq!(oracle.advance(), None);
    }

    #[test]
    fn test_repeating_empty_sequence() {
        let mut oracle = Oracle::repeating(Vec::new(), None);
        assert_eq!(oracle.current(), None);
        assert_eq!(oracle.advance(), None);
    }

    #[test]
    fn test_chain_concatenates_children() {
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["a1", "a2"])));
        chain.add(Oracle::playlist(songs(&["b1", "b2"])));
        let mut oracle = Oracle::Chain(chain);
        assert_eq!(collect(&mut oracle, 100), songs(&["a1", "a2", "b1", "b2"]));
    }

    #[test]
    fn test_chain_tolerates_null_children() {
        for null_at in 0..4 {
            let mut chain = ChainOracle::new();
            for (i, child) in [
                Oracle::playlist(songs(&["a1", "a2"])),
                Oracle::playlist(songs(&["b1"])),
                Oracle::playlist(songs(&["c1"])),
            ]
            .into_iter()
            .enumerate()
            {
                if i == null_at {
                    chain.add(Oracle::null());
                }
                chain.add(child);
            }
            if null_at == 3 {
                chain.add(Oracle::null());
            }
            let mut oracle = Oracle::Chain(chain);
            assert_eq!(
                collect(&mut oracle, 100),
                songs(&["a1", "a2", "b1", "c1"]),
                "null inserted at {}",
                null_at
            );
        }
    }

    #[test]
    fn test_chain_memoized_nothing_sticks() {
        let mut chain = ChainOracle::new();
        assert_eq!(chain.current(), None);

        chain.add(Oracle::playlist(songs(&["x"])));
        // Le « rien » mémoïsé colle jusqu'au prochain advance.
        assert_eq!(chain.current(), None);
        assert_eq!(chain.advance().as_deref(), Some("x"));
        assert_eq!(chain.current().as_deref(), Some("x"));
    }

    #[test]
    fn test_chain_direct_advance_skips_first() {
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["a", "b"])));
        // Aucun current() observé : le premier advance rend le DEUXIÈME
        // morceau du premier enfant non vide.
        assert_eq!(chain.advance().as_deref(), Some("b"));
    }

    #[test]
    fn test_chain_current_then_advance_is_normal() {
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["a", "b"])));
        assert_eq!(chain.current().as_deref(), Some("a"));
        assert_eq!(chain.advance().as_deref(), Some("b"));
    }

    #[test]
    fn test_chain_reads_children_added_after_exhaustion() {
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["a"])));
        assert_eq!(chain.current().as_deref(), Some("a"));
        assert_eq!(chain.advance(), None);

        chain.add(Oracle::playlist(songs(&["b"])));
        assert_eq!(chain.current(), None);
        assert_eq!(chain.advance().as_deref(), Some("b"));
    }

    #[test]
    fn test_chain_clear_drops_children() {
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["a", "b"])));
        assert_eq!(chain.current().as_deref(), Some("a"));

        chain.clear();
        // Le morceau mémoïsé reste en place jusqu'au prochain advance.
        assert_eq!(chain.current().as_deref(), Some("a"));
        assert_eq!(chain.advance(), None);

        chain.add(Oracle::playlist(songs(&["c"])));
        assert_eq!(chain.advance().as_deref(), Some("c"));
    }

    #[test]
    fn test_switch_without_child() {
        let mut switch = SwitchOracle::new();
        assert_eq!(switch.current(), None);
        assert_eq!(switch.advance(), None);
    }

    #[test]
    fn test_switch_replacement_restarts_at_first_item() {
        let mut switch = SwitchOracle::new();
        switch.set_child(Oracle::playlist(songs(&["p1a", "p1b"])));
        {
            let mut oracle = Oracle::Switch(switch);
            assert_eq!(collect(&mut oracle, 100), songs(&["p1a", "p1b"]));
            switch = match oracle {
                Oracle::Switch(s) => s,
                _ => unreachable!(),
            };
        }
        // set_child réarme le drapeau de tirage : on repart du premier
        // morceau du remplaçant.
        switch.set_child(Oracle::playlist(songs(&["p2a", "p2b"])));
        let mut oracle = Oracle::Switch(switch);
        assert_eq!(collect(&mut oracle, 100), songs(&["p2a", "p2b"]));
    }

    #[test]
    fn test_switch_first_ever_advance_skips_to_second_item() {
        let mut switch = SwitchOracle::new();
        switch.set_child(Oracle::playlist(songs(&["a", "b"])));
        // Jamais observé : le tout premier advance saute au deuxième
        // morceau. Comportement one-shot.
        assert_eq!(switch.advance().as_deref(), Some("b"));
    }

    #[test]
    fn test_switch_current_before_set_then_advance_skips() {
        let mut switch = SwitchOracle::new();
        assert_eq!(switch.current(), None);
        switch.set_child(Oracle::playlist(songs(&["a", "b"])));
        assert_eq!(switch.advance().as_deref(), Some("b"));
        // Le one-shot est consommé : un remplacement repart normalement.
        switch.set_child(Oracle::playlist(songs(&["c", "d"])));
        assert_eq!(switch.advance().as_deref(), Some("c"));
    }

    #[test]
    fn test_switch_observed_then_replaced() {
        let mut switch = SwitchOracle::new();
        switch.set_child(Oracle::playlist(songs(&["a", "b"])));
        assert_eq!(switch.current().as_deref(), Some("a"));

        switch.set_child(Oracle::playlist(songs(&["c", "d"])));
        assert_eq!(switch.advance().as_deref(), Some("c"));
        assert_eq!(switch.advance().as_deref(), Some("d"));
        assert_eq!(switch.advance(), None);
    }

    #[test]
    fn test_interrupt_without_interrupt_is_passthrough() {
        let mut oracle = Oracle::interrupt(Oracle::playlist(songs(&["d1", "d2"])));
        assert_eq!(collect(&mut oracle, 100), songs(&["d1", "d2"]));
    }

    #[test]
    fn test_interrupt_splices_then_resumes_default() {
        let mut interrupt = InterruptOracle::new(Oracle::playlist(songs(&["d1", "d2", "d3", "d4"])));
        // On consomme k=2 morceaux du défaut.
        assert_eq!(interrupt.current().as_deref(), Some("d1"));
        assert_eq!(interrupt.advance().as_deref(), Some("d2"));

        interrupt.interrupt(Oracle::playlist(songs(&["i1", "i2"])));
        assert_eq!(interrupt.advance().as_deref(), Some("i1"));
        assert_eq!(interrupt.advance().as_deref(), Some("i2"));
        // L'interruption épuisée est abandonnée, le défaut reprend là où
        // il en était.
        assert_eq!(interrupt.advance().as_deref(), Some("d3"));
        assert_eq!(interrupt.advance().as_deref(), Some("d4"));
        assert_eq!(interrupt.advance(), None);
    }

    #[test]
    fn test_interrupt_current_prefers_interrupt() {
        let mut interrupt = InterruptOracle::new(Oracle::playlist(songs(&["d1", "d2"])));
        interrupt.interrupt(Oracle::playlist(songs(&["i1"])));
        assert_eq!(interrupt.current().as_deref(), Some("i1"));
        // current() a déjà tiré i1 : advance ne le répète pas, épuise
        // l'interruption et retombe sur l'advance du défaut.
        assert_eq!(interrupt.advance().as_deref(), Some("d2"));
    }

    #[test]
    fn test_interrupt_cleared_explicitly() {
        let mut interrupt = InterruptOracle::new(Oracle::playlist(songs(&["d1", "d2"])));
        interrupt.current();
        interrupt.interrupt(Oracle::playlist(songs(&["i1", "i2", "i3"])));
        assert_eq!(interrupt.advance().as_deref(), Some("i1"));

        interrupt.clear_interrupt();
        assert_eq!(interrupt.advance().as_deref(), Some("d2"));
    }

    #[test]
    fn test_interrupt_with_empty_interrupt_falls_through() {
        let mut interrupt = InterruptOracle::new(Oracle::playlist(songs(&["d1", "d2"])));
        interrupt.current();
        interrupt.interrupt(Oracle::playlist(Vec::new()));
        assert_eq!(interrupt.advance().as_deref(), Some("d2"));
    }

    #[test]
    fn test_controller_shaped_tree() {
        // La topologie du contrôleur : Interrupt(Switch(Chain)).
        let mut switch = SwitchOracle::new();
        switch.set_child(Oracle::chain());
        let mut root = InterruptOracle::new(Oracle::Switch(switch));

        // Kick initial sur arbre vide : rien à jouer.
        assert_eq!(root.advance(), None);

        // play("P") : nouvelle chaîne via le switch.
        let mut chain = ChainOracle::new();
        chain.add(Oracle::playlist(songs(&["u1", "u2"])));
        match root.default_mut() {
            Oracle::Switch(switch) => switch.set_child(Oracle::Chain(chain)),
            _ => unreachable!(),
        }
        assert_eq!(root.advance().as_deref(), Some("u1"));

        // queue("s3") : ajout à la chaîne courante.
        match root.default_mut() {
            Oracle::Switch(switch) => match switch.child_mut() {
                Some(Oracle::Chain(chain)) => chain.add(Oracle::playlist(songs(&["u3"]))),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }

        assert_eq!(root.advance().as_deref(), Some("u2"));
        assert_eq!(root.advance().as_deref(), Some("u3"));
        assert_eq!(root.advance(), None);
    }
}

//! Usage de base des oracles : composition d'une file de lecture.

use nboracle::{ChainOracle, InterruptOracle, Oracle, SwitchOracle};

fn main() {
    // La topologie du lecteur : Interrupt(Switch(Chain)).
    let mut switch = SwitchOracle::new();
    switch.set_child(Oracle::chain());
    let mut root = InterruptOracle::new(Oracle::Switch(switch));

    // Une playlist, puis un morceau en répétition.
    let mut chain = ChainOracle::new();
    chain.add(Oracle::playlist(vec![
        "/music/intro.flac".to_string(),
        "/music/main.flac".to_string(),
    ]));
    chain.add(Oracle::repeating(vec!["/music/outro.flac".to_string()], Some(2)));

    match root.default_mut() {
        Oracle::Switch(switch) => switch.set_child(Oracle::Chain(chain)),
        _ => unreachable!(),
    }

    println!("File de lecture :");
    while let Some(uri) = root.advance() {
        println!("  -> {}", uri);
    }
    println!("(fin de la file)");

    // Une interruption passe devant, puis la main revient à la file.
    root.interrupt(Oracle::playlist(vec!["/music/jingle.flac".to_string()]));
    println!("Après interruption : {:?}", root.advance());
}

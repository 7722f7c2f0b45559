//! Standalone game-state simulator: connects to samhain's signal address
//! and writes one weighted random mood signal every few seconds, the way a
//! game's encounter logic would.

use std::io::Write;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

const SIGNAL_ADDR: &str = "127.0.0.1:9002";

const STATES: &[(&str, u32)] = &[
    ("reset", 25),
    ("epic", 10),
    ("lofi", 8),
    ("claustro", 7),
    ("anxiety", 8),
    ("heroic", 7),
    ("warmth", 7),
    ("intimacy", 6),
    ("cold", 6),
    ("panic", 5),
    ("suspense", 5),
    ("horror", 4),
    ("empty", 5),
    ("underwater", 4),
    ("dreamy", 5),
    ("ethereal", 5),
    ("retro", 6),
    ("dirty", 4),
    ("robotic", 4),
    ("glitch", 3),
    ("psychedelic", 4),
    ("memory", 4),
];

fn connect(addr: &str) -> TcpStream {
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                println!("[gamesim] connected to {}", addr);
                return stream;
            }
            Err(_) => {
                println!("[gamesim] waiting for {}...", addr);
                thread::sleep(Duration::from_secs(2));
            }
        }
    }
}

fn main() {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SIGNAL_ADDR.to_string());

    let mut rng = rand::thread_rng();
    let weights: Vec<u32> = STATES.iter().map(|(_, w)| *w).collect();
    let dist = WeightedIndex::new(&weights).expect("non-empty weight table");

    let mut stream = connect(&addr);

    loop {
        let delay = rng.gen_range(5.0..15.0);
        println!("[gamesim] next change in {:.1}s", delay);
        thread::sleep(Duration::from_secs_f32(delay));

        let (state, _) = STATES[dist.sample(&mut rng)];
        println!("[gamesim] state -> {}", state);

        if writeln!(stream, "{}", state).is_err() {
            println!("[gamesim] connection lost, reconnecting");
            stream = connect(&addr);
            let _ = writeln!(stream, "{}", state);
        }
    }
}

//! samhain: a mood engine for real-time game audio.
//!
//! Plays a looping source through a fixed SuperCollider effect chain and
//! morphs the chain between scenes as signals arrive from a game.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use simplelog::{
    ColorChoice, CombinedLogger, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use samhain_core::audio::commands::AudioFeedback;
use samhain_core::audio::AudioHandle;
use samhain_core::config::{self, Config};
use samhain_core::signal::SignalListener;
use samhain_core::state::SceneCatalog;

fn init_logging() {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(dir) = config::config_dir() {
        let _ = std::fs::create_dir_all(&dir);
        if let Ok(file) = std::fs::File::create(dir.join("samhain.log")) {
            loggers.push(WriteLogger::new(
                LevelFilter::Debug,
                simplelog::Config::default(),
                file,
            ));
        }
    }
    let _ = CombinedLogger::init(loggers);
}

fn build_catalog() -> SceneCatalog {
    let mut catalog = SceneCatalog::builtin();
    if let Some(path) = config::scenes_path() {
        match catalog.load_user_scenes(&path) {
            Ok(0) => {}
            Ok(n) => log::info!("Merged {} user scene(s) from {}", n, path.display()),
            Err(e) => log::warn!("{}", e),
        }
    }
    catalog
}

fn autostart(audio: &mut AudioHandle, config: &Config) {
    log::info!("Booting scsynth on port {}", config.server_port());
    if let Err(e) = audio.start_server(config.scsynth_path.as_deref(), config.server_port()) {
        log::error!("Could not start scsynth: {}", e);
        return;
    }
    if let Err(e) = audio.connect(&config.server_addr) {
        log::error!("Could not connect to {}: {}", config.server_addr, e);
        return;
    }
    let scd = Path::new("synthdefs/samhain.scd");
    if scd.exists() {
        let _ = audio.compile_synthdefs(scd, config.sclang_path.as_deref());
    }
}

fn main() {
    init_logging();

    let config = Config::load();
    let catalog = build_catalog();

    let mut audio = AudioHandle::new();
    audio.set_catalog(catalog.clone());
    audio.set_source_gain(config.master_gain);

    if config.autostart {
        autostart(&mut audio, &config);
    }

    let (signal_tx, signal_rx) = mpsc::channel();
    let _signals = match SignalListener::start(&config.signal_addr, signal_tx) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!(
                "Signal listener failed to bind {}: {}",
                config.signal_addr,
                e
            );
            None
        }
    };

    let (stdin_tx, stdin_rx) = mpsc::channel();
    thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if stdin_tx.send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    println!("samhain (type 'help' for commands)");

    loop {
        while let Ok(signal) = signal_rx.try_recv() {
            log::info!("Signal: {}", signal);
            let _ = audio.send_signal(&signal);
        }

        let mut quit = false;
        while let Ok(line) = stdin_rx.try_recv() {
            if !run_command(line.trim(), &mut audio, &catalog) {
                quit = true;
                break;
            }
        }
        if quit {
            break;
        }

        for feedback in audio.drain_feedback() {
            print_feedback(&feedback);
        }

        thread::sleep(Duration::from_millis(10));
    }

    audio.stop_server();
}

/// Returns false when the loop should exit.
fn run_command(line: &str, audio: &mut AudioHandle, catalog: &SceneCatalog) -> bool {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => {}
        "load" => {
            if rest.is_empty() {
                println!("Usage: load <path.wav>");
            } else if let Err(e) = audio.load_source(Path::new(rest)) {
                log::error!("Load failed: {}", e);
            }
        }
        "play" => audio.play(),
        "pause" => audio.pause(),
        "stop" => audio.stop(),
        "scene" => {
            if rest.is_empty() {
                println!("Usage: scene <id>");
            } else {
                let _ = audio.request_scene(rest);
            }
        }
        "reset" => {
            let _ = audio.reset_scene();
        }
        "rate" => match parse_rate(rest) {
            Some((value, ramp_secs)) => audio.set_rate(value, ramp_secs),
            None => println!("Usage: rate <value> [ramp_secs]"),
        },
        "scenes" => {
            for id in catalog.ids() {
                println!("  {}", id);
            }
        }
        "status" => {
            audio.request_status();
            let monitor = audio.monitor();
            let (cpu_avg, cpu_peak) = monitor.cpu();
            println!(
                "{:?} (scsynth running: {}) cpu {:.1}%/{:.1}% synths {} latency {:.1}ms",
                audio.status(),
                audio.server_running(),
                cpu_avg,
                cpu_peak,
                monitor.num_synths(),
                monitor.latency_ms(),
            );
        }
        "help" => print_help(),
        "quit" | "exit" => return false,
        other => println!("Unknown command '{}' (try 'help')", other),
    }
    true
}

fn parse_rate(rest: &str) -> Option<(f32, Option<f32>)> {
    let mut parts = rest.split_whitespace();
    let value: f32 = parts.next()?.parse().ok()?;
    let ramp_secs = match parts.next() {
        Some(s) => Some(s.parse().ok()?),
        None => None,
    };
    Some((value, ramp_secs))
}

fn print_help() {
    println!("  load <path.wav>       load a looping source (rebuilds the chain)");
    println!("  play | pause | stop   transport");
    println!("  scene <id>            transition to a scene");
    println!("  reset                 return to baseline");
    println!("  rate <value> [secs]   playback rate, optionally ramped");
    println!("  scenes                list scene ids");
    println!("  status                server status and load");
    println!("  quit                  exit");
}

fn print_feedback(feedback: &AudioFeedback) {
    match feedback {
        AudioFeedback::ServerStatus { status, message, .. } => {
            log::info!("Server: {:?} ({})", status, message);
        }
        AudioFeedback::CompileResult(Ok(msg)) => log::info!("{}", msg),
        AudioFeedback::CompileResult(Err(e)) => {
            log::error!("Synthdef compilation failed: {}", e);
        }
        AudioFeedback::SourceLoaded { path, channels, duration_secs } => {
            log::info!(
                "Loaded {} ({}ch, {:.1}s)",
                path.display(),
                channels,
                duration_secs
            );
        }
        AudioFeedback::SceneApplied(id) => log::info!("Scene applied: {}", id),
        AudioFeedback::SceneRejected { scene_id, reason } => {
            log::warn!("Scene '{}' rejected: {}", scene_id, reason);
        }
        AudioFeedback::TransportRejected { action, reason } => {
            log::warn!("Cannot {}: {}", action, reason);
        }
        AudioFeedback::ServerCrashed { message } => log::error!("{}", message),
    }
}

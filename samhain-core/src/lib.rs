//! Core engine for samhain: scene state, the SuperCollider-backed audio
//! engine, the signal listener, and configuration.

pub mod audio;
pub mod config;
pub mod signal;
pub mod state;

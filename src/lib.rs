//! Galley Protocol Core
//!
//! This library is the bridge between a conversational agent and a local
//! kitchen inventory/recipe store. It owns the tool schema catalog, the
//! function dispatcher, bounded conversation history, the streaming and
//! stateless transports (unified behind one event surface), request
//! lifecycle timers, and the PCM16 audio codec. Presentation and
//! persistence are external collaborators.

pub mod audio;
pub mod client;
pub mod config;
pub mod history;
pub mod store;
pub mod tools;

//! `arena_client`
//!
//! Client-side systems:
//! - Input capture (held movement keys, block toggle, fire intents)
//! - Local player prediction
//! - Projectile simulation and local hit detection
//! - Reconciliation of authority messages into the session
//! - Presentation snapshot for a renderer
//! - Connection management (one reliable channel)

pub mod client;
pub mod input;
pub mod player;
pub mod present;
pub mod projectile;
pub mod session;
pub mod world;

pub use client::GameClient;
pub use session::{ArenaSession, Outcome, SessionPhase};

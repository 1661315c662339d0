//! # shatter-host: host-side integration for the progression core
//!
//! `shatter-core` knows nothing about frames, timers or input devices. This
//! crate is the thin layer an engine embeds between its frame loop and the
//! core.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Engine                   │
//! │   input / triggers         presentation  │
//! │        │                        ▲        │
//! │        ▼                        │        │
//! │  ┌────────────────────────────────────┐  │
//! │  │           shatter-host             │  │
//! │  │  HostInput ─▶ GameSession ─▶ Hud   │  │
//! │  │        timer · gates · cooldowns   │  │
//! │  │  ┌──────────────────────────────┐  │  │
//! │  │  │         shatter-core         │  │  │
//! │  │  └──────────────────────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `triggers`: engine inputs
//! - `session`: routes inputs and runs the per-frame update
//! - `timer`: the transition hold
//! - `gates`: sleep points, dream exits and hidden triggers
//! - `resonance`: cooldown-gated reveal of hidden triggers
//! - `hud`: per-frame view model
//! - `config` / `telemetry`: host configuration and tracing setup
//! - `demo`: bundled demo catalog and host config

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod demo;
pub mod gates;
pub mod hud;
pub mod resonance;
pub mod session;
pub mod telemetry;
pub mod timer;
pub mod triggers;

pub use config::HostConfig;
pub use hud::HudSnapshot;
pub use session::{GameSession, InputOutcome};
pub use triggers::HostInput;

//! WaveScout: a waveform viewer core, built as a TUI application over VCD
//! traces.
//!
//! Modules split along the natural seams of the system: scalar types
//! and identifiers ([`types`]), the waveform data facade ([`db`]), value
//! parsing ([`value`]), the session/view-state model ([`session`]), the sole
//! session mutator and typed event bus ([`controller`]), the per-pixel
//! sampling pipeline ([`sampling`]), the pure-function renderer
//! ([`render`]), the frame cache and paint orchestrator ([`canvas`]), the
//! off-main-thread file loader ([`worker`]), the keyboard contract
//! ([`keymap`]), error taxonomy ([`errors`]), settings/constants
//! ([`config`]), and frame timing diagnostics ([`logging`]).
//!
//! [`app`] wires these into a running terminal application; everything
//! above it is UI-framework-agnostic and testable without a terminal.

pub mod app;
pub mod canvas;
pub mod config;
pub mod controller;
pub mod db;
pub mod errors;
pub mod keymap;
pub mod logging;
pub mod render;
pub mod resize;
pub mod sampling;
pub mod session;
pub mod types;
pub mod value;
pub mod worker;

pub mod widgets;

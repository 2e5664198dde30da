//! Event tracking metrics viewer.
//!
//! The core ([`data`], [`graph`], [`chart`]) knows nothing about egui: it
//! turns uploaded CSV tables and control values into chart descriptions.
//! [`app`] and [`ui`] wire it to an eframe window.

pub mod app;
pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod graph;
pub mod state;
pub mod ui;

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::new_without_default
)]
//! Input redirection for flat UI panels placed on quads in a 3D scene.
//!
//! Pointer events from a mouse (projected through a camera) or from a
//! controller ray are turned into hits on the panel's quad, converted into
//! the panel's pixel space and forwarded to the panel, once per event per
//! frame. See [`backend::redirect::PanelInputRedirector`].

pub mod backend;
pub mod config;
pub mod config_io;
pub mod panel;

pub mod autohide;
pub mod backend;
pub mod controller;
pub mod gst_backend;
pub mod keys;
pub mod service;
pub mod state;

pub use service::{Player, PlayerCommand};

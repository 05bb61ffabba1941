pub mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod logging;
pub mod render;
pub mod signal;
pub mod terminal;
pub mod visual;

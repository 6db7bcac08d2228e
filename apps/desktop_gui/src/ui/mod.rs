//! UI layer for desktop GUI: the tabbed aligner window.

pub mod app;

pub use app::AlignerApp;

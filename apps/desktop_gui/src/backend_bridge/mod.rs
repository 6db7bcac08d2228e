//! Bridge between the egui thread and the async aligner controller.

pub mod commands;
pub mod runtime;

//! Command-line export of ink annotations into a PDF

pub mod config;
pub mod export;

pub use export::{default_output, ExportJob};

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use ir::LogicalGraph;
pub use layout::{LayoutEngine, LayoutOutcome, compute_layout};

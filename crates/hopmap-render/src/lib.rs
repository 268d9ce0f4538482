//! DOT output and Graphviz rasterization.

pub mod dot;
pub mod error;
pub mod output;

pub use dot::{to_dot, validate};
pub use error::RenderError;
pub use output::{atomic_write, render, render_to_file, OutputFormat};

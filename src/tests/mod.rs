pub mod common;
mod fallback_resolution;

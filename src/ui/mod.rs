//! Terminal browser over a finished extraction run.

pub mod app;
pub mod dashboard;

pub use app::App;

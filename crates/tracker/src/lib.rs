pub mod app;
pub mod cli;
pub mod db;
pub mod errors;
pub mod library;
pub mod recovery;
pub mod seed;
pub mod weight;

pub use app::App;
pub use cli::{Cli, Command};
pub use errors::{ErrorSink, RecordingErrorSink, TracingErrorSink};
pub use weight::{AggregatePolicy, WeightLog};

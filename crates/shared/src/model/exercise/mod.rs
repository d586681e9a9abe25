mod exercise_definition;
pub use exercise_definition::*;

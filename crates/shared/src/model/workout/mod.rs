mod workout;
pub use workout::*;

mod exercise_entry;
pub use exercise_entry::*;

mod template;
pub use template::*;

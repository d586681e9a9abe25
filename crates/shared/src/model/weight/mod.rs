mod weight_entry;
pub use weight_entry::*;

mod daily_aggregate;
pub use daily_aggregate::*;

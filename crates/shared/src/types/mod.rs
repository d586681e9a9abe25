mod uuid;
pub use self::uuid::*;

mod label;
pub use label::*;

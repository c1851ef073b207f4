pub mod normalize;
pub mod pii;

pub use normalize::{to_date, to_flag, to_number, to_text};
pub use pii::Masked;

pub mod money;
pub mod pii;

pub use pii::Masked;

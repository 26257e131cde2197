pub mod channel;
pub mod reading;

pub use channel::*;
pub use reading::*;

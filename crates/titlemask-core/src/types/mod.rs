pub mod mode;
pub mod parsed;

pub use mode::Mode;
pub use parsed::ParsedTitle;

pub mod debounce;
pub mod ticker;

pub use debounce::Debouncer;
pub use ticker::Ticker;

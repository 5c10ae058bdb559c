//! Processor implementations

#[cfg(feature = "square")]
pub mod square;

#[cfg(feature = "square")]
pub use square::SquareProvider;

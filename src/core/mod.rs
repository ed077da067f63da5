pub mod error;

pub use error::DochatError;

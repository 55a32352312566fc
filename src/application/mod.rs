// Application layer - orchestration of the pure domain core over the
// repository and the external rate directory.

pub mod error;
pub mod rates;
pub mod service;

pub use error::*;
pub use rates::*;
pub use service::*;

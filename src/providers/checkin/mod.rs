//! Check-in dispatchers.
//!
//! - [`HttpDispatcher`] - GET request per link via `reqwest`

mod http;
mod traits;

pub use http::HttpDispatcher;
pub use traits::{CheckInDispatcher, DispatchError};

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod overview;
pub mod quiz_session;
pub mod recommend;
pub mod time;
pub mod unlock;

pub use error::ValidationError;
pub use time::Clock;

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod stats;
pub mod time;

pub use error::Error;
pub use progress::{SubjectProgress, TopicChange, TopicRemoval};
pub use time::Clock;

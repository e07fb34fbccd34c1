//! Headless client for the study API.
//!
//! [`HttpStudyApi`] is the transport; [`OptimisticCollection`] applies
//! mutations locally before the server confirms them and rolls them back when
//! it does not; [`StudyWorkspace`] holds one of each collection for a user.

#![forbid(unsafe_code)]

pub mod error;
pub mod http;
pub mod optimistic;
pub mod record;
pub mod remote;
pub mod workspace;

pub use error::ClientError;
pub use http::HttpStudyApi;
pub use optimistic::{Mutation, OptimisticCollection, Snapshot};
pub use record::Record;
pub use remote::{RemoteCollection, RemoteTopics};
pub use workspace::StudyWorkspace;

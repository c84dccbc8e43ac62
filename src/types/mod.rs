//! Type definitions for requests and persisted records

pub mod records;
pub mod request;

pub use records::{Entry, OwnedEntry, User};
pub use request::{
    AlertRequest, Credentials, CourseQuery, EntryForm, KnnQuery, MapQuery, PriceQuery,
};

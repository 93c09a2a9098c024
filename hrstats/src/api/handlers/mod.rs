//! HTTP request handlers.
//!
//! Handlers validate path and query parameters, returning [`crate::errors::Error::BadRequest`]
//! for anything the segment grammar or the analytics host would misread, then delegate to the
//! [`crate::summary::Aggregator`] held in [`crate::AppState`].

pub mod summary;

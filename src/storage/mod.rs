//! Media storage module
//!
//! Handles media file persistence on the local filesystem.
//! The database only keeps the relative path returned by [`MediaStorage::save`].

mod media;

pub use media::MediaStorage;

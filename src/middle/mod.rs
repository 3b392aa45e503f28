//! Intermediate forms shared between the reader and the backend.

pub mod l2;

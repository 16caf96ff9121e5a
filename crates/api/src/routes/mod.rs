//! Route handlers

pub mod capture;
pub mod controls;
pub mod recordings;
pub mod stream;
pub mod sync;

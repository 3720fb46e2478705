//! Test modules

mod helpers;
mod keys;
mod signature;
mod vss;

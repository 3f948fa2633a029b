//! Backend-controlled video feed
//!
//! The feed is switched on and off with POST requests; once on, it is
//! rendered from a locator that carries a cache-busting token.

mod http;
mod locator;

pub use http::{HttpStreamResource, StreamControl};
pub use locator::{LocatorMinter, StreamLocator};

//! Image slideshow that drifts each picture across the screen.
//!
//! [`catalog::Catalog`] indexes the images under a directory once and serves
//! picks from memory; [`slide::Slide`] models one drifting layer;
//! [`slideshow::Slideshow`] drives both against the platform seams in
//! [`surface`]. The raylib implementation of those seams is in [`window`].

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod slide;
pub mod slideshow;
pub mod state;
pub mod surface;
pub mod texture_loader;
pub mod timing;
pub mod window;

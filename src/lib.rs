//! Junkyard - batch file-processing toolbox
//!
//! A set of independent batch tools (archive packing, RAR to ZIP conversion,
//! extension renaming, image conversion, thumbnails, subtitle resync and
//! video transcoding) driven by one cancellable, observable process engine.

pub mod archive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod imaging;
pub mod media;
pub mod subtitle;
pub mod tools;

// Container codec
//
// ZIP archives are read and written directly; RAR archives are only
// extracted, through the RarExtractor port so tools can be tested without
// real RAR fixtures.

pub mod rar;
pub mod zip_archive;

pub use rar::{RarExtractor, UnrarExtractor};
#[cfg(test)]
pub use rar::MockRarExtractor;
pub use zip_archive::{
    ZipEntrySource, collect_flat, collect_tree, extract_zip, write_zip, zip_directory,
};

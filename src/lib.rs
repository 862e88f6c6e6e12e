//! # apkmeta
//!
//! Best-effort extraction of application metadata from Android binary
//! manifests (`AndroidManifest.xml` as stored inside an APK).
//!
//! Scanning recovers the ordered strings of the manifest's string pool, and
//! classification guesses the package name, version name and code, display
//! label and requested permissions from those strings. Malformed input
//! narrows the result instead of failing it; the only hard error is a buffer
//! too short to hold the document header.

use crate::android::zip::{ApkFile, ApkZipResult};
use crate::error::ParseResult;
use crate::manifest::ManifestMetadata;
use std::path::Path;

pub mod android;
pub mod error;
pub mod manifest;

pub use crate::android::binary_xml::{scan, StringPool};
pub use crate::error::ParseError;
pub use crate::manifest::classify;

/// Scans and classifies a decompressed binary manifest.
///
/// # Examples
///
/// ```no_run
///  use std::fs;
///
///  let data = fs::read("AndroidManifest.xml").unwrap();
///  let metadata = apkmeta::parse_manifest(&data).unwrap();
///  println!("{}", metadata);
/// ```
pub fn parse_manifest(data: &[u8]) -> ParseResult<ManifestMetadata> {
    let pool = scan(data)?;
    Ok(classify(&pool))
}

/// Opens the APK at `path` and extracts metadata from its manifest.
pub fn read_apk_metadata(path: impl AsRef<Path>) -> ApkZipResult<ManifestMetadata> {
    ApkFile::from_file(path)?.metadata()
}

//! Android container formats: the binary XML string pool and the APK archive.

pub mod binary_xml;
pub mod zip;

use crate::android::binary_xml;
use crate::error::ParseError;
use crate::manifest::{Classifier, ManifestMetadata};
use log::debug;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use zip::read::ZipArchive;
use zip::result::ZipError;

/// Name of the binary manifest entry inside every APK.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Result alias for APK (ZIP) operations.
pub type ApkZipResult<T> = Result<T, ApkZipError>;

/// Errors surfaced while opening an APK or reading its manifest.
#[derive(Debug)]
pub enum ApkZipError {
    Io(io::Error),
    Zip(ZipError),
    /// The archive has no entry with this name.
    MissingEntry(String),
    Manifest(ParseError),
}

impl std::fmt::Display for ApkZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkZipError::Io(err) => write!(f, "I/O error: {err}"),
            ApkZipError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkZipError::MissingEntry(name) => {
                write!(f, "There is no item named '{name}' in the archive")
            }
            ApkZipError::Manifest(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApkZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkZipError::Io(err) => Some(err),
            ApkZipError::Zip(err) => Some(err),
            ApkZipError::Manifest(err) => Some(err),
            ApkZipError::MissingEntry(_) => None,
        }
    }
}

impl From<io::Error> for ApkZipError {
    fn from(value: io::Error) -> Self {
        ApkZipError::Io(value)
    }
}

impl From<ZipError> for ApkZipError {
    fn from(value: ZipError) -> Self {
        ApkZipError::Zip(value)
    }
}

impl From<ParseError> for ApkZipError {
    fn from(value: ParseError) -> Self {
        ApkZipError::Manifest(value)
    }
}

/// An opened APK.
///
/// Only the central directory is read up front. Entries are decompressed on
/// request, so a damaged entry only fails reads of that entry.
pub struct ApkFile<R = File> {
    archive: ZipArchive<R>,
}

impl ApkFile<File> {
    /// Open an APK on disk.
    pub fn from_file(path: impl AsRef<Path>) -> ApkZipResult<Self> {
        let path = path.as_ref();
        let apk = Self::from_reader(File::open(path)?)?;
        debug!("opened {} with {} entries", path.display(), apk.archive.len());
        Ok(apk)
    }
}

impl<R: Read + Seek> ApkFile<R> {
    /// Open an APK from any seekable reader.
    pub fn from_reader(reader: R) -> ApkZipResult<Self> {
        Ok(ApkFile {
            archive: ZipArchive::new(reader)?,
        })
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// Decompressed bytes of the entry called `name`.
    pub fn read_entry(&mut self, name: &str) -> ApkZipResult<Vec<u8>> {
        let mut entry = self.archive.by_name(name).map_err(|err| match err {
            ZipError::FileNotFound => ApkZipError::MissingEntry(name.to_string()),
            other => ApkZipError::Zip(other),
        })?;
        // The declared size is untrusted, so let the buffer grow as data arrives.
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Raw bytes of the binary `AndroidManifest.xml`.
    pub fn manifest(&mut self) -> ApkZipResult<Vec<u8>> {
        self.read_entry(MANIFEST_ENTRY)
    }

    /// Scan and classify the manifest with the default policy.
    pub fn metadata(&mut self) -> ApkZipResult<ManifestMetadata> {
        self.metadata_with(&Classifier::default())
    }

    pub fn metadata_with(&mut self, classifier: &Classifier) -> ApkZipResult<ManifestMetadata> {
        let pool = binary_xml::scan(&self.manifest()?)?;
        Ok(classifier.classify(&pool))
    }
}

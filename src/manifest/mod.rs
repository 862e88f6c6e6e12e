//! Application metadata recovered from a binary manifest.

pub mod classify;

pub use classify::{classify, Classifier, ClassifierConfig};

use serde::Serialize;
use std::fmt;

/// Line emitted by [`ManifestMetadata::report_lines`] when no package was found.
pub const MISSING_PACKAGE_LINE: &str = "error: Could not parse package name";

/// Insertion ordered set of permission names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet {
    names: Vec<String>,
}

impl PermissionSet {
    pub fn new() -> Self {
        PermissionSet { names: Vec::new() }
    }

    /// Adds `name` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = PermissionSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// Best-effort metadata for one manifest.
///
/// Absent fields mean the heuristics found nothing suitable; they never
/// indicate an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub package: Option<String>,
    pub version_name: Option<String>,
    /// Decimal text, never parsed into an integer type.
    pub version_code: Option<String>,
    pub app_label: Option<String>,
    pub permissions: PermissionSet,
}

impl ManifestMetadata {
    /// The `key:value` lines understood by consumers of the command line tool.
    ///
    /// Keys with no value are left out, and a trailing error line marks a
    /// manifest whose package could not be recovered.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let fields = [
            ("package", &self.package),
            ("versionName", &self.version_name),
            ("versionCode", &self.version_code),
            ("appLabel", &self.app_label),
        ];
        for (key, value) in fields {
            if let Some(value) = present(value) {
                lines.push(format!("{key}:{value}"));
            }
        }
        for permission in self.permissions.iter() {
            lines.push(format!("permission:{permission}"));
        }
        if present(&self.package).is_none() {
            lines.push(MISSING_PACKAGE_LINE.to_string());
        }
        lines
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl fmt::Display for ManifestMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.report_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_set_keeps_first_seen_order() {
        let mut set = PermissionSet::new();
        assert!(set.insert("android.permission.INTERNET"));
        assert!(set.insert("android.permission.CAMERA"));
        assert!(!set.insert("android.permission.INTERNET"));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["android.permission.INTERNET", "android.permission.CAMERA"]
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn report_lists_present_fields_in_order() {
        let metadata = ManifestMetadata {
            package: Some("com.example.demo".into()),
            version_name: Some("1.4.2".into()),
            version_code: None,
            app_label: Some("Demo".into()),
            permissions: ["android.permission.INTERNET"].into_iter().collect(),
        };
        assert_eq!(
            metadata.to_string(),
            "package:com.example.demo\n\
             versionName:1.4.2\n\
             appLabel:Demo\n\
             permission:android.permission.INTERNET\n"
        );
    }

    #[test]
    fn report_flags_missing_package() {
        let metadata = ManifestMetadata {
            version_code: Some("12345".into()),
            package: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            metadata.report_lines(),
            vec!["versionCode:12345".to_string(), MISSING_PACKAGE_LINE.to_string()]
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let metadata = ManifestMetadata {
            package: Some("com.example.demo".into()),
            permissions: ["android.permission.CAMERA"].into_iter().collect(),
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(json["package"], "com.example.demo");
        assert!(json["versionName"].is_null());
        assert_eq!(json["permissions"][0], "android.permission.CAMERA");
    }
}

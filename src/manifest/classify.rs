//! Heuristics that pick manifest fields out of an ordered string pool.
//!
//! The string pool carries no tags at this level, so every field is guessed
//! from the shape of the strings and, for the label, from their distance to
//! the `application` element name. Package, version name and label take the
//! first string that qualifies. Version code takes the numerically largest.

use crate::android::binary_xml::StringPool;
use crate::manifest::{ManifestMetadata, PermissionSet};
use log::trace;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Words that look like labels but are resource types or build constants.
pub const DEFAULT_EXCLUDED_LABELS: &[&str] = &[
    "name",
    "label",
    "application",
    "activity",
    "service",
    "receiver",
    "provider",
    "RELEASE",
    "DEBUG",
    "MAIN",
    "VERSION",
    "SDK",
    "MIN",
    "MAX",
    "TARGET",
    "true",
    "false",
    "null",
    "value",
    "config",
    "default",
    "string",
    "layout",
    "drawable",
    "color",
    "dimen",
    "style",
    "array",
    "integer",
    "bool",
    "id",
    "attr",
    "anim",
    "menu",
    "raw",
    "xml",
    "font",
    "navigation",
    "transition",
];

/// Class name suffixes that disqualify a `.permission.` string.
pub const DEFAULT_COMPONENT_SUFFIXES: &[&str] = &["Activity", "Service", "Receiver", "Provider"];

const ANDROID_PERMISSION_PREFIX: &str = "android.permission.";
const CUSTOM_PERMISSION_MARKER: &str = ".permission.";

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::default);

/// Tunable policy for [`Classifier`].
///
/// Missing fields fall back to their defaults when deserializing, so a config
/// file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Compared case-insensitively against label candidates.
    pub excluded_labels: Vec<String>,
    /// Pool string the label proximity search starts after.
    pub application_marker: String,
    /// How many strings after the marker are considered.
    pub label_window: usize,
    pub component_suffixes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            excluded_labels: DEFAULT_EXCLUDED_LABELS.iter().map(|s| s.to_string()).collect(),
            application_marker: "application".to_string(),
            label_window: 20,
            component_suffixes: DEFAULT_COMPONENT_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Applies the field heuristics to string pools.
#[derive(Clone, Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    excluded: HashSet<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(ClassifierConfig::default())
    }
}

/// Classify `pool` with the default policy.
pub fn classify(pool: &StringPool) -> ManifestMetadata {
    DEFAULT_CLASSIFIER.classify(pool)
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let excluded = config
            .excluded_labels
            .iter()
            .map(|s| s.to_uppercase())
            .collect();
        Classifier { config, excluded }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Pure function of `pool`: the same pool always yields the same record.
    pub fn classify(&self, pool: &StringPool) -> ManifestMetadata {
        let permissions = self.permissions(pool);
        let package = find_package(pool);
        let version_name = find_version_name(pool);
        let version_code = find_version_code(pool);
        let app_label = self
            .find_label(pool)
            .or_else(|| package.as_deref().and_then(label_from_package));

        ManifestMetadata {
            package,
            version_name,
            version_code,
            app_label,
            permissions,
        }
    }

    pub fn is_permission(&self, s: &str) -> bool {
        if s.starts_with(ANDROID_PERMISSION_PREFIX) {
            return true;
        }
        s.contains(CUSTOM_PERMISSION_MARKER)
            && !self
                .config
                .component_suffixes
                .iter()
                .any(|suffix| s.ends_with(suffix.as_str()))
    }

    fn permissions(&self, pool: &StringPool) -> PermissionSet {
        pool.iter().filter(|s| self.is_permission(s)).collect()
    }

    fn is_excluded(&self, s: &str) -> bool {
        self.excluded.contains(&s.to_uppercase())
    }

    fn find_label(&self, pool: &StringPool) -> Option<String> {
        if let Some(label) = self.label_near_application(pool) {
            trace!("label {:?} found near application element", label);
            return Some(label.to_string());
        }
        if let Some(label) = pool.iter().find(|s| self.is_spaced_label(s)) {
            trace!("label {:?} found as multi-word string", label);
            return Some(label.to_string());
        }
        if let Some(label) = pool.iter().find(|s| self.is_plain_word_label(s)) {
            trace!("label {:?} found as capitalized word", label);
            return Some(label.to_string());
        }
        None
    }

    fn label_near_application<'a>(&self, pool: &'a StringPool) -> Option<&'a str> {
        let marker = pool.position(&self.config.application_marker)?;
        pool.iter()
            .skip(marker + 1)
            .take(self.config.label_window)
            .find(|s| self.is_nearby_label(s))
    }

    fn is_nearby_label(&self, s: &str) -> bool {
        (2..=50).contains(&char_len(s))
            && !s.contains('/')
            && !has_technical_affix(s)
            && !s.chars().any(is_digit)
            && !self.is_excluded(s)
            && starts_uppercase(s)
    }

    fn is_spaced_label(&self, s: &str) -> bool {
        (3..=50).contains(&char_len(s))
            && !s.contains('/')
            && !s.contains('.')
            && !has_technical_affix(s)
            && !self.is_excluded(s)
            && starts_uppercase(s)
            && s.contains(' ')
    }

    fn is_plain_word_label(&self, s: &str) -> bool {
        (3..=30).contains(&char_len(s))
            && starts_uppercase(s)
            && s.chars().all(char::is_alphabetic)
            && !self.is_excluded(s)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn starts_uppercase(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}

/// Decimal digits only. Fractions, Roman numerals and other numeric symbols
/// are not digits, and neither are non-ASCII decimal scripts.
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(is_digit)
}

fn has_technical_affix(s: &str) -> bool {
    s.starts_with("android") || s.starts_with("com.") || s.starts_with('@') || s.ends_with(".xml")
}

/// Java package shaped: at least two dots, identifier characters only.
pub fn looks_like_package(s: &str) -> bool {
    let len = char_len(s);
    len > 5
        && len < 200
        && s.matches('.').count() >= 2
        && s.chars().any(char::is_alphabetic)
        && s.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_')
        && !starts_with_digit(s)
        && !s.starts_with(ANDROID_PERMISSION_PREFIX)
}

/// Dotted and digit-led, with only `a`, `b` or `rc` tolerated in the first
/// five characters once separators are removed.
pub fn looks_like_version_name(s: &str) -> bool {
    if char_len(s) >= 50 || !s.contains('.') || !starts_with_digit(s) {
        return false;
    }
    let head: String = s
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '_'))
        .take(5)
        .collect();
    let head = head.replace('b', "").replace('a', "").replace("rc", "");
    !head.is_empty() && head.chars().all(is_digit)
}

/// Numeric value of `s` when it is a plausible version code.
pub fn version_code_value(s: &str) -> Option<u64> {
    if !(5..=10).contains(&s.len()) || !s.chars().all(is_digit) {
        return None;
    }
    s.parse().ok()
}

fn find_package(pool: &StringPool) -> Option<String> {
    pool.iter().find(|s| looks_like_package(s)).map(str::to_string)
}

fn find_version_name(pool: &StringPool) -> Option<String> {
    pool.iter()
        .find(|s| looks_like_version_name(s))
        .map(str::to_string)
}

fn find_version_code(pool: &StringPool) -> Option<String> {
    let mut best: Option<(u64, &str)> = None;
    for s in pool.iter() {
        if let Some(value) = version_code_value(s) {
            if best.map_or(true, |(current, _)| value > current) {
                best = Some((value, s));
            }
        }
    }
    best.map(|(_, s)| s.to_string())
}

/// `com.example.app` becomes `App`.
fn label_from_package(package: &str) -> Option<String> {
    let last = package.rsplit('.').next()?;
    let mut chars = last.chars();
    let first = chars.next()?;
    let label: String = first
        .to_uppercase()
        .chain(chars.flat_map(char::to_lowercase))
        .collect();
    Some(label)
}

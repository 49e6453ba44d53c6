//! Input validation and sanitization
//!
//! Everything that reaches the database or the file system passes through
//! here first. The validators only answer yes/no; it is up to the caller to
//! decide whether a rejection aborts the operation (write paths) or merely
//! drops a search term (read paths). Storage still binds every value as a
//! parameter regardless of what these checks say.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub const MAX_IDENTIFIER_LENGTH: usize = 100;
pub const MAX_STRING_LENGTH: usize = 500;
pub const MAX_FILE_SIZE_MB: u64 = 50;

/// Per-field storage limits, in characters.
pub mod limits {
    pub const IDENTIFIER: usize = 100;
    pub const CATEGORY: usize = 50;
    pub const VALUE: usize = 100;
    pub const PACKAGE: usize = 50;
    pub const FOOTPRINT: usize = 50;
    pub const VOLTAGE: usize = 50;
    pub const DESCRIPTION: usize = 500;
    pub const MANUFACTURER: usize = 100;
    pub const MANUFACTURER_PART_NUMBER: usize = 100;
    pub const DATASHEET_PATH: usize = 500;
    pub const SUPPLIER: usize = 100;
    pub const SUPPLIER_PART_NUMBER: usize = 100;
}

pub const ALLOWED_DATASHEET_EXTENSIONS: &[&str] = &["pdf"];

/// Substrings that never appear in a legitimate part number.
const SQL_BLOCKLIST: &[&str] = &[
    "--", ";", "/*", "*/", "XP_", "SP_", "DROP", "INSERT", "DELETE", "UPDATE", "EXEC",
    "EXECUTE", "SCRIPT", "UNION", "SELECT",
];

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_./ ]+$").expect("valid identifier pattern"));

static SHORT_IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_]+$").expect("valid short identifier pattern"));

/// Check a part number / catalog identifier.
pub fn validate_identifier(identifier: &str) -> bool {
    if identifier.is_empty() {
        return false;
    }

    let length = identifier.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        tracing::warn!("Identifier exceeds maximum length: {}", length);
        return false;
    }

    let upper = identifier.to_uppercase();
    if let Some(pattern) = SQL_BLOCKLIST.iter().find(|p| upper.contains(*p)) {
        tracing::warn!(
            "Rejected identifier {:?}: contains blocked sequence {:?}",
            identifier,
            pattern
        );
        return false;
    }

    // `.` and `/` are legal on their own, but never as a parent-directory hop.
    if identifier.contains("..") {
        tracing::warn!("Path traversal sequence in identifier: {:?}", identifier);
        return false;
    }

    if !IDENTIFIER_PATTERN.is_match(identifier) {
        tracing::warn!("Identifier contains invalid characters: {:?}", identifier);
        return false;
    }

    true
}

/// Stricter identifier check for values used as a single path segment.
pub fn validate_short_identifier(identifier: &str) -> bool {
    if identifier.is_empty() {
        return false;
    }

    let length = identifier.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        tracing::warn!("Component ID exceeds maximum length: {}", length);
        return false;
    }

    if identifier.contains("..") || identifier.contains('/') || identifier.contains('\\') {
        tracing::warn!("Path traversal attempt in component ID: {:?}", identifier);
        return false;
    }

    if !SHORT_IDENTIFIER_PATTERN.is_match(identifier) {
        tracing::warn!("Component ID contains invalid characters: {:?}", identifier);
        return false;
    }

    true
}

/// Truncate to `max_length` characters, drop NUL bytes and trim whitespace.
pub fn sanitize_text(input: &str, max_length: usize) -> String {
    if input.is_empty() {
        return String::new();
    }

    let truncated: String = if input.chars().count() > max_length {
        tracing::warn!("String truncated to {} characters", max_length);
        input.chars().take(max_length).collect()
    } else {
        input.to_string()
    };

    truncated.replace('\0', "").trim().to_string()
}

/// Sanitize an optional field, collapsing blank results to `None`.
pub fn sanitize_optional(input: Option<&str>, max_length: usize) -> Option<String> {
    input
        .map(|s| sanitize_text(s, max_length))
        .filter(|s| !s.is_empty())
}

pub fn validate_file_extension(path: &Path, allowed: &[&str]) -> bool {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !allowed.iter().any(|a| *a == extension) {
        tracing::warn!("Invalid file extension: {:?}", extension);
        return false;
    }
    true
}

pub fn validate_file_size(path: &Path, max_size_mb: u64) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let max_bytes = max_size_mb * 1024 * 1024;
            if meta.len() > max_bytes {
                tracing::warn!(
                    "File exceeds maximum size: {:.2}MB > {}MB",
                    meta.len() as f64 / 1024.0 / 1024.0,
                    max_size_mb
                );
                return false;
            }
            true
        }
        Err(e) => {
            tracing::error!("Error checking file size of {}: {}", path.display(), e);
            false
        }
    }
}

/// True when `path` resolves to a location inside `base`.
pub fn validate_file_path(path: &Path, base: &Path) -> bool {
    let (resolved, base) = match (path.canonicalize(), base.canonicalize()) {
        (Ok(p), Ok(b)) => (p, b),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Error validating file path {}: {}", path.display(), e);
            return false;
        }
    };

    if !resolved.starts_with(&base) {
        tracing::warn!(
            "Path traversal attempt: {} outside {}",
            resolved.display(),
            base.display()
        );
        return false;
    }
    true
}

/// Mask a secret for logging, keeping only the last `visible_chars`.
pub fn mask_sensitive_data(data: &str, visible_chars: usize) -> String {
    let length = data.chars().count();
    if length <= visible_chars {
        return "****".to_string();
    }
    let tail: String = data.chars().skip(length - visible_chars).collect();
    format!("{}{}", "*".repeat(length - visible_chars), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_identifier_accepts_part_numbers() {
        assert!(validate_identifier("ONX-CAP-001"));
        assert!(validate_identifier("LM5166"));
        assert!(validate_identifier("RC0805FR-0710KL"));
        assert!(validate_identifier("ABC_1.2/3 rev B"));
    }

    #[test]
    fn test_validate_identifier_rejects_injection() {
        assert!(!validate_identifier("; DELETE FROM components--"));
        assert!(!validate_identifier("DROP TABLE"));
        assert!(!validate_identifier("x union all"));
        assert!(!validate_identifier("a/*b"));
        assert!(!validate_identifier("../../etc/passwd"));
    }

    #[test]
    fn test_validate_identifier_rejects_bad_shape() {
        assert!(!validate_identifier(""));
        assert!(!validate_identifier(&"A".repeat(101)));
        assert!(validate_identifier(&"A".repeat(100)));
        assert!(!validate_identifier("part#1"));
        assert!(!validate_identifier("name'quote"));
    }

    #[test]
    fn test_validate_short_identifier() {
        assert!(validate_short_identifier("123-456"));
        assert!(validate_short_identifier("ABC_123"));
        assert!(!validate_short_identifier("../test"));
        assert!(!validate_short_identifier("test/path"));
        assert!(!validate_short_identifier("test\\path"));
        assert!(!validate_short_identifier("with space"));
        assert!(!validate_short_identifier(""));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("Test String   ", 500), "Test String");
        assert_eq!(sanitize_text(&"A".repeat(600), 500).len(), 500);
        assert_eq!(sanitize_text("nul\0byte", 50), "nulbyte");
        assert_eq!(sanitize_text("", 10), "");
        // Truncation happens on characters, not bytes.
        assert_eq!(sanitize_text("µµµµ", 2), "µµ");
    }

    #[test]
    fn test_sanitize_optional_drops_blank() {
        assert_eq!(sanitize_optional(Some("   "), 10), None);
        assert_eq!(sanitize_optional(None, 10), None);
        assert_eq!(sanitize_optional(Some(" TDK "), 10), Some("TDK".to_string()));
    }

    #[test]
    fn test_validate_file_extension() {
        let pdf = ALLOWED_DATASHEET_EXTENSIONS;
        assert!(validate_file_extension(Path::new("document.pdf"), pdf));
        assert!(validate_file_extension(Path::new("DOCUMENT.PDF"), pdf));
        assert!(!validate_file_extension(Path::new("malware.exe"), pdf));
        assert!(!validate_file_extension(Path::new("noext"), pdf));
    }

    #[test]
    fn test_validate_file_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("small.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(validate_file_size(&path, 1));
        assert!(!validate_file_size(&temp.path().join("missing.pdf"), 1));
    }

    #[test]
    fn test_validate_file_path() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir(&inner).unwrap();
        assert!(validate_file_path(&inner, temp.path()));
        assert!(!validate_file_path(temp.path(), &inner));
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("abc", 4), "****");
        assert_eq!(mask_sensitive_data("secretkey1234", 4), "*********1234");
    }
}

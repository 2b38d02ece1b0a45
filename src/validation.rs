//! Input validation for zone names, user-authored display strings, and data
//! files. Zone names become filenames, so the rules here are what keeps a
//! custom map from writing outside the data directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Validation errors with messages suitable for CLI output.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Zone name cannot be empty")]
    EmptyZone,

    #[error("Zone name is too long (maximum {max} characters)")]
    ZoneTooLong { max: usize },

    #[error("Zone name must contain only letters, numbers, underscore, and hyphen")]
    ZoneInvalidCharacters,

    #[error("Zone name is reserved")]
    ZoneReserved,

    #[error("Display text is too long (maximum {max} bytes)")]
    TextTooLong { max: usize },

    #[error("File size exceeds limit ({limit} bytes)")]
    FileTooLarge { limit: u64 },

    #[error("Invalid or malformed JSON document")]
    InvalidFormat,

    #[error("Invalid path or path traversal attempt")]
    InvalidPath,
}

const MAX_ZONE_NAME: usize = 50;

/// Maximum bytes accepted for POI names and descriptions. Anything longer is
/// rejected at the store boundary rather than truncated silently.
pub const MAX_DISPLAY_TEXT: usize = 1024;

/// Names that would collide with files the engine manages itself or that are
/// unsafe on common filesystems.
fn reserved_zone_names() -> HashSet<&'static str> {
    [
        "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
        "com8", "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
        ".", "..", "zones", "backups", "config", "data",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a zone name for filesystem safety. Returns the normalized
/// (lowercased) name used for the zone document filename.
pub fn validate_zone_name(zone: &str) -> Result<String, ValidationError> {
    let trimmed = zone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyZone);
    }
    if trimmed.len() > MAX_ZONE_NAME {
        return Err(ValidationError::ZoneTooLong { max: MAX_ZONE_NAME });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::ZoneInvalidCharacters);
    }

    let lower = trimmed.to_lowercase();
    if reserved_zone_names().contains(lower.as_str()) {
        return Err(ValidationError::ZoneReserved);
    }

    Ok(lower)
}

/// Generate a safe filename component from an arbitrary label using percent
/// encoding. Used for POI ids embedded in backup names and similar spots
/// where the label did not go through `validate_zone_name`.
pub fn safe_filename(label: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(label, NON_ALPHANUMERIC).to_string()
}

/// Sanitize a user-authored display string: strip control characters (keeping
/// newlines in descriptions readable via space substitution) and enforce a
/// byte cap.
pub fn sanitize_display_text(text: &str, max_bytes: usize) -> Result<String, ValidationError> {
    if text.len() > max_bytes {
        return Err(ValidationError::TextTooLong { max: max_bytes });
    }
    let sanitized: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    Ok(sanitized)
}

/// Validate a file size before reading it into memory.
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError::FileTooLarge { limit: max_size });
    }
    Ok(())
}

/// Secure path construction for zone documents.
pub fn secure_zone_path(data_dir: &Path, zone: &str) -> Result<PathBuf, ValidationError> {
    let validated = validate_zone_name(zone)?;
    let path = data_dir.join("zones").join(format!("{}.json", validated));
    if !path.starts_with(data_dir) {
        return Err(ValidationError::InvalidPath);
    }
    Ok(path)
}

/// Parse JSON with a size cap and corruption guard. Interrupted writes have
/// been observed to leave leading NUL bytes; valid JSON cannot start with a
/// NUL, so leading NULs are stripped before parsing.
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(ValidationError::FileTooLarge {
            limit: max_bytes as u64,
        });
    }
    let normalized = content.trim_start_matches('\0');
    serde_json::from_str(normalized).map_err(|_| ValidationError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name_validation() {
        assert_eq!(validate_zone_name("forest-north").unwrap(), "forest-north");
        assert_eq!(validate_zone_name("Trail_2").unwrap(), "trail_2");
        assert_eq!(validate_zone_name("  meadow  ").unwrap(), "meadow");

        assert!(validate_zone_name("").is_err());
        assert!(validate_zone_name("../etc").is_err());
        assert!(validate_zone_name("zone/subzone").is_err());
        assert!(validate_zone_name("zone with spaces").is_err());
        assert!(validate_zone_name(&"z".repeat(60)).is_err());

        assert!(validate_zone_name("con").is_err());
        assert!(validate_zone_name("zones").is_err());
        assert!(validate_zone_name("Backups").is_err());
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("oak"), "oak");
        assert_eq!(safe_filename("old oak"), "old%20oak");
        assert!(!safe_filename("a/b").contains('/'));
        assert_ne!(safe_filename("../x"), "../x");
    }

    #[test]
    fn test_display_text_sanitization() {
        assert_eq!(
            sanitize_display_text("A tall oak", 100).unwrap(),
            "A tall oak"
        );
        assert_eq!(
            sanitize_display_text("line1\nline2\tend", 100).unwrap(),
            "line1 line2 end"
        );
        assert_eq!(
            sanitize_display_text("Hi\x00\x01there", 100).unwrap(),
            "Hithere"
        );
        assert!(sanitize_display_text(&"a".repeat(200), 100).is_err());
    }

    #[test]
    fn test_secure_zone_path() {
        let dir = Path::new("/tmp/wildtales-data");
        let path = secure_zone_path(dir, "forest").unwrap();
        assert!(path.ends_with("zones/forest.json"));
        assert!(secure_zone_path(dir, "../escape").is_err());
    }

    #[test]
    fn test_secure_json_parse() {
        let ok: Vec<u32> = secure_json_parse("[1,2,3]", 100).unwrap();
        assert_eq!(ok, vec![1, 2, 3]);

        // Leading NULs from an interrupted write are tolerated.
        let ok: Vec<u32> = secure_json_parse("\0\0[4]", 100).unwrap();
        assert_eq!(ok, vec![4]);

        assert!(secure_json_parse::<Vec<u32>>("not json", 100).is_err());
        assert!(secure_json_parse::<Vec<u32>>("[1]", 1).is_err());
    }
}

//! Schema versioning for wire types.
//!
//! All JSON emitted by sw-core (reports, history entries, structured errors)
//! carries this version so downstream consumers can detect contract changes.

/// Current wire schema version.
///
/// Bump the minor version for additive changes, the major version for
/// breaking changes to field names or semantics.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_is_semver() {
        let parts: Vec<&str> = SCHEMA_VERSION.split('.').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            assert!(part.parse::<u32>().is_ok());
        }
    }
}

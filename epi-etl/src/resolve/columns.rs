//! Best-effort resolution of semantic column roles from unpredictable source
//! schemas.
//!
//! All matching heuristics live in one versioned alias table instead of
//! being scattered across call sites. Matching is deliberately conservative:
//! a column either equals a documented alias or contains a documented token;
//! arbitrary synonyms stay unmatched and the caller treats the role as
//! unavailable.

use once_cell::sync::Lazy;

/// Semantic roles a raw column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Location,
    Date,
    Cases,
    Deaths,
}

struct RoleAliases {
    role: ColumnRole,
    /// Lowercased names a column may equal exactly.
    exact: &'static [&'static str],
    /// Lowercased substrings tried only when no exact alias matched.
    tokens: &'static [&'static str],
}

static ROLE_TABLE: Lazy<Vec<RoleAliases>> = Lazy::new(|| {
    vec![
        RoleAliases {
            role: ColumnRole::Location,
            exact: &["location", "country", "entity"],
            tokens: &["country", "location", "nation"],
        },
        RoleAliases {
            role: ColumnRole::Date,
            exact: &["date", "day"],
            tokens: &["date", "time"],
        },
        RoleAliases {
            role: ColumnRole::Cases,
            exact: &["cases"],
            tokens: &["cases", "confirm", "positive"],
        },
        RoleAliases {
            role: ColumnRole::Deaths,
            exact: &["deaths"],
            tokens: &["death"],
        },
    ]
});

/// Find the column playing `role`, if any.
///
/// Two passes over the columns in their original order: exact alias equality
/// first, then substring containment. The first matching column wins, so
/// ties break on column order. `None` means the field is unavailable in this
/// source, never an error.
pub fn resolve_role<'a>(columns: &'a [String], role: ColumnRole) -> Option<&'a str> {
    let aliases = ROLE_TABLE
        .iter()
        .find(|entry| entry.role == role)?;

    for column in columns {
        let lowered = column.to_lowercase();
        if aliases.exact.iter().any(|alias| lowered == *alias) {
            return Some(column.as_str());
        }
    }

    for column in columns {
        let lowered = column.to_lowercase();
        if aliases.tokens.iter().any(|token| lowered.contains(token)) {
            return Some(column.as_str());
        }
    }

    None
}

/// Index variant of [`resolve_role`], for callers that address row fields
/// positionally.
pub fn resolve_role_index(columns: &[String], role: ColumnRole) -> Option<usize> {
    let name = resolve_role(columns, role)?;
    columns.iter().position(|c| c == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_alias_beats_token_match() {
        // "Reporting_Country" contains the token, but "location" is an exact alias
        let columns = cols(&["Reporting_Country", "location"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Location), Some("location"));
    }

    #[test]
    fn test_exact_alias_is_case_insensitive() {
        let columns = cols(&["Country", "Whatever"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Location), Some("Country"));
    }

    #[test]
    fn test_token_fallback() {
        let columns = cols(&["Reported_Date", "Confirmed"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Date), Some("Reported_Date"));
        assert_eq!(resolve_role(&columns, ColumnRole::Cases), Some("Confirmed"));
    }

    #[test]
    fn test_first_column_wins_ties() {
        let columns = cols(&["country_a", "country_b"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Location), Some("country_a"));
    }

    #[test]
    fn test_no_match_is_none() {
        let columns = cols(&["foo", "bar"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Location), None);
        assert_eq!(resolve_role(&columns, ColumnRole::Date), None);
        assert_eq!(resolve_role(&columns, ColumnRole::Deaths), None);
    }

    #[test]
    fn test_fatal_does_not_match_deaths() {
        // Only documented aliases match, not arbitrary synonyms
        let columns = cols(&["Fatal"]);
        assert_eq!(resolve_role(&columns, ColumnRole::Deaths), None);
    }

    #[test]
    fn test_resolve_role_index() {
        let columns = cols(&["Confirmed", "Reported_Date", "Country"]);
        assert_eq!(resolve_role_index(&columns, ColumnRole::Location), Some(2));
        assert_eq!(resolve_role_index(&columns, ColumnRole::Date), Some(1));
        assert_eq!(resolve_role_index(&columns, ColumnRole::Cases), Some(0));
    }
}

//! Input hygiene for SOQL strings and record ids.
//!
//! Fixture emails come from test code and lead data comes from another org, so
//! every value interpolated into SOQL goes through [`soql::escape_string`] and
//! every id placed in a URL is checked with [`ids::is_valid_salesforce_id`].

/// SOQL escaping.
pub mod soql {
    /// Escape a value for a single-quoted SOQL string literal.
    ///
    /// ```rust
    /// use leadsync_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("o'neil@test.com"), "o\\'neil@test.com");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Field and SObject names: ASCII letter first, then letters, digits or `_`.
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    /// Join field names into a SELECT list, or `None` if any name is unsafe.
    #[must_use]
    pub fn select_list(fields: &[&str]) -> Option<String> {
        if fields.is_empty() || !fields.iter().all(|f| is_safe_field_name(f)) {
            return None;
        }
        Some(fields.join(", "))
    }
}

/// Record id checks.
pub mod ids {
    /// 15 or 18 ASCII alphanumerics.
    ///
    /// ```rust
    /// use leadsync_client::security::ids;
    ///
    /// assert!(ids::is_valid_salesforce_id("00Q5g00000ABCDEFGH"));
    /// assert!(!ids::is_valid_salesforce_id("00Q/../../x"));
    /// ```
    #[must_use]
    pub fn is_valid_salesforce_id(id: &str) -> bool {
        matches!(id.len(), 15 | 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

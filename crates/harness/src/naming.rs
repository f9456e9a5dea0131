//! Unique fixture names.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use rand::Rng;

/// Domain used for fixture Emails.
pub const FIXTURE_EMAIL_DOMAIN: &str = "test.com";

const SUFFIX_SPACE: u32 = 0x100_0000;

/// Random per process, so parallel runs diverge.
static SUFFIX_BASE: LazyLock<u32> = LazyLock::new(|| rand::rng().random_range(0..SUFFIX_SPACE));

/// Advances per name, so names from one process never repeat.
static SUFFIX_SEQ: AtomicU32 = AtomicU32::new(0);

/// `prefix + template + epoch millis + 6 hex chars`.
pub fn build_unique_name(template: &str, prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SUFFIX_SEQ.fetch_add(1, Ordering::Relaxed);
    let suffix = SUFFIX_BASE.wrapping_add(seq) % SUFFIX_SPACE;
    format!("{prefix}{template}{millis}{suffix:06x}")
}

/// `<unique name>@test.com`
pub fn unique_email(template: &str, prefix: &str) -> String {
    format!(
        "{}@{}",
        build_unique_name(template, prefix),
        FIXTURE_EMAIL_DOMAIN
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shape() {
        let name = build_unique_name("sfdc2sfdc-lead-sync", "a1.");
        assert!(name.starts_with("a1.sfdc2sfdc-lead-sync"));
        let tail = &name["a1.sfdc2sfdc-lead-sync".len()..];
        assert!(tail.len() >= 13 + 6);
        assert!(tail.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_names_do_not_collide() {
        let names: HashSet<String> = (0..5000)
            .map(|_| build_unique_name("tmpl", "b."))
            .collect();
        assert_eq!(names.len(), 5000);
    }

    #[test]
    fn test_unique_email() {
        let email = unique_email("tmpl", "a2.");
        assert!(email.starts_with("a2.tmpl"));
        assert!(email.ends_with("@test.com"));
        assert_eq!(email.matches('@').count(), 1);
    }
}

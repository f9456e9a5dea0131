//! Checks that source fixtures arrived in the target org.

use leadsync_flow::{Lead, LeadField, LeadStore};
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};

/// Fields compared when none are given.
pub const DEFAULT_FIELDS: &[LeadField] = &[LeadField::Email];

/// Look `expected` up in `target` by Email and compare `fields`.
///
/// Returns the target's copy of the lead.
#[instrument(skip(target, expected), fields(email = %expected.email))]
pub async fn assert_synced<T: LeadStore>(
    target: &T,
    expected: &Lead,
    fields: &[LeadField],
) -> Result<Lead> {
    let actual = target
        .find_by_email(&expected.email)
        .await?
        .ok_or_else(|| {
            Error::new(ErrorKind::NotSynced {
                email: expected.email.clone(),
            })
        })?;

    compare_fields(expected, &actual, fields)?;
    debug!(id = ?actual.id, "Lead present in target");
    Ok(actual)
}

/// Assert every lead in `expected`, stopping at the first failure.
pub async fn assert_all_synced<T: LeadStore>(
    target: &T,
    expected: &[Lead],
    fields: &[LeadField],
) -> Result<Vec<Lead>> {
    let mut found = Vec::with_capacity(expected.len());
    for lead in expected {
        found.push(assert_synced(target, lead, fields).await?);
    }
    Ok(found)
}

/// First field whose value differs between the two leads.
pub fn compare_fields(expected: &Lead, actual: &Lead, fields: &[LeadField]) -> Result<()> {
    for &field in fields {
        let want = expected.field(field);
        let got = actual.field(field);
        if want != got {
            return Err(Error::new(ErrorKind::FieldMismatch {
                email: expected.email.clone(),
                field: field.api_name().to_string(),
                expected: want.map(str::to_string),
                actual: got.map(str::to_string),
            }));
        }
    }
    Ok(())
}

//! Lead record, its builder, and per-record save results.

use chrono::{DateTime, Utc};
use leadsync_client::security::ids::is_valid_salesforce_id;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Lead fields read from and written to the orgs.
pub const LEAD_FIELDS: &[&str] = &[
    "Id",
    "Email",
    "FirstName",
    "LastName",
    "Country",
    "Company",
    "LastModifiedDate",
];

/// A Lead as stored in either org.
///
/// Serialized with Salesforce field names. `id` and `last_modified_date` are
/// assigned by the store and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "Id", default, skip_serializing)]
    pub id: Option<String>,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(
        rename = "FirstName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Country", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(
        rename = "LastModifiedDate",
        default,
        deserialize_with = "deserialize_sf_datetime",
        skip_serializing
    )]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn builder() -> LeadBuilder {
        LeadBuilder::default()
    }

    /// Value of a synchronised field by its Salesforce name.
    pub fn field(&self, field: LeadField) -> Option<&str> {
        match field {
            LeadField::Email => Some(&self.email),
            LeadField::FirstName => self.first_name.as_deref(),
            LeadField::LastName => Some(&self.last_name),
            LeadField::Country => self.country.as_deref(),
            LeadField::Company => Some(&self.company),
        }
    }

    /// Assign the id returned by a create call.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if !is_valid_salesforce_id(&id) {
            return Err(Error::new(ErrorKind::InvalidLead(format!(
                "'{id}' is not a Salesforce id"
            ))));
        }
        self.id = Some(id);
        Ok(())
    }
}

/// Synchronised Lead fields that can be compared after a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Email,
    FirstName,
    LastName,
    Country,
    Company,
}

impl LeadField {
    pub const ALL: [LeadField; 5] = [
        LeadField::Email,
        LeadField::FirstName,
        LeadField::LastName,
        LeadField::Country,
        LeadField::Company,
    ];

    pub fn api_name(&self) -> &'static str {
        match self {
            LeadField::Email => "Email",
            LeadField::FirstName => "FirstName",
            LeadField::LastName => "LastName",
            LeadField::Country => "Country",
            LeadField::Company => "Company",
        }
    }
}

impl std::fmt::Display for LeadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Validating builder for [`Lead`].
///
/// ```
/// use leadsync_flow::Lead;
///
/// let lead = Lead::builder()
///     .email("a1.jdoe@test.com")
///     .first_name("FirstName1")
///     .last_name("LastName1")
///     .country("California")
///     .company("Not so good one Ltd.")
///     .build()
///     .unwrap();
/// assert!(lead.id.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LeadBuilder {
    id: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    country: Option<String>,
    company: Option<String>,
    last_modified_date: Option<DateTime<Utc>>,
}

impl LeadBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn last_modified_date(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified_date = Some(at);
        self
    }

    pub fn build(self) -> Result<Lead> {
        let email = self.email.unwrap_or_default();
        validate_email(&email)?;

        let last_name = required(self.last_name, "LastName")?;
        let company = required(self.company, "Company")?;

        if let Some(ref id) = self.id {
            if !is_valid_salesforce_id(id) {
                return Err(Error::new(ErrorKind::InvalidLead(format!(
                    "'{id}' is not a Salesforce id"
                ))));
            }
        }

        Ok(Lead {
            id: self.id,
            email,
            first_name: self.first_name,
            last_name,
            country: self.country,
            company,
            last_modified_date: self.last_modified_date,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::new(ErrorKind::InvalidLead(format!(
            "{field} is required"
        )))),
    }
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::InvalidLead(format!(
            "'{email}' is not an email address"
        ))))
    }
}

/// Salesforce writes `2024-01-15T10:30:00.000+0000`, which is not RFC 3339.
fn deserialize_sf_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(&raw))
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(serde::de::Error::custom)
}

/// Format a timestamp as a SOQL datetime literal.
pub fn soql_datetime(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Outcome of one record in a create, update or delete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

impl SaveResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(status_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            success: false,
            errors: vec![SaveError {
                status_code: status_code.into(),
                message: message.into(),
                fields: Vec::new(),
            }],
        }
    }

    /// First error message, or a generic one for unsuccessful results without errors.
    pub fn error_message(&self) -> Option<String> {
        if self.success {
            return None;
        }
        Some(
            self.errors
                .first()
                .map(|e| format!("{}: {}", e.status_code, e.message))
                .unwrap_or_else(|| "record was not saved".to_string()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

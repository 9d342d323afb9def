//! Id-or-value references for people and their contact details.
//!
//! An order names its buyer and recipient either by pointing at an existing
//! row (`{"id": 7}`) or by supplying a value that is created or reused
//! (`{"name": "Budi"}`, `{"value": "0812..."}`). Each reference is a two-variant
//! enum so resolution is a single `match` rather than probing optional fields.
//!
//! On the wire a reference carries exactly one of its two keys. A body with
//! both (`{"id": 7, "name": "Budi"}`) or neither is rejected instead of
//! silently picking one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::PersonId;
use super::name::PersonName;

/// Errors raised when a reference carries both or neither of its keys.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("expected either `{0}` or `{1}`, not both")]
    Ambiguous(&'static str, &'static str),
    #[error("expected `{0}` or `{1}`")]
    Missing(&'static str, &'static str),
}

fn exactly_one<A, B>(
    keys: (&'static str, &'static str),
    existing: Option<A>,
    new: Option<B>,
) -> Result<Result<A, B>, ReferenceError> {
    match (existing, new) {
        (Some(a), None) => Ok(Ok(a)),
        (None, Some(b)) => Ok(Err(b)),
        (Some(_), Some(_)) => Err(ReferenceError::Ambiguous(keys.0, keys.1)),
        (None, None) => Err(ReferenceError::Missing(keys.0, keys.1)),
    }
}

/// Reference to a person: an existing row by id, or a name to upsert.
///
/// Unknown keys are tolerated because the reference is flattened into a
/// party object that also carries `phone` and `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawPersonRef")]
pub enum PersonRef {
    /// A person that must already exist.
    Existing {
        /// Person row id.
        id: PersonId,
    },
    /// A person resolved by unique name, created on first use.
    New {
        /// Exact (case-sensitive) person name.
        name: PersonName,
    },
}

#[derive(Deserialize)]
struct RawPersonRef {
    id: Option<PersonId>,
    name: Option<PersonName>,
}

impl TryFrom<RawPersonRef> for PersonRef {
    type Error = ReferenceError;

    fn try_from(raw: RawPersonRef) -> Result<Self, Self::Error> {
        Ok(match exactly_one(("id", "name"), raw.id, raw.name)? {
            Ok(id) => Self::Existing { id },
            Err(name) => Self::New { name },
        })
    }
}

impl PersonRef {
    /// The name carried by a `New` reference.
    #[must_use]
    pub const fn name(&self) -> Option<&PersonName> {
        match self {
            Self::Existing { .. } => None,
            Self::New { name } => Some(name),
        }
    }
}

/// Reference to a phone number or address belonging to a person.
///
/// `Id` is the contact kind's id type ([`PhoneId`](super::PhoneId) or
/// [`AddressId`](super::AddressId)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    untagged,
    try_from = "RawContactRef<Id>",
    bound(deserialize = "Id: Deserialize<'de>")
)]
pub enum ContactRef<Id> {
    /// An existing contact row, which must belong to the resolved person.
    Existing {
        /// Contact row id.
        id: Id,
    },
    /// A contact value that becomes the person's preferred one.
    New {
        /// Raw phone number or address text.
        value: String,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContactRef<Id> {
    id: Option<Id>,
    value: Option<String>,
}

impl<Id> TryFrom<RawContactRef<Id>> for ContactRef<Id> {
    type Error = ReferenceError;

    fn try_from(raw: RawContactRef<Id>) -> Result<Self, Self::Error> {
        Ok(match exactly_one(("id", "value"), raw.id, raw.value)? {
            Ok(id) => Self::Existing { id },
            Err(value) => Self::New { value },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PhoneId;

    #[test]
    fn test_person_ref_by_id() {
        let parsed: PersonRef = serde_json::from_str(r#"{"id": 999}"#).unwrap();
        assert_eq!(
            parsed,
            PersonRef::Existing {
                id: PersonId::new(999)
            }
        );
        assert!(parsed.name().is_none());
    }

    #[test]
    fn test_person_ref_by_name() {
        let parsed: PersonRef = serde_json::from_str(r#"{"name": "Budi"}"#).unwrap();
        assert_eq!(parsed.name().map(PersonName::as_str), Some("Budi"));
    }

    #[test]
    fn test_person_ref_rejects_empty_name() {
        assert!(serde_json::from_str::<PersonRef>(r#"{"name": "   "}"#).is_err());
        assert!(serde_json::from_str::<PersonRef>(r"{}").is_err());
    }

    #[test]
    fn test_contact_ref_variants() {
        let existing: ContactRef<PhoneId> = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(existing, ContactRef::Existing { id: PhoneId::new(3) });

        let new: ContactRef<PhoneId> =
            serde_json::from_str(r#"{"value": "08123456789"}"#).unwrap();
        assert_eq!(
            new,
            ContactRef::New {
                value: "08123456789".to_owned()
            }
        );
    }

    #[test]
    fn test_person_ref_rejects_both_keys() {
        let err = serde_json::from_str::<PersonRef>(r#"{"id": 7, "name": "Budi"}"#).unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_person_ref_ignores_sibling_keys() {
        let parsed: PersonRef =
            serde_json::from_str(r#"{"id": 7, "phone": {"value": "0812"}}"#).unwrap();
        assert_eq!(parsed, PersonRef::Existing { id: PersonId::new(7) });
    }

    #[test]
    fn test_contact_ref_rejects_ambiguous_and_unknown_keys() {
        let parse = serde_json::from_str::<ContactRef<PhoneId>>;
        assert!(parse(r#"{"id": 3, "value": "0812"}"#).is_err());
        assert!(parse(r"{}").is_err());
        assert!(parse(r#"{"number": "0812"}"#).is_err());
    }

    #[test]
    fn test_references_serialize_with_one_key() {
        let json = serde_json::to_value(PersonRef::Existing { id: PersonId::new(4) }).unwrap();
        assert_eq!(json, serde_json::json!({"id": 4}));
    }
}

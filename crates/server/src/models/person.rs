//! People and their contact details.

use serde::{Deserialize, Serialize};

use oven_order_core::{AddressId, PersonId, PersonName, PhoneId};

/// A buyer or recipient. Names are unique across all persons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Unique person ID.
    pub id: PersonId,
    /// Unique, case-sensitive name.
    pub name: PersonName,
}

/// A phone number belonging to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    /// Unique phone ID.
    pub id: PhoneId,
    /// Owning person.
    pub person_id: PersonId,
    /// Phone number as entered.
    pub phone_number: String,
    /// Whether this is the person's preferred number.
    pub is_preferred: bool,
}

/// A delivery address belonging to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Owning person.
    pub person_id: PersonId,
    /// Address text as entered.
    pub address: String,
    /// Whether this is the person's preferred address.
    pub is_preferred: bool,
}

//! Domain models for order capture.
//!
//! Row-shaped structs returned by the storage gateway plus the request and
//! response shapes of the order API.

pub mod item;
pub mod order;
pub mod person;

pub use item::{Item, ItemSnapshot};
pub use order::{
    CreateOrderInput, NewOrder, NewOrderItem, OrderDetail, OrderLine, OrderLineInput,
    PartyInput, PartySnapshot, ReferenceData,
};
pub use person::{Address, Person, Phone};

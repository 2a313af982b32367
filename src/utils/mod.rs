pub mod address_validator;

pub use address_validator::{short_address, AddressValidator};

mod addresses;
mod message;

pub use addresses::{
    Addresses, AddressesError, ADDRESSES_PREFIX, ADDRESSES_SUFFIX, ALL_DONE, ENTRY_DELIMITER,
};
pub use message::{Message, MessageError, DONE_TAG, REGISTER_TAG, SEPARATOR};

//! Request extractors: credentials, id ranges and transport security.

pub mod credentials;
pub mod range;
pub mod transport;

pub use credentials::{decipher_credentials, Credentials};
pub use range::RangeIds;
pub use transport::Transport;

//! This is a library that records where a tracked item was last seen. A phone
//! reports its position, the position is kept in one of several storage
//! backends, and the server's address can be printed as a QR code so that the
//! phone can find it.

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub mod error;
pub mod location;
pub mod net;
pub mod qr;
pub mod storage;

pub use error::Error;
pub use error::Result;
pub use location::{Coordinate, LastKnown, Location, LocationUpdate};

/// Deserialize an optional value from a string field, treating an empty string
/// the same as a missing one. Useful for html forms and query strings.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s)
            .map_err(serde::de::Error::custom)
            .map(Some),
    }
}

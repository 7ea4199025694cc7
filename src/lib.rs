use std::io;

use tracing::warn;

pub mod airway;
pub mod coordinate;
pub mod error;
pub mod info;
pub mod line;
pub mod locations;
pub mod records;
pub mod sct;
pub mod section;

pub use error::{ParseError, ParseErrorKind, ParseErrors, SctError};
pub use sct::{ParseSettings, Sct, SctResult};

fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

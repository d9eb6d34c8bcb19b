//! Field checks applied to records before they are written.
//!
//! Lengths are counted in characters, matching the `VARCHAR(n)` sizes of the
//! tables the records are stored in.

use crate::{Error, Result};

/// Reject empty or whitespace-only values.
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation_field(field, "This field is required."));
    }
    Ok(())
}

/// Reject values longer than `max` characters.
pub fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::validation_field(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        ));
    }
    Ok(())
}

/// Shorthand for [`require`] followed by [`max_len`].
pub fn required_max_len(field: &str, value: &str, max: usize) -> Result<()> {
    require(field, value)?;
    max_len(field, value, max)
}

/// Accept `xx:xx:xx:xx:xx:xx` or `xx-xx-xx-xx-xx-xx` with hex digits.
pub fn mac_address(field: &str, value: &str) -> Result<()> {
    if is_mac_address(value) {
        Ok(())
    } else {
        Err(Error::validation_field(
            field,
            format!("'{value}' is not a valid MAC address."),
        ))
    }
}

/// Lowercase, `:`-separated form of a valid MAC address. Anything else is
/// returned unchanged for [`mac_address`] to reject.
pub fn canonical_mac(value: &str) -> String {
    if is_mac_address(value) {
        value.to_ascii_lowercase().replace('-', ":")
    } else {
        value.to_string()
    }
}

fn is_mac_address(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    let sep = bytes[2];
    if sep != b':' && sep != b'-' {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i % 3 == 2 {
            *b == sep
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

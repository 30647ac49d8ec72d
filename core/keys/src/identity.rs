//! Best-effort capture of the local user and host names.
//!
//! These values are stored in key records for auditing only. Lookup failures
//! are not errors; the field is left empty.

use tracing::debug;

/// Name of the current user, or an empty string.
pub fn current_username() -> String {
    ["USER", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| {
            debug!("Unable to determine current user name");
            String::new()
        })
}

/// Name of the local host, or an empty string.
pub fn current_hostname() -> String {
    match hostname::get().map(|h| h.into_string()) {
        Ok(Ok(name)) => name,
        _ => {
            debug!("Unable to determine host name");
            String::new()
        }
    }
}

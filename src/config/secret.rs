//! Secret values held by the installation configuration
//!
//! Passwords are generated once per resolution and never change afterwards.
//! The wrapper keeps them out of debug output and wipes the buffer on drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

const MASK: &str = "********";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Plain-text value, for templates and child processes only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn masked() -> &'static str {
        MASK
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({MASK})")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

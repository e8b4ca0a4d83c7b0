//! Strongly-typed identifiers for orders and instruments.
//!
//! These prevent mixing up the caller-assigned client order id with the
//! venue-assigned order id.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    ClientOrderId,
    "Caller-assigned order identifier correlating a request, its acknowledgement and its reports."
);
define_id!(VenueOrderId, "Venue-assigned identifier for an order.");
define_id!(Symbol, "Instrument identifier on the venue (e.g. `XBTUSD`).");

impl ClientOrderId {
    /// Short form used in task names and log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(10)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_order_id_new_and_display() {
        let id = ClientOrderId::new("mlk_0001");
        assert_eq!(id.as_str(), "mlk_0001");
        assert_eq!(format!("{id}"), "mlk_0001");
    }

    #[test]
    fn client_order_id_generate_is_unique() {
        assert_ne!(ClientOrderId::generate(), ClientOrderId::generate());
    }

    #[test]
    fn short_truncates_long_ids() {
        let id = ClientOrderId::new("abcdefghijklmnop");
        assert_eq!(id.short(), "abcdefghij");
        assert_eq!(ClientOrderId::new("abc").short(), "abc");
    }

    #[test]
    fn serde_is_transparent() {
        let id = VenueOrderId::new("ord-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-123\"");
    }
}

//! Strongly-typed identifier value objects.
//!
//! Every identifier in this domain is issued by someone else (the app's
//! account system or one of the billing providers), so they are opaque
//! strings rather than UUIDs we mint ourselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning error if blank.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of an app user (the provider's app-user/customer reference).
    UserId,
    "user_id"
);

string_id!(
    /// Identifier of a wish (the post that gifts and boosts target).
    WishId,
    "wish_id"
);

string_id!(
    /// Provider-scoped event identifier used as the idempotency key.
    EventId,
    "event_id"
);

string_id!(
    /// Card-provider checkout session identifier.
    CheckoutSessionId,
    "session_id"
);

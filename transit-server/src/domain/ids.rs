//! Feed identifier types.

use std::borrow::Borrow;
use std::fmt;

/// Error returned when constructing an identifier from a blank string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: must not be blank")]
pub struct InvalidId {
    kind: &'static str,
}

impl InvalidId {
    /// The kind of identifier that was rejected (e.g. "stop id").
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Declares an opaque, non-blank string identifier.
///
/// GTFS identifiers carry no structure we can validate beyond being present,
/// so each id type only guarantees that it is not empty or whitespace.
macro_rules! feed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a ", $kind, ", rejecting blank strings.")]
            pub fn new(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                if s.trim().is_empty() {
                    return Err(InvalidId { kind: $kind });
                }
                Ok($name(s))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

feed_id!(
    /// Identifier of a route (`route_id`).
    ///
    /// ```
    /// use transit_server::domain::RouteId;
    ///
    /// let id = RouteId::new("N").unwrap();
    /// assert_eq!(id.as_str(), "N");
    /// assert!(RouteId::new("  ").is_err());
    /// ```
    RouteId,
    "route id"
);

feed_id!(
    /// Identifier of a stop (`stop_id`).
    StopId,
    "stop id"
);

feed_id!(
    /// Identifier of a trip (`trip_id`).
    TripId,
    "trip id"
);

feed_id!(
    /// Identifier of a shape polyline (`shape_id`).
    ShapeId,
    "shape id"
);

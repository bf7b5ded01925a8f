//! Newtype wrappers for the identifiers the layout engine juggles.
//!
//! Blocks, figures, documents and typesetting classes are all keyed by strings
//! in the host document; wrapping them keeps a figure id from being looked up
//! in the block map by accident.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                Self(s.as_str().into())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
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
    /// Identity of a text-bearing block (paragraph, heading, table).
    BlockId
);

string_id!(
    /// Identity of a figure, as used by the link targets that reference it.
    FigureId
);

string_id!(
    /// Identity of the article being rendered. Persisted overrides only
    /// carry over between renders that share it.
    DocumentId
);

string_id!(
    /// Name of a figure placement variant ("float", "inset", "overmargin", ...).
    ///
    /// The set of valid names comes from the model spec, so this is an open
    /// string rather than an enum.
    TypesettingClass
);

impl TypesettingClass {
    /// The token used in constellation keys when no class is present.
    pub const NONE_TOKEN: &'static str = "false";

    /// Renders an optional class as a constellation key segment.
    pub fn key_segment(class: Option<&TypesettingClass>) -> &str {
        class.map(|c| c.as_str()).unwrap_or(Self::NONE_TOKEN)
    }
}

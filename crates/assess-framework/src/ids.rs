//! Identifier newtypes for framework nodes

/// Declares a string-backed identifier newtype with serde, display and
/// conversion impls.
#[macro_export]
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create identifier from any string-like value
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Framework identifier
    FrameworkId
);
string_id!(
    /// Section identifier, unique within its framework
    SectionId
);
string_id!(
    /// Category identifier, unique within its section
    CategoryId
);
string_id!(
    /// Question identifier, unique across the whole framework
    QuestionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_conversions() {
        let id = QuestionId::from("q-1");
        assert_eq!(id.to_string(), "q-1");
        assert_eq!(id.as_str(), "q-1");
        assert_eq!(id, QuestionId::new(String::from("q-1")));
    }

    #[test]
    fn serializes_transparently() {
        let id = SectionId::new("gov");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gov\"");
        let back: SectionId = serde_json::from_str("\"gov\"").unwrap();
        assert_eq!(back, id);
    }
}

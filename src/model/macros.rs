/// Generate `as_str`, `Display`, `From<T> for String`, and `TryFrom<String> for T`
/// for a closed enum (unknown strings return an error).
///
/// The enum must already have its definition with derives. This macro only adds
/// the conversion impls. Add `#[serde(into = "String", try_from = "String")]` to
/// the enum to get automatic Serialize/Deserialize via these impls.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $name::parse(&s).ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }

        impl $name {
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($str => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Generate a typed record identifier wrapping [`RecordId`](crate::model::RecordId).
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $crate::model::RecordId);

        impl $name {
            pub fn provisional(local: u64) -> Self {
                Self($crate::model::RecordId::Provisional(local))
            }

            pub fn persisted(id: u64) -> Self {
                Self($crate::model::RecordId::Persisted(id))
            }

            pub fn is_provisional(self) -> bool {
                self.0.is_provisional()
            }

            /// Durable identity, if this record has been persisted.
            pub fn durable(self) -> Option<u64> {
                self.0.durable()
            }

            pub fn to_signed(self) -> i64 {
                self.0.to_signed()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Colour {
        Red,
        Green,
    }

    string_enum!(Colour {
        Red => "red",
        Green => "green",
    });

    #[test]
    fn string_enum_round_trips() {
        assert_eq!(Colour::Red.as_str(), "red");
        assert_eq!(Colour::Green.to_string(), "green");
        assert_eq!(Colour::try_from("green".to_string()), Ok(Colour::Green));
        assert!(Colour::try_from("blue".to_string()).is_err());
    }
}

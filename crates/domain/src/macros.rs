//! Display/FromStr generation for closed string-coded enums
//!
//! Permissions and similar enums are persisted and exchanged by their
//! codename. This macro keeps the codename table in one place.
//!
//! # Example
//!
//! ```rust
//! use opcal_domain::impl_codename_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Audience {
//!     Public,
//!     Members,
//! }
//!
//! impl_codename_conversions!(Audience {
//!     Public => "public",
//!     Members => "members",
//! });
//!
//! assert_eq!(Audience::Members.to_string(), "members");
//! assert_eq!("PUBLIC".parse::<Audience>(), Ok(Audience::Public));
//! ```

/// Implements `Display` and `FromStr` for an enum from a codename table.
///
/// Parsing is case-insensitive; output is always the codename as written.
#[macro_export]
macro_rules! impl_codename_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

//! Operation names and positional arguments.
//!
//! Every callable action is addressed by a namespaced name of the form
//! `namespace:verb`, e.g. `ui:handleMinimizeApp`. Arguments travel as a
//! positional list of JSON-compatible values and are decoded into the
//! handler's argument tuple through [`FromArgs`].
//!
//! # Example
//!
//! ```
//! use shellwire::operation::{FromArgs, OperationName};
//! use serde_json::json;
//!
//! let name: OperationName = "ui:handleThemeChange".parse().unwrap();
//! assert_eq!(name.namespace(), "ui");
//! assert_eq!(name.verb(), "handleThemeChange");
//!
//! let (visible,): (bool,) = FromArgs::from_args(vec![json!(true)]).unwrap();
//! assert!(visible);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, ShellwireError};

/// Separator between namespace and verb.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Positional invocation arguments.
pub type Args = Vec<Value>;

/// A validated `namespace:verb` operation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationName {
    full: String,
    split: usize,
}

impl OperationName {
    /// Build a name from its namespace and verb.
    pub fn new(namespace: &str, verb: &str) -> Result<Self> {
        let full = format!("{namespace}{NAMESPACE_SEPARATOR}{verb}");
        if !is_valid_segment(namespace) || !is_valid_segment(verb) {
            return Err(ShellwireError::InvalidOperationName(full));
        }
        Ok(Self {
            split: namespace.len(),
            full,
        })
    }

    /// Owning subsystem, e.g. `ui`.
    pub fn namespace(&self) -> &str {
        &self.full[..self.split]
    }

    /// Action within the namespace, e.g. `handleMinimizeApp`.
    pub fn verb(&self) -> &str {
        &self.full[self.split + 1..]
    }

    /// Full `namespace:verb` form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c == NAMESPACE_SEPARATOR || c.is_whitespace())
}

impl FromStr for OperationName {
    type Err = ShellwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(NAMESPACE_SEPARATOR) {
            Some((namespace, verb)) => Self::new(namespace, verb),
            None => Err(ShellwireError::InvalidOperationName(s.to_string())),
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl AsRef<str> for OperationName {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

impl Serialize for OperationName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

impl<'de> Deserialize<'de> for OperationName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Conversion from positional arguments into a handler's typed input.
///
/// Implemented for `()` and tuples of up to four deserializable values.
/// A missing argument is decoded from `null`, so `Option<T>` parameters may
/// be omitted by the caller. Surplus trailing arguments are ignored.
pub trait FromArgs: Sized + Send + 'static {
    /// Decode the handler input from positional arguments.
    fn from_args(args: Args) -> Result<Self>;
}

impl FromArgs for () {
    fn from_args(_args: Args) -> Result<Self> {
        Ok(())
    }
}

fn decode_arg<T: DeserializeOwned>(value: Option<Value>, index: usize) -> Result<T> {
    let present = value.is_some();
    serde_json::from_value(value.unwrap_or(Value::Null)).map_err(|e| {
        if present {
            ShellwireError::InvalidArguments(format!("argument {index}: {e}"))
        } else {
            ShellwireError::InvalidArguments(format!("missing argument {index}"))
        }
    })
}

macro_rules! impl_from_args {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty),+> FromArgs for ($($ty,)+)
        where
            $($ty: DeserializeOwned + Send + 'static),+
        {
            fn from_args(args: Args) -> Result<Self> {
                let mut args = args.into_iter();
                Ok(($(decode_arg::<$ty>(args.next(), $idx)?,)+))
            }
        }
    };
}

impl_from_args!(A => 0);
impl_from_args!(A => 0, B => 1);
impl_from_args!(A => 0, B => 1, C => 2);
impl_from_args!(A => 0, B => 1, C => 2, D => 3);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operation_name() {
        let name: OperationName = "ui:handleMinimizeApp".parse().unwrap();
        assert_eq!(name.namespace(), "ui");
        assert_eq!(name.verb(), "handleMinimizeApp");
        assert_eq!(name.as_str(), "ui:handleMinimizeApp");
        assert_eq!(name, OperationName::new("ui", "handleMinimizeApp").unwrap());
    }

    #[test]
    fn test_reject_malformed_names() {
        for bad in ["handleMinimizeApp", ":verb", "ui:", "ui:a:b", "u i:verb", ""] {
            assert!(
                matches!(
                    bad.parse::<OperationName>(),
                    Err(ShellwireError::InvalidOperationName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_name_serializes_as_string() {
        let name = OperationName::new("ui", "handleCloseApp").unwrap();
        let value = serde_json::to_value(&name).unwrap();
        assert_eq!(value, json!("ui:handleCloseApp"));

        let back: OperationName = serde_json::from_value(value).unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_value::<OperationName>(json!("nope")).is_err());
    }

    #[test]
    fn test_unit_ignores_arguments() {
        <()>::from_args(vec![json!(1), json!("x")]).unwrap();
    }

    #[test]
    fn test_tuple_decoding() {
        let (link, depth): (String, u32) =
            FromArgs::from_args(vec![json!("https://affine.pro"), json!(2)]).unwrap();
        assert_eq!(link, "https://affine.pro");
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_surplus_arguments_ignored() {
        let (visible,): (bool,) =
            FromArgs::from_args(vec![json!(false), json!("extra")]).unwrap();
        assert!(!visible);
    }

    #[test]
    fn test_missing_argument() {
        let err = <(String,)>::from_args(vec![]).unwrap_err();
        assert!(matches!(err, ShellwireError::InvalidArguments(ref m) if m == "missing argument 0"));

        let (maybe,): (Option<String>,) = FromArgs::from_args(vec![]).unwrap();
        assert_eq!(maybe, None);
    }

    #[test]
    fn test_wrong_argument_type() {
        let err = <(bool,)>::from_args(vec![json!("yes")]).unwrap_err();
        assert!(matches!(err, ShellwireError::InvalidArguments(ref m) if m.starts_with("argument 0")));
    }
}

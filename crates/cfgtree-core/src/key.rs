//! Scalar key encoding for keyed tables.
//!
//! JSON object keys are always strings, but tables are keyed by integers,
//! enum tags and other scalars. [`TableKey`] gives each key type a total,
//! reversible string form: `decode_key(&k.encode_key()) == Some(k)`.

use std::hash::Hash;

/// A scalar type usable as the key of a [`Table`](crate::table::Table).
pub trait TableKey: Sized + Eq + Hash {
    /// Human-readable name of the key type, used in error messages.
    const KIND: &'static str;

    /// Encode the key as a JSON property name.
    fn encode_key(&self) -> String;

    /// Decode a JSON property name. Returns `None` when `raw` is not a valid
    /// encoding of `Self`.
    fn decode_key(raw: &str) -> Option<Self>;
}

macro_rules! impl_int_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TableKey for $ty {
                const KIND: &'static str = stringify!($ty);

                fn encode_key(&self) -> String {
                    self.to_string()
                }

                fn decode_key(raw: &str) -> Option<Self> {
                    // `str::parse` accepts a leading '+'; the wire form never has one.
                    if raw.starts_with('+') {
                        return None;
                    }
                    raw.parse().ok()
                }
            }
        )*
    };
}

impl_int_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TableKey for String {
    const KIND: &'static str = "string";

    fn encode_key(&self) -> String {
        self.clone()
    }

    fn decode_key(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl TableKey for bool {
    const KIND: &'static str = "bool";

    fn encode_key(&self) -> String {
        self.to_string()
    }

    fn decode_key(raw: &str) -> Option<Self> {
        match raw {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

impl TableKey for char {
    const KIND: &'static str = "char";

    fn encode_key(&self) -> String {
        self.to_string()
    }

    fn decode_key(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

/// Implement [`TableKey`] for a type through its `FromStr` and `Display`
/// impls. Intended for fieldless enums, e.g. with `strum::EnumString` and
/// `strum::Display` derived.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
/// enum Rarity { Common, Rare }
///
/// cfgtree_core::impl_table_key_from_str!(Rarity);
/// ```
#[macro_export]
macro_rules! impl_table_key_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::key::TableKey for $ty {
                const KIND: &'static str = stringify!($ty);

                fn encode_key(&self) -> String {
                    ::std::string::ToString::to_string(self)
                }

                fn decode_key(raw: &str) -> Option<Self> {
                    <$ty as ::std::str::FromStr>::from_str(raw).ok()
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
    enum Rarity {
        Common,
        Rare,
        Legendary,
    }

    crate::impl_table_key_from_str!(Rarity);

    #[test]
    fn int_keys_parse_decimal() {
        assert_eq!(i32::decode_key("42"), Some(42));
        assert_eq!(i32::decode_key("-7"), Some(-7));
        assert_eq!(u8::decode_key("255"), Some(255));
    }

    #[test]
    fn int_keys_reject_garbage() {
        assert_eq!(i32::decode_key("abc"), None);
        assert_eq!(i32::decode_key(""), None);
        assert_eq!(i32::decode_key("1.5"), None);
        assert_eq!(i32::decode_key("+1"), None);
        assert_eq!(u8::decode_key("256"), None);
        assert_eq!(u32::decode_key("-1"), None);
    }

    #[test]
    fn leading_zero_decodes_to_same_value() {
        assert_eq!(i64::decode_key("01"), Some(1));
        assert_eq!(1i64.encode_key(), "1");
    }

    #[test]
    fn bool_keys() {
        assert_eq!(bool::decode_key("true"), Some(true));
        assert_eq!(bool::decode_key("false"), Some(false));
        assert_eq!(bool::decode_key("True"), None);
        assert_eq!(true.encode_key(), "true");
    }

    #[test]
    fn char_keys_need_exactly_one_char() {
        assert_eq!(char::decode_key("x"), Some('x'));
        assert_eq!(char::decode_key("é"), Some('é'));
        assert_eq!(char::decode_key("xy"), None);
        assert_eq!(char::decode_key(""), None);
    }

    #[test]
    fn string_keys_are_identity() {
        assert_eq!(String::decode_key(""), Some(String::new()));
        assert_eq!(String::decode_key("命名空间"), Some("命名空间".to_string()));
    }

    #[test]
    fn enum_keys_via_from_str() {
        assert_eq!(Rarity::decode_key("Rare"), Some(Rarity::Rare));
        assert_eq!(Rarity::decode_key("Mythic"), None);
        assert_eq!(Rarity::Legendary.encode_key(), "Legendary");
        assert_eq!(Rarity::KIND, "Rarity");
    }

    proptest! {
        #[test]
        fn i64_key_round_trip(k in any::<i64>()) {
            prop_assert_eq!(i64::decode_key(&k.encode_key()), Some(k));
        }

        #[test]
        fn u16_key_round_trip(k in any::<u16>()) {
            prop_assert_eq!(u16::decode_key(&k.encode_key()), Some(k));
        }

        #[test]
        fn char_key_round_trip(k in any::<char>()) {
            prop_assert_eq!(char::decode_key(&k.encode_key()), Some(k));
        }

        #[test]
        fn string_key_round_trip(k in ".*") {
            prop_assert_eq!(String::decode_key(&k.encode_key()), Some(k));
        }
    }
}

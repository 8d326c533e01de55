//! Typed keys for parameter maps.
//!
//! A [`TypedKey`] pairs a parameter name with the Rust type stored
//! under it, so inserts and lookups agree on the element type at
//! compile time. Scalars and single-element arrays are the same thing
//! on disk; the access rules below make that duality predictable:
//!
//! - a lookup must name the stored element type exactly, no widening
//! - scalar lookups succeed only when exactly one element is stored
//! - array lookups succeed for any length, including one

use std::marker::PhantomData;

use crate::error::{Result, TrsError};

use super::types::ElementType;
use super::value::{Parameter, ParameterValue};

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width element type that can appear in a parameter array.
///
/// Implemented for the seven fixed-width primitives; strings are
/// scalar-only and live directly on [`ParameterData`]. The trait is
/// sealed, matching the closed set of wire types.
pub trait Element: sealed::Sealed + Copy {
    /// Wire element type this Rust type maps to.
    const ELEMENT_TYPE: ElementType;

    #[doc(hidden)]
    fn wrap(items: Vec<Self>) -> ParameterValue;

    #[doc(hidden)]
    fn unwrap(value: &ParameterValue) -> Option<&[Self]>;
}

macro_rules! element {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn wrap(items: Vec<Self>) -> ParameterValue {
                ParameterValue::$variant(items)
            }

            fn unwrap(value: &ParameterValue) -> Option<&[Self]> {
                match value {
                    ParameterValue::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

element!(u8, Byte);
element!(i16, Short);
element!(i32, Int);
element!(f32, Float);
element!(i64, Long);
element!(f64, Double);
element!(bool, Bool);

fn typed_slice<'p, E: Element>(key: &str, parameter: &'p Parameter) -> Result<&'p [E]> {
    E::unwrap(parameter.value()).ok_or_else(|| TrsError::TypeMismatch {
        key: key.to_string(),
        expected: E::ELEMENT_TYPE.name(),
        actual: parameter.element_type().name(),
    })
}

fn scalar_from<E: Element>(key: &str, parameter: &Parameter) -> Result<E> {
    let items = typed_slice::<E>(key, parameter)?;
    match items {
        [single] => Ok(*single),
        _ => Err(TrsError::NotScalar {
            key: key.to_string(),
            len: items.len(),
        }),
    }
}

fn array_into<E: Element>(key: &str, items: Vec<E>) -> Result<Parameter> {
    if items.is_empty() {
        return Err(TrsError::EmptyArray {
            key: key.to_string(),
        });
    }
    let scalar = items.len() == 1;
    Ok(Parameter::from_value(E::wrap(items), scalar))
}

/// A value that can be stored in or read back from a parameter map.
///
/// Sealed; the closed set of implementations is each [`Element`] type
/// (scalar mode), `Vec` of each element type (array mode), and
/// [`String`]. The format has no string arrays.
pub trait ParameterData: sealed::Sealed + Sized {
    /// Wire element type of the stored parameter.
    fn element_type() -> ElementType;

    /// Converts this value into a stored parameter, copying its data.
    fn into_parameter(self, key: &str) -> Result<Parameter>;

    /// Extracts this value back out of a stored parameter.
    fn from_parameter(key: &str, parameter: &Parameter) -> Result<Self>;
}

macro_rules! parameter_data {
    ($ty:ty) => {
        impl ParameterData for $ty {
            fn element_type() -> ElementType {
                <$ty as Element>::ELEMENT_TYPE
            }

            fn into_parameter(self, _key: &str) -> Result<Parameter> {
                Ok(Parameter::from_value(Element::wrap(vec![self]), true))
            }

            fn from_parameter(key: &str, parameter: &Parameter) -> Result<Self> {
                scalar_from(key, parameter)
            }
        }

        impl sealed::Sealed for Vec<$ty> {}

        impl ParameterData for Vec<$ty> {
            fn element_type() -> ElementType {
                <$ty as Element>::ELEMENT_TYPE
            }

            fn into_parameter(self, key: &str) -> Result<Parameter> {
                array_into(key, self)
            }

            fn from_parameter(key: &str, parameter: &Parameter) -> Result<Self> {
                Ok(typed_slice::<$ty>(key, parameter)?.to_vec())
            }
        }
    };
}

parameter_data!(u8);
parameter_data!(i16);
parameter_data!(i32);
parameter_data!(f32);
parameter_data!(i64);
parameter_data!(f64);
parameter_data!(bool);

impl sealed::Sealed for String {}

impl ParameterData for String {
    fn element_type() -> ElementType {
        ElementType::String
    }

    fn into_parameter(self, _key: &str) -> Result<Parameter> {
        Ok(Parameter::from_value(ParameterValue::String(self), true))
    }

    fn from_parameter(key: &str, parameter: &Parameter) -> Result<Self> {
        match parameter.value() {
            ParameterValue::String(s) => Ok(s.clone()),
            other => Err(TrsError::TypeMismatch {
                key: key.to_string(),
                expected: ElementType::String.name(),
                actual: other.element_type().name(),
            }),
        }
    }
}

/// A parameter name bound to the Rust type stored under it.
///
/// # Examples
///
/// ```
/// use trs::{TraceParameterMap, TypedKey};
///
/// let input: TypedKey<Vec<u8>> = TypedKey::new("INPUT");
/// let round: TypedKey<i32> = TypedKey::new("ROUND");
///
/// let mut map = TraceParameterMap::new();
/// map.insert(&input, vec![0xDE, 0xAD])?;
/// map.insert(&round, 10)?;
///
/// assert_eq!(map.get(&input)?, vec![0xDE, 0xAD]);
/// assert_eq!(map.get(&round)?, 10);
/// # Ok::<(), trs::TrsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TypedKey<T: ParameterData> {
    name: String,
    marker: PhantomData<fn() -> T>,
}

impl<T: ParameterData> TypedKey<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire element type of values stored under this key.
    pub fn element_type(&self) -> ElementType {
        T::element_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_into_parameter() {
        let parameter = 42i32.into_parameter("X").unwrap();
        assert!(parameter.is_scalar());
        assert_eq!(parameter.len(), 1);
        assert_eq!(parameter.element_type(), ElementType::Int);
        assert_eq!(i32::from_parameter("X", &parameter).unwrap(), 42);
    }

    #[test]
    fn test_single_element_array_normalizes_to_scalar() {
        let parameter = vec![7i16].into_parameter("X").unwrap();
        assert!(parameter.is_scalar());
        // scalar and array access both succeed on length one
        assert_eq!(i16::from_parameter("X", &parameter).unwrap(), 7);
        assert_eq!(Vec::<i16>::from_parameter("X", &parameter).unwrap(), vec![7]);
    }

    #[test]
    fn test_empty_array_rejected() {
        let err = Vec::<f64>::new().into_parameter("EMPTY").unwrap_err();
        match err {
            TrsError::EmptyArray { key } => assert_eq!(key, "EMPTY"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scalar_access_on_long_array_fails() {
        let parameter = vec![1u8, 2, 3].into_parameter("BYTES").unwrap();
        assert!(!parameter.is_scalar());
        let err = u8::from_parameter("BYTES", &parameter).unwrap_err();
        match err {
            TrsError::NotScalar { key, len } => {
                assert_eq!(key, "BYTES");
                assert_eq!(len, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_exact_type_required() {
        let parameter = vec![1i16, 2].into_parameter("SHORTS").unwrap();
        let err = Vec::<i32>::from_parameter("SHORTS", &parameter).unwrap_err();
        match err {
            TrsError::TypeMismatch {
                key,
                expected,
                actual,
            } => {
                assert_eq!(key, "SHORTS");
                assert_eq!(expected, "int");
                assert_eq!(actual, "short");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_string_parameter() {
        let parameter = "AES-128".to_string().into_parameter("CIPHER").unwrap();
        assert!(parameter.is_scalar());
        assert_eq!(parameter.element_type(), ElementType::String);
        assert_eq!(parameter.len(), 7);
        assert_eq!(
            String::from_parameter("CIPHER", &parameter).unwrap(),
            "AES-128"
        );
    }

    #[test]
    fn test_copy_in_semantics() {
        let mut source = vec![1u8, 2, 3];
        let parameter = source.clone().into_parameter("INPUT").unwrap();
        source[0] = 0xFF;
        assert_eq!(
            Vec::<u8>::from_parameter("INPUT", &parameter).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_key_reports_element_type() {
        let key: TypedKey<Vec<f32>> = TypedKey::new("SAMPLES");
        assert_eq!(key.element_type(), ElementType::Float);
        assert_eq!(key.name(), "SAMPLES");
    }
}

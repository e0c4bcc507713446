//! Statically typed containers over the generic view machinery.
//!
//! [`ssz_container!`](crate::ssz_container) declares a newtype around [`View`] with
//! one typed getter and one persistent `with_<field>` setter per field. The
//! generated code only maps field names to positions and converts elements to Rust
//! types through [`SszField`]; navigation, hashing and encoding all go through the
//! single [`View`] implementation.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};

use crate::{
    codec,
    error::Result,
    primitive::Value,
    schema::{same_schema, Schema, SchemaRef},
    view::{Element, View},
    SszError,
};

/// A Rust type that can be stored as a field of a typed container.
pub trait SszField: Sized {
    /// Schema of the field.
    fn schema() -> SchemaRef;

    /// Convert an element read from a view.
    fn from_element(element: Element) -> Result<Self>;

    /// Convert into an element that can be written to a view.
    fn to_element(&self) -> Result<Element>;
}

macro_rules! impl_primitive_field {
    ($($ty:ty => $schema:ident),+ $(,)?) => {
        $(
            impl SszField for $ty {
                fn schema() -> SchemaRef {
                    Schema::$schema()
                }

                fn from_element(element: Element) -> Result<Self> {
                    Self::try_from(expect_value(element)?)
                }

                fn to_element(&self) -> Result<Element> {
                    Ok(Element::Value(Value::from(*self)))
                }
            }
        )+
    };
}

impl_primitive_field! {
    bool => boolean,
    u8 => uint8,
    u16 => uint16,
    u32 => uint32,
    u64 => uint64,
    U256 => uint256,
    FixedBytes<4> => bytes4,
    FixedBytes<20> => bytes20,
    FixedBytes<32> => bytes32,
}

impl SszField for Address {
    fn schema() -> SchemaRef {
        Schema::bytes20()
    }

    fn from_element(element: Element) -> Result<Self> {
        FixedBytes::<20>::from_element(element).map(Address::from)
    }

    fn to_element(&self) -> Result<Element> {
        self.0.to_element()
    }
}

/// `ByteList[MAX]`, e.g. the `extra_data` of an execution payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteList<const MAX: usize>(Bytes);

impl<const MAX: usize> ByteList<MAX> {
    /// Wrap `bytes`, failing if there are more than `MAX` of them.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX {
            return Err(SszError::TooManyElements {
                count: bytes.len(),
                max: MAX,
            });
        }
        Ok(Self(bytes))
    }

    /// The wrapped bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl<const MAX: usize> SszField for ByteList<MAX> {
    fn schema() -> SchemaRef {
        Schema::byte_list(MAX).unwrap_or_else(|err| panic!("invalid ByteList[{MAX}]: {err}"))
    }

    fn from_element(element: Element) -> Result<Self> {
        let view = expect_view(element, &Self::schema())?;
        Ok(Self(Bytes::from(view.serialize())))
    }

    fn to_element(&self) -> Result<Element> {
        codec::deserialize(&Self::schema(), &self.0).map(Element::View)
    }
}

/// `ByteVector[N]`, e.g. a logs bloom.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ByteVector<const N: usize>(Bytes);

impl<const N: usize> ByteVector<N> {
    /// Wrap exactly `N` bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() != N {
            return Err(SszError::InvalidByteLength {
                expected: N,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// The wrapped bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl<const N: usize> Default for ByteVector<N> {
    fn default() -> Self {
        Self(Bytes::from(vec![0u8; N]))
    }
}

impl<const N: usize> SszField for ByteVector<N> {
    fn schema() -> SchemaRef {
        Schema::byte_vector(N).unwrap_or_else(|err| panic!("invalid ByteVector[{N}]: {err}"))
    }

    fn from_element(element: Element) -> Result<Self> {
        let view = expect_view(element, &Self::schema())?;
        Ok(Self(Bytes::from(view.serialize())))
    }

    fn to_element(&self) -> Result<Element> {
        codec::deserialize(&Self::schema(), &self.0).map(Element::View)
    }
}

/// `Bitlist[MAX]`, e.g. attestation aggregation bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitList<const MAX: usize>(Vec<bool>);

impl<const MAX: usize> BitList<MAX> {
    /// Wrap `bits`, failing if there are more than `MAX` of them.
    pub fn new(bits: Vec<bool>) -> Result<Self> {
        if bits.len() > MAX {
            return Err(SszError::TooManyElements {
                count: bits.len(),
                max: MAX,
            });
        }
        Ok(Self(bits))
    }

    /// The wrapped bits.
    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|bit| **bit).count()
    }
}

impl<const MAX: usize> SszField for BitList<MAX> {
    fn schema() -> SchemaRef {
        Schema::bitlist(MAX).unwrap_or_else(|err| panic!("invalid Bitlist[{MAX}]: {err}"))
    }

    fn from_element(element: Element) -> Result<Self> {
        let view = expect_view(element, &Self::schema())?;
        let len = view.len()?;
        let bits = (0..len).map(|i| view.get_bit(i)).collect::<Result<Vec<_>>>()?;
        Ok(Self(bits))
    }

    fn to_element(&self) -> Result<Element> {
        let mut list = View::default_for(&Self::schema()).to_mutable();
        for bit in &self.0 {
            list.append(*bit)?;
        }
        list.commit().map(Element::View)
    }
}

fn expect_value(element: Element) -> Result<Value> {
    match element {
        Element::Value(value) => Ok(value),
        Element::View(view) => Err(SszError::TypeMismatch {
            expected: "primitive".to_string(),
            actual: view.schema().to_string(),
        }),
    }
}

/// The view inside `element`, checked against `schema`.
pub fn expect_view(element: Element, schema: &SchemaRef) -> Result<View> {
    match element {
        Element::View(view) if same_schema(view.schema(), schema) => Ok(view),
        Element::View(view) => Err(SszError::TypeMismatch {
            expected: schema.to_string(),
            actual: view.schema().to_string(),
        }),
        Element::Value(value) => Err(SszError::TypeMismatch {
            expected: schema.to_string(),
            actual: value.type_name(),
        }),
    }
}

#[doc(hidden)]
pub mod __private {
    use super::*;

    /// Build the schema of a typed container, optionally as an extension of `base`.
    ///
    /// Panics on an invalid declaration: container types are declared in code, so a
    /// bad one is a programming error that must surface at first use.
    pub fn container_schema(
        name: &'static str,
        fields: Vec<(&'static str, SchemaRef)>,
        base: Option<SchemaRef>,
    ) -> SchemaRef {
        let built = match &base {
            None => Schema::container(name, fields.clone()),
            Some(base) => {
                let inherited = base.as_container().map_or(0, |c| c.field_count());
                base.extend(name, fields.iter().skip(inherited).cloned())
            }
        };
        let schema = built.unwrap_or_else(|err| panic!("invalid container {name}: {err}"));

        let actual = schema.as_container().map_or(&[][..], |c| c.fields());
        let matches = fields.len() == actual.len()
            && fields
                .iter()
                .zip(actual)
                .all(|((field, ty), f)| *field == f.name() && same_schema(ty, f.schema()));
        if !matches {
            panic!("container {name} does not start with the fields of its base");
        }
        schema
    }
}

/// Declare a typed SSZ container.
///
/// ```
/// use ssz_tree::{ssz_container, B256};
///
/// ssz_container! {
///     /// A checkpoint.
///     pub struct Checkpoint {
///         epoch: u64,
///         root: B256,
///     }
/// }
///
/// let cp = Checkpoint::new(5, B256::with_last_byte(1)).unwrap();
/// assert_eq!(cp.epoch().unwrap(), 5);
/// let later = cp.with_epoch(6).unwrap();
/// assert_eq!(cp.epoch().unwrap(), 5);
/// assert_eq!(later.epoch().unwrap(), 6);
/// assert_eq!(cp.to_ssz_bytes().len(), 40);
/// ```
///
/// A fork successor lists every field, the inherited ones first, and names its
/// predecessor after `extends`; its schema is then built with
/// [`Schema::extend`](crate::Schema::extend).
#[macro_export]
macro_rules! ssz_container {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(extends $base:ty)? {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty
            ),+ $(,)?
        }
    ) => {
        $crate::paste::paste! {
            $(#[$meta])*
            #[derive(Clone, Debug, PartialEq, Eq)]
            $vis struct $name($crate::View);

            #[doc(hidden)]
            #[allow(non_camel_case_types, dead_code)]
            #[derive(Clone, Copy)]
            enum [<$name FieldIndex>] {
                $($field),+
            }

            impl $name {
                /// The container schema, built once per process.
                pub fn schema() -> $crate::SchemaRef {
                    static SCHEMA: ::std::sync::LazyLock<$crate::SchemaRef> =
                        ::std::sync::LazyLock::new(|| {
                            $crate::container::__private::container_schema(
                                stringify!($name),
                                vec![$(
                                    (stringify!($field), <$ty as $crate::SszField>::schema())
                                ),+],
                                None $(.or(Some(<$base>::schema())))?,
                            )
                        });
                    SCHEMA.clone()
                }

                /// Build a value from all of its fields.
                #[allow(clippy::too_many_arguments)]
                pub fn new($($field: $ty),+) -> $crate::Result<Self> {
                    let elements = [$(<$ty as $crate::SszField>::to_element(&$field)?),+];
                    let mut view = $crate::View::default_for(&Self::schema()).to_mutable();
                    for (index, element) in elements.into_iter().enumerate() {
                        view.set(index, element)?;
                    }
                    Ok(Self(view.commit()?))
                }

                /// Wrap a view, checking its schema.
                pub fn from_view(view: $crate::View) -> $crate::Result<Self> {
                    $crate::container::expect_view($crate::Element::View(view), &Self::schema())
                        .map(Self)
                }

                /// Decode from SSZ bytes.
                pub fn from_ssz_bytes(bytes: &[u8]) -> $crate::Result<Self> {
                    $crate::deserialize(&Self::schema(), bytes).map(Self)
                }

                /// SSZ encoding.
                pub fn to_ssz_bytes(&self) -> Vec<u8> {
                    self.0.serialize()
                }

                /// Hash tree root.
                pub fn hash_tree_root(&self) -> $crate::B256 {
                    self.0.hash_tree_root()
                }

                /// The underlying view.
                pub fn view(&self) -> &$crate::View {
                    &self.0
                }

                /// Unwrap into the underlying view.
                pub fn into_view(self) -> $crate::View {
                    self.0
                }

                $(
                    $(#[$field_meta])*
                    pub fn $field(&self) -> $crate::Result<$ty> {
                        let element = self.0.get([<$name FieldIndex>]::$field as usize)?;
                        <$ty as $crate::SszField>::from_element(element)
                    }

                    #[doc = concat!("A copy with `", stringify!($field), "` replaced.")]
                    pub fn [<with_ $field>](&self, value: $ty) -> $crate::Result<Self> {
                        let mut view = self.0.to_mutable();
                        view.set(
                            [<$name FieldIndex>]::$field as usize,
                            <$ty as $crate::SszField>::to_element(&value)?,
                        )?;
                        Ok(Self(view.commit()?))
                    }
                )+
            }

            impl Default for $name {
                fn default() -> Self {
                    Self($crate::View::default_for(&Self::schema()))
                }
            }

            impl $crate::SszField for $name {
                fn schema() -> $crate::SchemaRef {
                    $name::schema()
                }

                fn from_element(element: $crate::Element) -> $crate::Result<Self> {
                    $crate::container::expect_view(element, &$name::schema()).map(Self)
                }

                fn to_element(&self) -> $crate::Result<$crate::Element> {
                    Ok($crate::Element::View(self.0.clone()))
                }
            }

            impl From<$name> for $crate::View {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    crate::ssz_container! {
        struct Pair {
            left: u64,
            right: B256,
        }
    }

    crate::ssz_container! {
        struct PairV2 extends Pair {
            left: u64,
            right: B256,
            note: ByteList<8>,
        }
    }

    crate::ssz_container! {
        struct Outer {
            pair: Pair,
            flags: BitList<16>,
            bloom: ByteVector<3>,
        }
    }

    #[test]
    fn test_getters_and_setters() {
        let pair = Pair::new(3, B256::repeat_byte(1)).unwrap();
        assert_eq!(pair.left().unwrap(), 3);
        assert_eq!(pair.right().unwrap(), B256::repeat_byte(1));

        let changed = pair.with_left(4).unwrap();
        assert_eq!(pair.left().unwrap(), 3);
        assert_eq!(changed.left().unwrap(), 4);
        assert_ne!(pair.hash_tree_root(), changed.hash_tree_root());
        assert_eq!(Pair::default().left().unwrap(), 0);
    }

    #[test]
    #[should_panic(expected = "does not start with the fields of its base")]
    fn test_extends_rejects_retyped_field() {
        __private::container_schema(
            "PairNarrow",
            vec![
                ("left", Schema::uint32()),
                ("right", Schema::bytes32()),
                ("note", Schema::uint8()),
            ],
            Some(Pair::schema()),
        );
    }

    #[test]
    fn test_schema_is_shared() {
        assert!(std::sync::Arc::ptr_eq(&Pair::schema(), &Pair::schema()));
        assert_eq!(Pair::schema().to_string(), "Pair");
    }

    #[test]
    fn test_extended_schema() {
        let fields: Vec<_> = PairV2::schema()
            .as_container()
            .unwrap()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(fields, vec!["left", "right", "note"]);

        let pair = Pair::new(9, B256::ZERO).unwrap();
        let upgraded = PairV2::from_view(pair.view().convert(&PairV2::schema()).unwrap()).unwrap();
        assert_eq!(upgraded.left().unwrap(), 9);
        assert!(upgraded.note().unwrap().as_bytes().is_empty());
    }

    #[test]
    fn test_nested_fields() {
        let pair = Pair::new(1, B256::ZERO).unwrap();
        let outer = Outer::new(
            pair.clone(),
            BitList::new(vec![true, false, true]).unwrap(),
            ByteVector::new(vec![1, 2, 3]).unwrap(),
        )
        .unwrap();
        assert_eq!(outer.pair().unwrap(), pair);
        assert_eq!(outer.flags().unwrap().count_ones(), 2);
        assert_eq!(outer.bloom().unwrap().as_bytes().as_ref(), &[1, 2, 3]);

        let decoded = Outer::from_ssz_bytes(&outer.to_ssz_bytes()).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn test_wrong_view_rejected() {
        let outer = Outer::default();
        assert!(matches!(
            Pair::from_view(outer.into_view()),
            Err(SszError::TypeMismatch { .. })
        ));
        assert!(ByteList::<2>::new(vec![1, 2, 3]).is_err());
        assert!(ByteVector::<2>::new(vec![1]).is_err());
    }
}

/// Declares a record struct and implements [`Record`](crate::Record) for it.
///
/// Each field is written as `required KEY => vis name: Type` or
/// `optional KEY => vis name: Type`. Optional fields are stored as
/// `Option<Type>`. `KEY` becomes an associated [`FieldKey`](crate::FieldKey)
/// constant on the struct, with the struct's visibility.
///
/// ```rust
/// use partwise_core::{PartialRecord, record};
///
/// record! {
///     /// Where to send the invoice
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Address {
///         required STREET => pub street: String,
///         required CITY => pub city: String,
///         optional ZIP => pub zip: String,
///     }
/// }
///
/// let mut partial = PartialRecord::<Address>::new();
/// partial.set(Address::STREET, "10 Downing St".to_string());
/// assert_eq!(
///     partial.build().unwrap_err().field(),
///     Address::CITY,
/// );
/// ```
///
/// Field and struct attributes are passed through untouched, so derives such
/// as `serde`'s keep working.
#[macro_export]
macro_rules! record {
    (@type required $ty:ty) => { $ty };
    (@type optional $ty:ty) => { ::core::option::Option<$ty> };

    (@flags required) => { $crate::FieldFlags::EMPTY };
    (@flags optional) => { $crate::FieldFlags::OPTIONAL };

    (@take required $partial:ident, $key:expr) => {
        ::core::clone::Clone::clone($partial.value($key)?)
    };
    (@take optional $partial:ident, $key:expr) => {
        $partial.optional($key).cloned()
    };

    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fattr:meta])*
                $kind:ident $key:ident => $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $(
                $(#[$fattr])*
                $fvis $field: $crate::record!(@type $kind $ty),
            )*
        }

        const _: () = {
            #[allow(non_camel_case_types, dead_code)]
            enum __FieldIndex {
                $($field,)*
            }

            const FIELDS: &[$crate::Field] = &[
                $(
                    $crate::Field::builder()
                        .name(::core::stringify!($field))
                        .index(__FieldIndex::$field as usize)
                        .value_type::<$crate::record!(@type $kind $ty)>()
                        .flags($crate::record!(@flags $kind))
                        .build(),
                )*
            ];

            impl $crate::Record for $name {
                const SHAPE: &'static $crate::RecordShape = &$crate::RecordShape::builder::<$name>()
                    .type_identifier(::core::stringify!($name))
                    .fields(FIELDS)
                    .build();

                fn assemble(
                    partial: &$crate::PartialRecord<Self>,
                ) -> ::core::result::Result<Self, $crate::FieldNotSet> {
                    ::core::result::Result::Ok(Self {
                        $($field: $crate::record!(@take $kind partial, Self::$key),)*
                    })
                }

                fn disassemble(self, partial: &mut $crate::PartialRecord<Self>) {
                    $(partial.set(Self::$key, self.$field);)*
                }
            }

            impl $name {
                $(
                    #[allow(missing_docs)]
                    $vis const $key: $crate::FieldKey<$name, $crate::record!(@type $kind $ty)> =
                        $crate::FieldKey::new(__FieldIndex::$field as usize);
                )*
            }
        };
    };
}

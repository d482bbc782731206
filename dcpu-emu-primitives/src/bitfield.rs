#[doc(hidden)]
pub mod __exports {
    pub use bytemuck::{Pod, Zeroable};
    pub use paste::paste;
}

#[macro_export]
macro_rules! bitfield{
    {
        $(#[$meta:meta])*
        $vis:vis struct $bitfield_ty:ident : $base_ty:ty{
            $($(#[$meta2:meta])* $vis2:vis $field_name:ident @ $placement_start:literal $(.. $placement_end:literal)? : $ty:ty ),*
            $(,)?
        }
    } => {

        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, $crate::bitfield::__exports::Zeroable, $crate::bitfield::__exports::Pod)]
        #[repr(transparent)]
        $vis struct $bitfield_ty($base_ty);

        const _: () = {
            fn test() -> impl $crate::bitfield::BitfieldTy{
                <$base_ty>::default()
            }
        };

        impl $bitfield_ty{

            $vis const fn from_bits(val: $base_ty) -> Self{
                Self(val)
            }

            $vis const fn bits(self) -> $base_ty{
                self.0
            }

            /// Checks that no bits outside of the declared fields are set, and that every field holds a valid value
            #[allow(unused_mut)]
            #[inline]
            $vis fn validate(self) -> bool{
                let mut field: $base_ty = 0;
                let mut fields_valid = true;

                $($(#[$meta2])*{
                    let placement = $placement_start $(.. $placement_end)?;
                    field = $crate::bitfield::BitfieldPosition::<$base_ty>::insert(&placement, field, !0);
                    fields_valid &= $crate::bitfield::FromBitfield::<$base_ty>::validate(self. $field_name ());
                })*

                ((self.bits() & !field) == 0) && fields_valid
            }

            $(
                #[inline]
                $(#[$meta2])*
                $vis2 fn $field_name(&self) -> $ty{
                    let placement = $placement_start $(.. $placement_end)?;
                    let bits = $crate::bitfield::BitfieldPosition::<$base_ty>::extract(&placement, self.0);

                    $crate::bitfield::FromBitfield::<$base_ty>::from_bits(bits)
                }

                $crate::bitfield::__exports::paste!{
                    #[inline]
                    $(#[$meta2])*
                    $vis2 fn [<with_ $field_name>](val: $ty) -> Self{
                        Self::from_bits(0).[<insert_ $field_name>](val)
                    }

                    #[inline]
                    $(#[$meta2])*
                    $vis2 fn [<insert_ $field_name>](mut self, val: $ty) -> Self{
                        self.[<set_ $field_name>](val);
                        self
                    }

                    #[inline]
                    $(#[$meta2])*
                    $vis2 fn [<set_ $field_name>](&mut self, val: $ty){
                        let placement = $placement_start $(.. $placement_end)?;

                        let bits = $crate::bitfield::FromBitfield::<$base_ty>::to_bits(val);

                        self.0 = $crate::bitfield::BitfieldPosition::<$base_ty>::insert(&placement, self.0, bits);
                    }
                }
            )*
        }

        impl ::core::fmt::Display for $bitfield_ty{
            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result{
                let mut sep = "";
                $(
                    {
                        f.write_str(sep)?;
                        sep = " | ";
                        f.write_fmt(::core::format_args!("{}: {:?}", ::core::stringify!($field_name), self.$field_name()))?;
                    }
                )*

                Ok(())
            }
        }

        impl $crate::bitfield::FromBitfield<$base_ty> for $bitfield_ty{
            fn from_bits(bits: $base_ty) -> Self{
                Self::from_bits(bits)
            }
            fn to_bits(self) -> $base_ty{
                self.bits()
            }

            fn validate(self) -> bool{
                self.validate()
            }
        }
    }
}

use std::ops::{BitAnd, BitOr, Not, Range, Shl, Shr};

pub use bitfield;

mod private {
    pub trait Sealed {}
}

use bytemuck::Pod;
use private::Sealed;

impl Sealed for u8 {}
impl Sealed for u16 {}
impl Sealed for u32 {}
impl Sealed for Range<u32> {}

pub trait BitfieldTy:
    Sealed
    + Sized
    + Pod
    + Default
    + Eq
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
{
    const BITS: u32;
    const ZERO: Self;
    const ONES: Self;
}

macro_rules! impl_bitfield_ty {
    ($($tys:ty),*) => {
        $(
            impl BitfieldTy for $tys {
                const BITS: u32 = <$tys>::BITS;
                const ZERO: Self = 0;
                const ONES: Self = <$tys>::MAX;
            }
        )*
    };
}

impl_bitfield_ty!(u8, u16, u32);

pub trait BitfieldPosition<T: BitfieldTy>: Sealed {
    fn extract(&self, bits: T) -> T;
    fn insert(&self, val: T, bits: T) -> T;
}

impl<T: BitfieldTy> BitfieldPosition<T> for u32 {
    fn extract(&self, bits: T) -> T {
        (bits >> *self) & (T::ONES >> (T::BITS - 1))
    }

    fn insert(&self, val: T, bits: T) -> T {
        let mask = (T::ONES >> (T::BITS - 1)) << *self;
        ((bits << *self) & mask) | (val & !mask)
    }
}

impl<T: BitfieldTy> BitfieldPosition<T> for Range<u32> {
    fn extract(&self, bits: T) -> T {
        let length = self.end - self.start;
        let mask = T::ONES >> (T::BITS - length);

        (bits >> self.start) & mask
    }

    fn insert(&self, val: T, bits: T) -> T {
        let length = self.end - self.start;
        let mask = (T::ONES >> (T::BITS - length)) << self.start;

        ((bits << self.start) & mask) | (val & !mask)
    }
}

pub trait FromBitfield<T: BitfieldTy>: Sized {
    fn from_bits(bits: T) -> Self;
    fn to_bits(self) -> T;

    fn validate(self) -> bool {
        true
    }
}

macro_rules! impl_from_bitfield_truncate{
    {
        $($as_ty:ident: $($bitfield_tys:ident),*;)*
    } => {
        $(
            $(
                impl FromBitfield<$bitfield_tys> for $as_ty{
                    fn from_bits(bits: $bitfield_tys) -> Self{
                        bits as $as_ty
                    }
                    fn to_bits(self) -> $bitfield_tys{
                        self as $bitfield_tys
                    }
                }
            )*
        )*
    }
}

impl_from_bitfield_truncate! {
    u8: u8, u16, u32;
    u16: u8, u16, u32;
    u32: u8, u16, u32;
}

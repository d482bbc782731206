/// Declares an open enumeration over an integer: every bit pattern is representable,
/// and the named values are associated constants usable in patterns.
#[macro_export]
macro_rules! fake_enum{
    {
        #[repr($field_vis:vis $repr:ident)]
        $(#[$meta:meta])*
        $vis:vis enum $name:ident{
            $( $(#[$meta2:meta])* $var:ident = $discrim:literal),*
            $(,)?
        }
    } => {

        #[repr(transparent)]
        #[derive(Copy, Clone, Hash, PartialEq, Eq, $crate::bitfield::__exports::Zeroable, $crate::bitfield::__exports::Pod)]
        $(#[$meta])*
        $vis struct $name($field_vis $repr);

        #[allow(non_upper_case_globals)]
        impl $name{
            $(
                $(#[$meta2])* $vis const $var: Self = Self($discrim);
            )*

            /// Every named value, in declaration order
            $vis const ALL: &'static [Self] = &[$(Self::$var),*];

            pub const fn new(bits: $repr) -> Self{
                Self(bits)
            }

            pub const fn get(self) -> $repr{
                self.0
            }

            pub const fn validate(self) -> bool{
                match self.0{
                    $($discrim => true,)*
                    _ => false
                }
            }

            pub const fn name(self) -> Option<&'static str>{
                match self.0{
                    $($discrim => Some(::core::stringify!($var)),)*
                    _ => None
                }
            }
        }

        impl ::core::fmt::Display for $name{
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result{
                match self.name(){
                    Some(name) => f.write_str(name),
                    None => f.write_fmt(::core::format_args!("{}({:#x})", ::core::stringify!($name), self.0))
                }
            }
        }

        impl ::core::fmt::Debug for $name{
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result{
                ::core::fmt::Display::fmt(self, f)
            }
        }

        impl<T: $crate::bitfield::BitfieldTy> $crate::bitfield::FromBitfield<T> for $name where $repr: $crate::bitfield::FromBitfield<T>{
            fn from_bits(bits: T) -> Self{
                Self($crate::bitfield::FromBitfield::<T>::from_bits(bits))
            }
            fn to_bits(self) -> T{
                $crate::bitfield::FromBitfield::<T>::to_bits(self.0)
            }

            fn validate(self) -> bool{
                self.validate()
            }
        }
    }
}

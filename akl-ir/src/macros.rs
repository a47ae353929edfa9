/// Declares a newtype index into one of the arenas (variables,
/// environments, boxes). Equality is cell identity.
#[macro_export]
macro_rules! index_struct {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            index: usize,
        }

        impl $name {
            pub fn from_usize(index: usize) -> $name {
                $name { index }
            }

            pub fn as_usize(self) -> usize {
                self.index
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, fmt: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(fmt, concat!(stringify!($name), "({})"), self.index)
            }
        }
    };
}

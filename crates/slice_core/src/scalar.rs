//! Fixed-width primitives that can be stored inline in a record or a vector.

use std::fmt::Debug;

/// A value with a fixed size and a platform-independent (little endian) byte order.
pub trait Scalar: Copy + PartialEq + Debug + Default + Send + Sync + 'static {
    /// Encoded size in bytes. Also the alignment used inside a buffer.
    const SIZE: usize;

    /// Write the value into `dst`, which is exactly [Self::SIZE] bytes long.
    fn write_le(self, dst: &mut [u8]);

    /// Read the value from `src`, which is exactly [Self::SIZE] bytes long.
    fn read_le(src: &[u8]) -> Self;

    /// Bitwise equality.
    ///
    /// Used for default elision so that `-0.0` and NaN payloads are kept.
    fn same_bits(self, other: Self) -> bool;
}

/// Impl [Scalar] for integer primitives
macro_rules! impl_scalar_int {
    ($($num_type: ty),+) => {
        $(
            impl Scalar for $num_type {
                const SIZE: usize = std::mem::size_of::<$num_type>();

                fn write_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(src: &[u8]) -> Self {
                    let mut bytes = [0_u8; std::mem::size_of::<$num_type>()];
                    bytes.copy_from_slice(src);
                    <$num_type>::from_le_bytes(bytes)
                }

                fn same_bits(self, other: Self) -> bool {
                    self == other
                }
            }
        )+
    };
}

/// Impl [Scalar] for IEEE floats, compared through their bit patterns
macro_rules! impl_scalar_float {
    ($($num_type: ty),+) => {
        $(
            impl Scalar for $num_type {
                const SIZE: usize = std::mem::size_of::<$num_type>();

                fn write_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(src: &[u8]) -> Self {
                    let mut bytes = [0_u8; std::mem::size_of::<$num_type>()];
                    bytes.copy_from_slice(src);
                    <$num_type>::from_le_bytes(bytes)
                }

                fn same_bits(self, other: Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }
        )+
    };
}

impl_scalar_int! {u8, i8, u16, i16, u32, i32, u64, i64}
impl_scalar_float! {f32, f64}

impl Scalar for bool {
    const SIZE: usize = 1;

    fn write_le(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }

    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }

    fn same_bits(self, other: Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_read<T: Scalar>(value: T) -> (Vec<u8>, T) {
        let mut bytes = vec![0_u8; T::SIZE];
        value.write_le(&mut bytes);
        let read = T::read_le(&bytes);
        (bytes, read)
    }

    #[test]
    fn test_little_endian_layout() {
        let (bytes, read) = write_read(0x0102_u16);
        assert_eq!(bytes, [0x02, 0x01]);
        assert_eq!(read, 0x0102);

        let (bytes, read) = write_read(-2_i32);
        assert_eq!(bytes, [0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(read, -2);

        let (bytes, _) = write_read(1.0_f64);
        assert_eq!(bytes, 1.0_f64.to_le_bytes());
    }

    #[test]
    fn test_float_bits_comparison() {
        assert!(!(-0.0_f64).same_bits(0.0));
        assert!(f32::NAN.same_bits(f32::NAN));
        assert!(0.0_f32.same_bits(Default::default()));
    }

    #[test]
    fn test_bool() {
        let (bytes, read) = write_read(true);
        assert_eq!(bytes, [1]);
        assert!(read);
        assert!(!bool::read_le(&[0]));
    }
}

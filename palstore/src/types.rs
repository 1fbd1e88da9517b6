//! Codecs for typed lookups over raw store bytes.
//!
//! A store only holds byte strings. These zero-sized codecs describe how a
//! typed key becomes the bytes to look up, and how a stored value becomes a
//! typed result; see [`Reader::get_as`](crate::Reader::get_as) and
//! [`Iter::decoded`](crate::Iter::decoded).

use std::borrow::Cow;
use std::error::Error;
use std::marker::PhantomData;

pub type CodecError = Box<dyn Error + Sync + Send>;

/// Turns a typed item into lookup bytes.
pub trait BytesEncode<'a> {
    type EItem: 'a + ?Sized;

    fn bytes_encode(item: &'a Self::EItem) -> Result<Cow<'a, [u8]>, CodecError>;
}

/// Reads a typed item out of bytes borrowed from the store.
pub trait BytesDecode<'a> {
    type DItem: 'a;

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError>;
}

/// Plain-old-data values in native byte order.
///
/// Stored bytes carry no alignment guarantee, so decoding copies the value
/// out instead of casting in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Native<T>(PhantomData<T>);

/// UTF-8 strings; `Str<&str>` borrows from the store, `Str<String>` copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Str<S>(PhantomData<S>);

/// Uninterpreted bytes; `Bytes<&[u8]>` borrows, `Bytes<Vec<u8>>` copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bytes<B>(PhantomData<B>);

impl<'a, T> BytesEncode<'a> for Native<T>
where
    T: bytemuck::Pod,
{
    type EItem = T;

    fn bytes_encode(item: &'a Self::EItem) -> Result<Cow<'a, [u8]>, CodecError> {
        Ok(Cow::Borrowed(bytemuck::bytes_of(item)))
    }
}

impl<'a, T> BytesDecode<'a> for Native<T>
where
    T: bytemuck::Pod,
{
    type DItem = T;

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError> {
        if bytes.len() != size_of::<T>() {
            return Err(format!(
                "expected {} bytes for {}, got {}",
                size_of::<T>(),
                std::any::type_name::<T>(),
                bytes.len()
            )
            .into());
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl<'a, S> BytesEncode<'a> for Str<S>
where
    S: AsRef<str> + 'a,
{
    type EItem = str;

    fn bytes_encode(item: &'a Self::EItem) -> Result<Cow<'a, [u8]>, CodecError> {
        Ok(Cow::Borrowed(item.as_bytes()))
    }
}

impl<'a> BytesDecode<'a> for Str<&'a str> {
    type DItem = &'a str;

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError> {
        Ok(std::str::from_utf8(bytes)?)
    }
}

impl<'a> BytesDecode<'a> for Str<String> {
    type DItem = String;

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError> {
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

impl<'a, B> BytesEncode<'a> for Bytes<B>
where
    B: AsRef<[u8]> + 'a,
{
    type EItem = B;

    fn bytes_encode(item: &'a Self::EItem) -> Result<Cow<'a, [u8]>, CodecError> {
        Ok(Cow::Borrowed(item.as_ref()))
    }
}

impl<'a> BytesDecode<'a> for Bytes<&'a [u8]> {
    type DItem = &'a [u8];

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError> {
        Ok(bytes)
    }
}

impl<'a> BytesDecode<'a> for Bytes<Vec<u8>> {
    type DItem = Vec<u8>;

    fn bytes_decode(bytes: &'a [u8]) -> Result<Self::DItem, CodecError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_native_reads_unaligned() {
        let mut buf = vec![0u8; 9];
        buf[1..].copy_from_slice(&0x0102_0304_0506_0708u64.to_ne_bytes());
        let value = Native::<u64>::bytes_decode(&buf[1..]).unwrap();
        assert_eq!(value, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_native_length_mismatch() {
        let err = Native::<u32>::bytes_decode(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("expected 4 bytes"));
    }

    #[test]
    fn test_str_codecs() {
        assert_eq!(&*Str::<&str>::bytes_encode("key").unwrap(), b"key");
        assert_eq!(Str::<&str>::bytes_decode(b"value").unwrap(), "value");
        assert_eq!(Str::<String>::bytes_decode(b"owned").unwrap(), "owned".to_string());
        assert!(Str::<&str>::bytes_decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_bytes_codecs() {
        let key = vec![1u8, 2, 3];
        assert!(matches!(Bytes::<Vec<u8>>::bytes_encode(&key).unwrap(), Cow::Borrowed(b) if b == [1, 2, 3]));
        assert_eq!(Bytes::<&[u8]>::bytes_decode(&[4, 5]).unwrap(), &[4, 5]);
        assert_eq!(Bytes::<Vec<u8>>::bytes_decode(&[]).unwrap(), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn prop_native_matches_ne_bytes(v in any::<i64>()) {
            let encoded = Native::<i64>::bytes_encode(&v).unwrap();
            prop_assert_eq!(&*encoded, &v.to_ne_bytes()[..]);
            prop_assert_eq!(Native::<i64>::bytes_decode(&encoded).unwrap(), v);
        }
    }
}

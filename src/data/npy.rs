use std::io::Cursor;

use ndarray::{Array1, ArrayD};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};

use super::array::NumericArray;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// .npy codec
// ---------------------------------------------------------------------------

/// Decode an `.npy` buffer of any dimensionality into a flat array.
///
/// Elements are taken in logical (row-major) order regardless of whether the
/// file was written in Fortran order.  Supported dtypes: `<f8`, `<f4`, `<i8`,
/// `<i4` (and their big-endian forms).
pub fn decode_npy(bytes: &[u8]) -> Result<NumericArray> {
    // Try each element type in turn; only a descriptor mismatch moves on.
    macro_rules! attempt {
        ($ty:ty, $variant:ident) => {
            match ArrayD::<$ty>::read_npy(Cursor::new(bytes)) {
                Ok(arr) => return Ok(NumericArray::$variant(arr.iter().copied().collect())),
                Err(ReadNpyError::WrongDescriptor(_)) => {}
                Err(e) => return Err(e.into()),
            }
        };
    }

    attempt!(f64, Float64);
    attempt!(f32, Float32);
    attempt!(i64, Int64);
    attempt!(i32, Int32);

    Err(Error::UnsupportedDtype(describe_header(bytes)))
}

/// Encode a flat array as a 1-D `.npy` buffer.
pub fn encode_npy(array: &NumericArray) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match array {
        NumericArray::Float64(v) => Array1::from(v.clone()).write_npy(&mut buf)?,
        NumericArray::Float32(v) => Array1::from(v.clone()).write_npy(&mut buf)?,
        NumericArray::Int64(v) => Array1::from(v.clone()).write_npy(&mut buf)?,
        NumericArray::Int32(v) => Array1::from(v.clone()).write_npy(&mut buf)?,
    }
    Ok(buf)
}

/// Best-effort text of the header dictionary, for error messages.
fn describe_header(bytes: &[u8]) -> String {
    let end = bytes.len().min(128);
    let text = String::from_utf8_lossy(&bytes[..end]);
    match (text.find('{'), text.find('}')) {
        (Some(a), Some(b)) if a < b => text[a..=b].to_string(),
        _ => "unrecognised npy header".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_supported_dtype() {
        let cases = [
            NumericArray::Float64(vec![0.1, 0.2, 0.3]),
            NumericArray::Float32(vec![1.5, -2.5]),
            NumericArray::Int64(vec![5, 5, 7]),
            NumericArray::Int32(vec![0, 0, 1]),
        ];
        for arr in cases {
            let bytes = encode_npy(&arr).unwrap();
            assert_eq!(decode_npy(&bytes).unwrap(), arr);
        }
    }

    #[test]
    fn flattens_two_dimensional_arrays() {
        let arr = ndarray::array![[1i64, 2, 3], [4, 5, 6]];
        let mut buf = Vec::new();
        arr.write_npy(&mut buf).unwrap();
        assert_eq!(
            decode_npy(&buf).unwrap(),
            NumericArray::Int64(vec![1, 2, 3, 4, 5, 6])
        );
    }

    #[test]
    fn rejects_unsupported_dtype() {
        let arr = Array1::from(vec![1u8, 2, 3]);
        let mut buf = Vec::new();
        arr.write_npy(&mut buf).unwrap();
        match decode_npy(&buf) {
            Err(Error::UnsupportedDtype(header)) => assert!(header.contains("u1")),
            other => panic!("expected UnsupportedDtype, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_read_error() {
        assert!(matches!(
            decode_npy(b"not an npy file"),
            Err(Error::ReadNpy(_))
        ));
    }
}

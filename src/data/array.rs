use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::ser::{Serialize, SerializeMap, Serializer};

// ---------------------------------------------------------------------------
// NumericArray – one flat column of spike data
// ---------------------------------------------------------------------------

/// A one-dimensional numeric array tagged with its element type.
///
/// Mirrors the handful of numpy dtypes that spike-sorting pipelines emit for
/// raster data: float timestamps and integer index columns.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int64(Vec<i64>),
    Int32(Vec<i32>),
}

impl NumericArray {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            NumericArray::Float64(v) => v.len(),
            NumericArray::Float32(v) => v.len(),
            NumericArray::Int64(v) => v.len(),
            NumericArray::Int32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The numpy name of the element type.
    pub fn dtype(&self) -> &'static str {
        match self {
            NumericArray::Float64(_) => "float64",
            NumericArray::Float32(_) => "float32",
            NumericArray::Int64(_) => "int64",
            NumericArray::Int32(_) => "int32",
        }
    }

    /// Raw little-endian bytes in element order (numpy's `tobytes()` on a
    /// little-endian host).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        fn collect<const N: usize, T: Copy>(v: &[T], f: impl Fn(T) -> [u8; N]) -> Vec<u8> {
            let mut out = Vec::with_capacity(v.len() * N);
            for &x in v {
                out.extend_from_slice(&f(x));
            }
            out
        }
        match self {
            NumericArray::Float64(v) => collect(v, f64::to_le_bytes),
            NumericArray::Float32(v) => collect(v, f32::to_le_bytes),
            NumericArray::Int64(v) => collect(v, i64::to_le_bytes),
            NumericArray::Int32(v) => collect(v, i32::to_le_bytes),
        }
    }

    /// Widen to `f64`.  Integers above 2^53 lose precision.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NumericArray::Float64(v) => v.clone(),
            NumericArray::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            NumericArray::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            NumericArray::Int32(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }

    /// Convert to `i64`.  Floats are truncated toward zero.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match self {
            NumericArray::Float64(v) => v.iter().map(|&x| x as i64).collect(),
            NumericArray::Float32(v) => v.iter().map(|&x| x as i64).collect(),
            NumericArray::Int64(v) => v.clone(),
            NumericArray::Int32(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }

    /// Minimum and maximum of the values, `None` for an empty array.
    /// NaNs are skipped.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for x in self.to_f64_vec() {
            if x.is_nan() {
                continue;
            }
            range = Some(match range {
                None => (x, x),
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
            });
        }
        range
    }
}

impl From<Vec<f64>> for NumericArray {
    fn from(v: Vec<f64>) -> Self {
        NumericArray::Float64(v)
    }
}

impl From<Vec<f32>> for NumericArray {
    fn from(v: Vec<f32>) -> Self {
        NumericArray::Float32(v)
    }
}

impl From<Vec<i64>> for NumericArray {
    fn from(v: Vec<i64>) -> Self {
        NumericArray::Int64(v)
    }
}

impl From<Vec<i32>> for NumericArray {
    fn from(v: Vec<i32>) -> Self {
        NumericArray::Int32(v)
    }
}

impl fmt::Display for NumericArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.dtype(), self.len())
    }
}

// -- Wire encoding used in figure payloads --

/// Encodes as `{"_type": "ndarray", "data_b64": ..., "dtype": ..., "shape": [n]}`,
/// the layout figure views expect for numpy arrays.  Keys are emitted in
/// sorted order so the serialized payload is canonical.
impl Serialize for NumericArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("_type", "ndarray")?;
        map.serialize_entry("data_b64", &BASE64.encode(self.to_le_bytes()))?;
        map.serialize_entry("dtype", self.dtype())?;
        map.serialize_entry("shape", &[self.len()])?;
        map.end()
    }
}

use std::borrow::Cow;

use crate::{Result, ShapeError, Tensor, tensor::element_count};

const F32_WIDTH: usize = size_of::<f32>();

/// A read-only typed view over a raw byte buffer.
///
/// Multi-byte elements are always read as little endian, regardless of the host.
#[derive(Debug, Clone, Copy)]
pub struct TensorSource<'a> {
    bytes: &'a [u8],
}

impl<'a> TensorSource<'a> {
    /// Creates a new `TensorSource`.
    ///
    /// # Arguments
    /// * `bytes` - The buffer to view.
    ///
    /// # Returns
    /// A new `TensorSource` instance.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Views the buffer as unsigned bytes.
    pub fn as_u8(&self) -> &'a [u8] {
        self.bytes
    }

    /// Views the buffer as little endian 32-bit floats.
    ///
    /// # Returns
    /// A borrowed slice when the host is little endian and the buffer is aligned for `f32`,
    /// otherwise a decoded copy. Fails if the length is not a multiple of 4.
    pub fn as_f32_le(&self) -> Result<Cow<'a, [f32]>> {
        if self.bytes.len() % F32_WIDTH != 0 {
            return Err(ShapeError::ByteLength {
                len: self.bytes.len(),
                width: F32_WIDTH,
            });
        }

        if cfg!(target_endian = "little")
            && let Ok(floats) = bytemuck::try_cast_slice::<u8, f32>(self.bytes)
        {
            return Ok(Cow::Borrowed(floats));
        }

        let floats = self
            .bytes
            .chunks_exact(F32_WIDTH)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Cow::Owned(floats))
    }

    /// Builds a tensor reading the buffer as little endian 32-bit floats.
    ///
    /// # Arguments
    /// * `shape` - The shape of the resulting tensor.
    ///
    /// # Returns
    /// The tensor or an error if the buffer doesn't hold exactly the elements `shape` describes.
    pub fn to_tensor_f32(&self, shape: &[usize]) -> Result<Tensor> {
        let expected = element_count(shape)?;
        let got = self.bytes.len() / F32_WIDTH;

        if self.bytes.len() % F32_WIDTH != 0 || got != expected {
            return Err(ShapeError::CountMismatch {
                what: "f32 buffer",
                got,
                expected,
            });
        }

        Tensor::from_vec(shape, self.as_f32_le()?.into_owned())
    }

    /// Builds a tensor reading every byte as one element, multiplied by `scale`.
    ///
    /// # Arguments
    /// * `shape` - The shape of the resulting tensor.
    /// * `scale` - The factor applied to every byte.
    ///
    /// # Returns
    /// The tensor or an error if the buffer doesn't hold exactly the elements `shape` describes.
    pub fn to_tensor_u8(&self, shape: &[usize], scale: f32) -> Result<Tensor> {
        let expected = element_count(shape)?;

        if self.bytes.len() != expected {
            return Err(ShapeError::CountMismatch {
                what: "u8 buffer",
                got: self.bytes.len(),
                expected,
            });
        }

        let data = self.bytes.iter().map(|&b| b as f32 * scale).collect();
        Tensor::from_vec(shape, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn f32_view_decodes_little_endian() {
        let bytes = le_bytes(&[1.0, -2.5, 3.25]);
        let source = TensorSource::new(&bytes);

        assert_eq!(&*source.as_f32_le().unwrap(), &[1.0, -2.5, 3.25]);
    }

    #[test]
    fn f32_view_handles_unaligned_buffers() {
        let mut bytes = vec![0u8];
        bytes.extend(le_bytes(&[0.5, 4.0]));
        let source = TensorSource::new(&bytes[1..]);

        assert_eq!(&*source.as_f32_le().unwrap(), &[0.5, 4.0]);
    }

    #[test]
    fn f32_view_rejects_partial_elements() {
        let bytes = [0u8; 7];
        let err = TensorSource::new(&bytes).as_f32_le().unwrap_err();

        assert_eq!(err, ShapeError::ByteLength { len: 7, width: 4 });
    }

    #[test]
    fn f32_tensor_checks_the_shape() {
        let bytes = le_bytes(&[1.0, 2.0, 3.0, 4.0]);
        let source = TensorSource::new(&bytes);

        let tensor = source.to_tensor_f32(&[2, 2]).unwrap();
        assert_eq!(tensor.as_slice(), &[1.0, 2.0, 3.0, 4.0]);

        assert!(matches!(
            source.to_tensor_f32(&[3, 2]),
            Err(ShapeError::CountMismatch { got: 4, expected: 6, .. })
        ));
    }

    #[test]
    fn u8_tensor_scales_every_byte() {
        let bytes = [0u8, 6, 255];
        let source = TensorSource::new(&bytes);

        let tensor = source.to_tensor_u8(&[3], 0.5).unwrap();
        assert_eq!(tensor.as_slice(), &[0.0, 3.0, 127.5]);
        assert_eq!(source.as_u8(), &bytes);

        assert!(source.to_tensor_u8(&[2], 1.0).is_err());
    }
}

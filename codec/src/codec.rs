use log::{debug, warn};
use machine_learning::Model;
use tensor::{TensorSource, element_count};

use crate::{BindError, CodecError, ParameterBlob, Result, reader::Reader};

const F32_SIZE: usize = size_of::<f32>();

/// Reads, writes and binds parameter blobs.
///
/// A blob is a stream of layer records with every integer a little endian `u32`:
///
/// ```text
/// record = id_len, id: [u8; id_len], tensor_count, tensor*
/// tensor = shape_len, shape: [u32; shape_len], byte_len, payload: [f32 LE; byte_len / 4]
/// ```
pub struct ParameterCodec;

impl ParameterCodec {
    /// Decodes a whole record stream.
    ///
    /// # Arguments
    /// * `bytes` - The serialized blob, it must be consumed exactly.
    ///
    /// # Returns
    /// The decoded blob or the first structural error found.
    pub fn decode(bytes: &[u8]) -> Result<ParameterBlob> {
        let mut reader = Reader::new(bytes);
        let mut blob = ParameterBlob::new();

        while !reader.is_empty() {
            let offset = reader.offset();
            let id_len = reader.u32()? as usize;
            if id_len == 0 {
                return Err(CodecError::EmptyLayerId { offset });
            }

            let id = str::from_utf8(reader.take(id_len)?)
                .map_err(|_| CodecError::InvalidLayerId { offset })?
                .to_string();

            let tensor_count = reader.u32()?;
            let mut tensors = Vec::new();

            for _ in 0..tensor_count {
                let shape_len = reader.u32()? as usize;
                let shape: Vec<usize> = reader
                    .u32s(shape_len)?
                    .into_iter()
                    .map(|dim| dim as usize)
                    .collect();

                let invalid_shape = || CodecError::InvalidShape {
                    layer: id.clone(),
                    shape: shape.clone(),
                };
                let expected = element_count(&shape)
                    .ok()
                    .and_then(|count| count.checked_mul(F32_SIZE))
                    .ok_or_else(invalid_shape)?;

                let byte_len = reader.u32()? as usize;
                if byte_len != expected {
                    return Err(CodecError::PayloadLength {
                        layer: id,
                        expected,
                        got: byte_len,
                    });
                }

                let payload = reader.take(byte_len)?;
                tensors.push(TensorSource::new(payload).to_tensor_f32(&shape)?);
            }

            blob.push(id, tensors)?;
        }

        debug!(layers = blob.len(), bytes = bytes.len(); "decoded parameter blob");
        Ok(blob)
    }

    /// Encodes a blob into its record stream, the inverse of `decode`.
    pub fn encode(blob: &ParameterBlob) -> Result<Vec<u8>> {
        let mut buf = Vec::new();

        for layer in blob.layers() {
            put_len(&mut buf, "layer id length", layer.id().len())?;
            buf.extend_from_slice(layer.id().as_bytes());
            put_len(&mut buf, "tensor count", layer.tensors().len())?;

            for tensor in layer.tensors() {
                put_len(&mut buf, "shape length", tensor.shape().len())?;
                for &dim in tensor.shape() {
                    put_len(&mut buf, "dimension", dim)?;
                }

                put_len(&mut buf, "payload length", tensor.len() * F32_SIZE)?;
                for value in tensor.as_slice() {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
            }
        }

        Ok(buf)
    }

    /// Binds a blob onto a model, all or nothing.
    ///
    /// Every declared layer must have an entry with exactly its tensor shapes. The new buffer is
    /// staged in full before being swapped in, so on error the model keeps its previous
    /// parameters. Entries for layers the model doesn't declare are ignored.
    ///
    /// # Arguments
    /// * `model` - The model receiving the parameters.
    /// * `blob` - The decoded parameters.
    pub fn bind<M: Model + ?Sized>(
        model: &mut M,
        blob: &ParameterBlob,
    ) -> std::result::Result<(), BindError> {
        let layers = model.layers();
        let mut staged = Vec::with_capacity(model.params().len());

        for info in &layers {
            let entry = blob
                .get(&info.id)
                .ok_or_else(|| BindError::MissingParameter {
                    layer: info.id.clone(),
                })?;

            let actual = entry.shapes();
            if actual != info.shapes {
                return Err(BindError::ShapeMismatch {
                    layer: info.id.clone(),
                    expected: info.shapes.clone(),
                    actual,
                });
            }

            for tensor in entry.tensors() {
                staged.extend_from_slice(tensor.as_slice());
            }
        }

        for extra in blob
            .layers()
            .filter(|entry| !layers.iter().any(|info| info.id == entry.id()))
        {
            warn!(layer = extra.id(); "ignoring parameters of a layer the model doesn't declare");
        }

        model.swap_params(staged)?;

        debug!(layers = layers.len(); "bound parameter blob");
        Ok(())
    }
}

fn put_len(buf: &mut Vec<u8>, what: &'static str, value: usize) -> Result<()> {
    let value32 = u32::try_from(value).map_err(|_| CodecError::Oversized { what, value })?;
    buf.extend_from_slice(&value32.to_le_bytes());
    Ok(())
}

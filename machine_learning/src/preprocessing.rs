//! Conversion of captured canvas pixels into model inputs.

use tensor::{Result, ShapeError, Tensor, TensorSource};

const CHANNELS: usize = 4;
const SCALE: f32 = 1. / 255.;

/// Turns a row-major RGBA buffer into a single channel tensor in `[0, 1]`.
///
/// The alpha channel is dropped, the raw RGB values of each pixel are averaged and only then
/// scaled by `1 / 255`.
///
/// # Arguments
/// * `pixels` - `width * height * 4` bytes.
/// * `width`, `height` - The dimensions of the captured image.
/// * `target_shape` - The shape of the resulting tensor, holding `width * height` elements.
///
/// # Returns
/// The preprocessed tensor or a `ShapeError` if the buffer length or the target shape don't
/// match the dimensions.
pub fn preprocess(
    pixels: &[u8],
    width: usize,
    height: usize,
    target_shape: &[usize],
) -> Result<Tensor> {
    let source = TensorSource::new(pixels);
    let area = width
        .checked_mul(height)
        .ok_or_else(|| ShapeError::InvalidShape(vec![height, width]))?;
    let expected = area
        .checked_mul(CHANNELS)
        .ok_or_else(|| ShapeError::InvalidShape(vec![height, width, CHANNELS]))?;

    if source.len() != expected {
        return Err(ShapeError::CountMismatch {
            what: "rgba pixels",
            got: source.len(),
            expected,
        });
    }

    let intensity = source
        .as_u8()
        .chunks_exact(CHANNELS)
        .map(|px| {
            let sum = px[0] as u16 + px[1] as u16 + px[2] as u16;
            sum as f32 / 3. * SCALE
        })
        .collect();

    Tensor::from_vec(&[area], intensity)?.reshape(target_shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_and_black() {
        let white = [255u8; 16];
        let black = [0, 0, 0, 255].repeat(4);

        let t = preprocess(&white, 2, 2, &[2, 2, 1]).unwrap();
        assert_eq!(t.shape(), &[2, 2, 1]);
        assert_eq!(t.as_slice(), &[1.0; 4]);

        let t = preprocess(&black, 2, 2, &[2, 2, 1]).unwrap();
        assert_eq!(t.as_slice(), &[0.0; 4]);
    }

    #[test]
    fn alpha_is_ignored() {
        let t = preprocess(&[255, 255, 255, 0], 1, 1, &[1]).unwrap();
        assert_eq!(t.as_slice(), &[1.0]);
    }

    #[test]
    fn averages_raw_values_before_scaling() {
        let t = preprocess(&[1, 2, 4, 255, 10, 20, 31, 255], 2, 1, &[1, 2]).unwrap();

        assert_eq!(t.as_slice()[0], 7. / 3. * SCALE);
        assert_eq!(t.as_slice()[1], 61. / 3. * SCALE);
    }

    #[test]
    fn keeps_row_major_order() {
        let mut pixels = Vec::new();
        for v in [0u8, 51, 102, 153, 204, 255] {
            pixels.extend([v, v, v, 255]);
        }

        let t = preprocess(&pixels, 3, 2, &[2, 3, 1]).unwrap();
        let got: Vec<u8> = t.as_slice().iter().map(|v| (v * 255.).round() as u8).collect();

        assert_eq!(got, [0, 51, 102, 153, 204, 255]);
    }

    #[test]
    fn wrong_buffer_length_fails() {
        let err = preprocess(&[0; 15], 2, 2, &[2, 2, 1]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::CountMismatch {
                what: "rgba pixels",
                got: 15,
                expected: 16
            }
        );
    }

    #[test]
    fn wrong_target_shape_fails() {
        let err = preprocess(&[0; 16], 2, 2, &[28, 28, 1]).unwrap_err();
        assert!(matches!(err, ShapeError::CountMismatch { got: 4, expected: 784, .. }));
    }
}

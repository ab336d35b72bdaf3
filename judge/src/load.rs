use std::{fs, path::Path};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::info;
use machine_learning::{
    Dataset,
    arch::builder::{CLASSES, INPUT_SIZE},
};

use crate::config::DatasetSource;

/// Whether the file holds base64 text rather than raw bytes.
fn is_text(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("txt" | "b64")
    )
}

/// Reads a parameter blob, decoding the base64 transport encoding of `.txt` and `.b64` files.
pub fn read_blob(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;

    if !is_text(path) {
        return Ok(bytes);
    }

    let text: Vec<u8> = bytes
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(text)
        .with_context(|| format!("'{}' is not valid base64", path.display()))
}

/// Writes a parameter blob, base64 encoded for `.txt` and `.b64` files.
pub fn write_blob(path: &Path, bytes: &[u8]) -> Result<()> {
    let result = if is_text(path) {
        fs::write(path, STANDARD.encode(bytes))
    } else {
        fs::write(path, bytes)
    };

    result.with_context(|| format!("cannot write '{}'", path.display()))
}

pub fn read_dataset(source: &DatasetSource) -> Result<Dataset> {
    let dataset = match source {
        DatasetSource::Csv { path } => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read dataset '{}'", path.display()))?;
            Dataset::from_csv(&text, CLASSES)
                .with_context(|| format!("invalid dataset '{}'", path.display()))?
        }
        DatasetSource::Raw { pixels, labels } => {
            let x = fs::read(pixels)
                .with_context(|| format!("cannot read pixels '{}'", pixels.display()))?;
            let y = fs::read(labels)
                .with_context(|| format!("cannot read labels '{}'", labels.display()))?;
            Dataset::from_raw(&x, &y, INPUT_SIZE, CLASSES).context("invalid raw dataset")?
        }
    };

    info!(samples = dataset.len(), features = dataset.features(); "dataset loaded");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blobs_round_trip_through_base64() {
        let dir = std::env::temp_dir().join(format!("judge-load-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let bytes = [0u8, 1, 2, 250, 255];
        for name in ["blob.bin", "blob.marshal.txt"] {
            let path = dir.join(name);
            write_blob(&path, &bytes).unwrap();
            assert_eq!(read_blob(&path).unwrap(), bytes);
        }

        assert_eq!(fs::read(dir.join("blob.marshal.txt")).unwrap(), b"AAEC+v8=");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn base64_line_breaks_are_ignored() {
        let dir = std::env::temp_dir().join(format!("judge-wrap-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blob.b64");

        fs::write(&path, "AAEC\n+v8=\n").unwrap();
        assert_eq!(read_blob(&path).unwrap(), [0, 1, 2, 250, 255]);

        fs::remove_dir_all(dir).unwrap();
    }
}

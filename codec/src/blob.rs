use machine_learning::Model;
use tensor::Tensor;

use crate::{CodecError, Result};

/// The named tensors of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerParameters {
    id: String,
    tensors: Vec<Tensor>,
}

impl LayerParameters {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|t| t.shape().to_vec()).collect()
    }
}

/// An ordered mapping from layer identifier to that layer's parameter tensors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBlob {
    layers: Vec<LayerParameters>,
}

impl ParameterBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the parameters of a layer.
    ///
    /// # Errors
    /// `CodecError::DuplicateLayer` if `id` is already present.
    pub fn push(&mut self, id: impl Into<String>, tensors: Vec<Tensor>) -> Result<()> {
        let id = id.into();

        if self.get(&id).is_some() {
            return Err(CodecError::DuplicateLayer(id));
        }

        self.layers.push(LayerParameters { id, tensors });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&LayerParameters> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerParameters> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Snapshots the current parameters of a model.
    ///
    /// # Arguments
    /// * `model` - The model whose flat parameter buffer gets split per layer and tensor.
    ///
    /// # Returns
    /// A blob that binds back onto any model with the same layout.
    pub fn from_model<M: Model + ?Sized>(model: &M) -> Result<Self> {
        let mut blob = Self::new();
        let mut params = model.params();

        for info in model.layers() {
            let mut tensors = Vec::with_capacity(info.shapes.len());

            for shape in &info.shapes {
                let len = tensor::element_count(shape)?;
                if len > params.len() {
                    return Err(CodecError::Truncated {
                        offset: model.params().len() - params.len(),
                        needed: len,
                        available: params.len(),
                    });
                }

                let (head, rest) = params.split_at(len);
                tensors.push(Tensor::from_vec(shape, head.to_vec())?);
                params = rest;
            }

            blob.push(info.id, tensors)?;
        }

        Ok(blob)
    }
}

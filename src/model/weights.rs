//! Parameter bundles
//!
//! A bundle is the model config plus every named parameter as a flat f32
//! vector with its shape, serialized with bincode. Loading copies values
//! into the existing parameters in place.

use super::config::ModelConfig;
use super::transformer::SwipeTransformer;
use crate::error::{SwipeError, SwipeResult};
use candle_core::{Device, Tensor};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub config: ModelConfig,
    pub tensors: Vec<TensorData>,
}

fn lock_poisoned<T>(_: T) -> SwipeError {
    SwipeError::Weights("parameter map lock poisoned".into())
}

impl SwipeTransformer {
    /// Snapshot every parameter, sorted by name.
    pub fn to_bundle(&self) -> SwipeResult<ModelBundle> {
        let vars = self.varmap().data().lock().map_err(lock_poisoned)?;
        let mut tensors = Vec::with_capacity(vars.len());
        for (name, var) in vars.iter() {
            tensors.push(TensorData {
                name: name.clone(),
                shape: var.dims().to_vec(),
                data: var.flatten_all()?.to_vec1::<f32>()?,
            });
        }
        tensors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ModelBundle {
            config: self.config().clone(),
            tensors,
        })
    }

    /// Serialize all parameters into a bincode blob.
    pub fn save_weights(&self) -> SwipeResult<Vec<u8>> {
        Ok(bincode::serialize(&self.to_bundle()?)?)
    }

    /// Overwrite every parameter from a bincode blob produced by `save_weights`.
    pub fn load_weights(&mut self, blob: &[u8]) -> SwipeResult<()> {
        let bundle: ModelBundle = bincode::deserialize(blob)?;
        self.load_bundle(&bundle)
    }

    pub fn load_bundle(&mut self, bundle: &ModelBundle) -> SwipeResult<()> {
        if !bundle.config.same_architecture(self.config()) {
            return Err(SwipeError::Weights(format!(
                "bundle config {:?} does not match model config {:?}",
                bundle.config,
                self.config()
            )));
        }

        let device = self.device().clone();
        let vars = self.varmap().data().lock().map_err(lock_poisoned)?;

        let mut incoming: FxHashMap<&str, &TensorData> = FxHashMap::default();
        for tensor in &bundle.tensors {
            if !vars.contains_key(&tensor.name) {
                return Err(SwipeError::Weights(format!("unknown parameter '{}'", tensor.name)));
            }
            incoming.insert(tensor.name.as_str(), tensor);
        }
        if let Some(missing) = vars.keys().find(|name| !incoming.contains_key(name.as_str())) {
            return Err(SwipeError::Weights(format!("missing parameter '{}'", missing)));
        }

        for (name, var) in vars.iter() {
            let tensor = incoming[name.as_str()];
            let expected = var.elem_count();
            if tensor.shape.as_slice() != var.dims() || tensor.data.len() != expected {
                return Err(SwipeError::Weights(format!(
                    "parameter '{}' has shape {:?} ({} values), expected {:?}",
                    name,
                    tensor.shape,
                    tensor.data.len(),
                    var.dims()
                )));
            }
            let value = Tensor::from_slice(&tensor.data, tensor.shape.as_slice(), &device)?;
            var.set(&value)?;
        }

        info!(parameters = bundle.tensors.len(), "model weights loaded");
        Ok(())
    }

    /// Construct from a blob, taking hyperparameters from the bundle itself.
    pub fn from_blob(blob: &[u8], device: &Device) -> SwipeResult<Self> {
        let bundle: ModelBundle = bincode::deserialize(blob)?;
        let mut model = SwipeTransformer::new(bundle.config.clone(), device)?;
        model.load_bundle(&bundle)?;
        Ok(model)
    }
}

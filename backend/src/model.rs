use std::sync::{Arc, Mutex};
use tch::{CModule, Device, Kind, Tensor};

use crate::config::{ChannelLayout, ModelSpec};
use crate::error::{InferenceError, ModelLoadError};
use crate::preprocess::{PreprocessedTensor, TARGET_SIZE};

/// A loaded image classifier producing one value per class.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Expected (height, width) of the input tensor.
    fn input_size(&self) -> (u32, u32);

    fn forward(&self, tensor: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError>;
}

/// TorchScript classifier. The module is loaded once and never mutated after
/// `set_eval`.
#[derive(Clone)]
pub struct TorchClassifier {
    name: String,
    model: Arc<Mutex<CModule>>,
    device: Device,
    layout: ChannelLayout,
    softmax: bool,
}

impl TorchClassifier {
    pub fn load(spec: &ModelSpec, device: Device) -> Result<Self, ModelLoadError> {
        if !spec.path.is_file() {
            return Err(ModelLoadError::NotFound(spec.path.clone()));
        }

        let mut module =
            CModule::load_on_device(&spec.path, device).map_err(|source| ModelLoadError::Malformed {
                path: spec.path.clone(),
                source,
            })?;
        module.set_eval();

        log::info!(
            "Loaded '{}' from {} on {:?} (layout {:?}, softmax {})",
            spec.name,
            spec.path.display(),
            device,
            spec.layout,
            spec.softmax
        );

        Ok(Self {
            name: spec.name.clone(),
            model: Arc::new(Mutex::new(module)),
            device,
            layout: spec.layout,
            softmax: spec.softmax,
        })
    }
}

impl Classifier for TorchClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> (u32, u32) {
        (TARGET_SIZE, TARGET_SIZE)
    }

    fn forward(&self, tensor: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
        let dims = tensor.dims(self.layout);
        let input = Tensor::f_from_slice(&tensor.to_vec())?
            .f_view(dims.as_slice())?
            .f_to_device(self.device)?;

        let output = {
            let model = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
            tch::no_grad(|| model.forward_ts(&[input]))?
        };

        flatten_output(&output, self.softmax)
    }
}

/// Flattens a model output into one value per class on the CPU. Torch errors
/// come back as `InferenceError::Runtime` instead of panicking.
fn flatten_output(output: &Tensor, softmax: bool) -> Result<Vec<f32>, InferenceError> {
    let output = if softmax {
        output.f_softmax(-1, Kind::Float)?
    } else {
        output.f_to_kind(Kind::Float)?
    };
    // Outputs ending in a permute are not contiguous and cannot be viewed as-is.
    let output = output
        .f_to_device(Device::Cpu)?
        .f_contiguous()?
        .f_view([-1])?;

    Ok(Vec::<f32>::try_from(&output)?)
}

/// Loads every configured model. Any failure is fatal for startup.
pub fn load_models(specs: &[ModelSpec]) -> Result<Vec<Arc<dyn Classifier>>, ModelLoadError> {
    if specs.is_empty() {
        return Err(ModelLoadError::NoModels);
    }

    let device = Device::cuda_if_available();
    specs
        .iter()
        .map(|spec| {
            TorchClassifier::load(spec, device).map(|model| Arc::new(model) as Arc<dyn Classifier>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(path: PathBuf) -> ModelSpec {
        ModelSpec {
            name: "Model 1".to_string(),
            path,
            softmax: false,
            layout: ChannelLayout::Nchw,
        }
    }

    #[test]
    fn no_models_is_an_error() {
        assert!(matches!(load_models(&[]), Err(ModelLoadError::NoModels)));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let path = PathBuf::from("Models/does_not_exist.pt");
        match load_models(&[spec(path.clone())]) {
            Err(ModelLoadError::NotFound(p)) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("missing model loaded"),
        }
    }

    #[test]
    fn garbage_file_is_malformed() {
        let path = std::env::temp_dir().join(format!("ckd-garbage-{}.pt", std::process::id()));
        std::fs::write(&path, b"not a torchscript archive").unwrap();

        let result = TorchClassifier::load(&spec(path.clone()), Device::Cpu);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ModelLoadError::Malformed { .. })));
    }

    #[test]
    fn transposed_output_is_flattened_row_major() {
        let output = Tensor::from_slice(&[0.1f32, 0.2, 0.3, 0.4])
            .view([2, 2])
            .transpose(0, 1);
        assert!(!output.is_contiguous());

        let values = flatten_output(&output, false).unwrap();
        assert_eq!(values, vec![0.1, 0.3, 0.2, 0.4]);
    }

    #[test]
    fn softmax_output_sums_to_one() {
        let output = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0]).view([1, 4]);
        let values = flatten_output(&output, true).unwrap();
        assert_eq!(values.len(), 4);
        assert!((values.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(values[3] > values[0]);
    }
}

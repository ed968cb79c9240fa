use std::{io::Cursor, sync::Arc};

use parking_lot::Mutex;
use tch::{CModule, Device, IValue, Tensor, no_grad};

use crate::{
    engine::{InferenceEngine, Module},
    error::ClassifierError,
    model::{manifest::ModelBundle, registry::ModelRegistry},
    preprocess::PreparedTensor,
    session::{LoadedModel, ModelLoader},
};

/// TorchScript-backed network. The CModule sits behind a lock because the
/// libtorch forward entry point is not reentrant per module instance.
pub struct TorchModule {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModule {
    pub fn from_bundle(bundle: &ModelBundle, device: Device) -> Result<Self, ClassifierError> {
        let mut reader = Cursor::new(bundle.weights.as_slice());
        let mut module = CModule::load_data_on_device(&mut reader, device)
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;
        module.set_eval();
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl Module for TorchModule {
    fn forward(&self, tensor: &PreparedTensor) -> Result<Vec<f32>, ClassifierError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();

        // Every tensor created below is scoped to this call and dropped on
        // all exit paths, so no native buffers accumulate across requests.
        no_grad(|| {
            let input = Tensor::from_slice(tensor.data())
                .reshape(shape.as_slice())
                .to(self.device);

            let module = self.module.lock();
            let output = module
                .forward_is(&[IValue::Tensor(input)])
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            // Traced models may return a bare tensor or a tuple with the
            // scores first.
            let scores = match output {
                IValue::Tensor(t) => t,
                IValue::Tuple(ref tuple) if !tuple.is_empty() => match &tuple[0] {
                    IValue::Tensor(t) => t.shallow_clone(),
                    _ => {
                        return Err(ClassifierError::Inference(
                            "expected tensor as first tuple element".into(),
                        ));
                    }
                },
                _ => {
                    return Err(ClassifierError::Inference(
                        "unexpected model output format".into(),
                    ));
                }
            };

            let scores = scores.squeeze_dim(0).to(Device::Cpu);
            Vec::<f32>::try_from(&scores).map_err(|e| ClassifierError::Inference(e.to_string()))
        })
    }
}

/// Wires the registry to a ready-to-classify model on a device.
pub struct TorchLoader {
    registry: Arc<ModelRegistry>,
    device: Device,
}

impl TorchLoader {
    pub fn new(registry: Arc<ModelRegistry>, device: Device) -> Self {
        Self { registry, device }
    }
}

impl ModelLoader for TorchLoader {
    fn load(&self) -> Result<LoadedModel, ClassifierError> {
        let (bundle, labels) = self.registry.resolve()?;
        let module = TorchModule::from_bundle(&bundle, self.device)?;
        let engine = InferenceEngine::new(
            Box::new(module),
            bundle.manifest.input_shape(),
            bundle.manifest.output_dim,
        );
        Ok(LoadedModel { engine, labels })
    }

    fn invalidate(&self) {
        self.registry.invalidate();
    }
}

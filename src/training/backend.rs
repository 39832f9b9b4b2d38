//! Training backend seam.
//!
//! Owns model architecture and optimization internals. The orchestrator
//! only sees fit, infer, and a single gradient step.

use crate::core::{Error, ParameterMap, Result, Tensor};
use crate::module::{ModuleConfig, ModuleDims, TrainedModule};
use async_trait::async_trait;

/// One encoded training record.
#[derive(Clone, Debug)]
pub struct EncodedRecord {
    /// Fixed-width numeric encoding
    pub encoding: Vec<f32>,
    /// Class label
    pub label: usize,
}

/// Output of a forward pass.
#[derive(Clone, Debug)]
pub struct Inference {
    /// Pooled hidden-feature vector (width = hidden_width)
    pub pooled: Vec<f32>,
    /// Class logits (width = class_count)
    pub logits: Vec<f32>,
}

/// Training backend seam.
///
/// `fit` runs the full optimization loop for one module. `infer` is the
/// deterministic forward pass. `logit_step` applies one optimizer step
/// given an upstream gradient on the logits, so callers such as the
/// distiller can define their own loss without owning backprop.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Train a module from scratch on an encoded corpus.
    async fn fit(&self, config: &ModuleConfig, corpus: &[EncodedRecord]) -> Result<TrainedModule>;

    /// Forward pass: pooled features and logits for one encoding.
    fn infer(&self, module: &TrainedModule, encoding: &[f32]) -> Result<Inference>;

    /// One optimizer step from a gradient on the logits.
    fn logit_step(
        &self,
        module: &mut TrainedModule,
        encoding: &[f32],
        grad_logits: &[f32],
        learning_rate: f32,
    ) -> Result<()>;
}

/// Parameter tensor names used by [`LinearBackend`].
const ENCODER_WEIGHT: &str = "encoder.weight";
const ENCODER_BIAS: &str = "encoder.bias";
const CLASSIFIER_WEIGHT: &str = "classifier.weight";
const CLASSIFIER_BIAS: &str = "classifier.bias";

/// Demonstration-grade backend: a two-layer linear model trained with
/// plain SGD on cross-entropy.
///
/// encoder (E -> H, relu) produces the pooled feature vector; classifier
/// (H -> C) produces logits.
#[derive(Clone, Debug)]
pub struct LinearBackend {
    /// Pooled hidden-feature width
    pub hidden_width: usize,
    /// Output class count
    pub class_count: usize,
}

impl LinearBackend {
    /// Create a backend with the given hidden width and class count.
    pub fn new(hidden_width: usize, class_count: usize) -> Self {
        Self {
            hidden_width,
            class_count,
        }
    }

    fn tensor<'a>(module: &'a TrainedModule, name: &str) -> Result<&'a Tensor> {
        module
            .parameters
            .get(name)
            .ok_or_else(|| Error::SchemaMismatch(format!("missing parameter tensor {}", name)))
    }

    /// Forward pass returning the pre-activation hidden vector as well,
    /// for relu masking during the backward step.
    fn forward(module: &TrainedModule, encoding: &[f32]) -> Result<(Vec<f32>, Inference)> {
        let dims = module.dims;
        if encoding.len() != dims.encoding_width {
            return Err(Error::InvalidParameter(format!(
                "encoding width {} does not match module width {}",
                encoding.len(),
                dims.encoding_width
            )));
        }

        let enc_w = Self::tensor(module, ENCODER_WEIGHT)?;
        let enc_b = Self::tensor(module, ENCODER_BIAS)?;
        let cls_w = Self::tensor(module, CLASSIFIER_WEIGHT)?;
        let cls_b = Self::tensor(module, CLASSIFIER_BIAS)?;

        let mut pre = vec![0.0; dims.hidden_width];
        for h in 0..dims.hidden_width {
            let row = &enc_w.data[h * dims.encoding_width..(h + 1) * dims.encoding_width];
            pre[h] = row
                .iter()
                .zip(encoding.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + enc_b.data[h];
        }

        let pooled: Vec<f32> = pre.iter().map(|v| v.max(0.0)).collect();

        let mut logits = vec![0.0; dims.class_count];
        for c in 0..dims.class_count {
            let row = &cls_w.data[c * dims.hidden_width..(c + 1) * dims.hidden_width];
            logits[c] = row
                .iter()
                .zip(pooled.iter())
                .map(|(w, p)| w * p)
                .sum::<f32>()
                + cls_b.data[c];
        }

        Ok((pre, Inference { pooled, logits }))
    }

    /// Backpropagate a logit gradient through both layers and apply it.
    fn apply_step(
        module: &mut TrainedModule,
        encoding: &[f32],
        grad_logits: &[f32],
        learning_rate: f32,
    ) -> Result<()> {
        let dims = module.dims;
        if grad_logits.len() != dims.class_count {
            return Err(Error::InvalidParameter(format!(
                "logit gradient width {} does not match class count {}",
                grad_logits.len(),
                dims.class_count
            )));
        }

        let (pre, inference) = Self::forward(module, encoding)?;

        // Gradient wrt pooled features, before touching the weights.
        let cls_w = Self::tensor(module, CLASSIFIER_WEIGHT)?;
        let mut grad_pooled = vec![0.0; dims.hidden_width];
        for c in 0..dims.class_count {
            let row = &cls_w.data[c * dims.hidden_width..(c + 1) * dims.hidden_width];
            for h in 0..dims.hidden_width {
                grad_pooled[h] += grad_logits[c] * row[h];
            }
        }

        // Classifier layer update.
        {
            let cls_w = module
                .parameters
                .get_mut(CLASSIFIER_WEIGHT)
                .ok_or_else(|| Error::SchemaMismatch(CLASSIFIER_WEIGHT.to_string()))?;
            for c in 0..dims.class_count {
                for h in 0..dims.hidden_width {
                    cls_w.data[c * dims.hidden_width + h] -=
                        learning_rate * grad_logits[c] * inference.pooled[h];
                }
            }
            let cls_b = module
                .parameters
                .get_mut(CLASSIFIER_BIAS)
                .ok_or_else(|| Error::SchemaMismatch(CLASSIFIER_BIAS.to_string()))?;
            for c in 0..dims.class_count {
                cls_b.data[c] -= learning_rate * grad_logits[c];
            }
        }

        // Encoder layer update through the relu mask.
        {
            let enc_w = module
                .parameters
                .get_mut(ENCODER_WEIGHT)
                .ok_or_else(|| Error::SchemaMismatch(ENCODER_WEIGHT.to_string()))?;
            for h in 0..dims.hidden_width {
                if pre[h] <= 0.0 {
                    continue;
                }
                for e in 0..dims.encoding_width {
                    enc_w.data[h * dims.encoding_width + e] -=
                        learning_rate * grad_pooled[h] * encoding[e];
                }
            }
            let enc_b = module
                .parameters
                .get_mut(ENCODER_BIAS)
                .ok_or_else(|| Error::SchemaMismatch(ENCODER_BIAS.to_string()))?;
            for h in 0..dims.hidden_width {
                if pre[h] > 0.0 {
                    enc_b.data[h] -= learning_rate * grad_pooled[h];
                }
            }
        }

        Ok(())
    }

    fn initial_parameters(&self, encoding_width: usize) -> ParameterMap {
        let mut params = ParameterMap::new();
        params.insert(
            ENCODER_WEIGHT.to_string(),
            Tensor::randn(&[self.hidden_width, encoding_width]),
        );
        params.insert(ENCODER_BIAS.to_string(), Tensor::zeros(&[self.hidden_width]));
        params.insert(
            CLASSIFIER_WEIGHT.to_string(),
            Tensor::randn(&[self.class_count, self.hidden_width]),
        );
        params.insert(
            CLASSIFIER_BIAS.to_string(),
            Tensor::zeros(&[self.class_count]),
        );
        params
    }
}

impl Default for LinearBackend {
    fn default() -> Self {
        Self::new(16, 2)
    }
}

#[async_trait]
impl TrainingBackend for LinearBackend {
    async fn fit(&self, config: &ModuleConfig, corpus: &[EncodedRecord]) -> Result<TrainedModule> {
        config.validate()?;
        if corpus.is_empty() {
            return Err(Error::EmptyInput(format!(
                "no encoded records for module {}",
                config.name
            )));
        }

        let dims = ModuleDims {
            encoding_width: config.max_sequence_length,
            hidden_width: self.hidden_width,
            class_count: self.class_count,
        };
        let mut module =
            TrainedModule::new(&config.name, self.initial_parameters(dims.encoding_width), dims);

        for _epoch in 0..config.epochs {
            for batch in corpus.chunks(config.batch_size) {
                let batch_scale = 1.0 / batch.len() as f32;
                for record in batch {
                    if record.label >= self.class_count {
                        return Err(Error::InvalidParameter(format!(
                            "label {} out of range for {} classes",
                            record.label, self.class_count
                        )));
                    }
                    let (_, inference) = Self::forward(&module, &record.encoding)?;
                    let mut grad = softmax(&inference.logits);
                    grad[record.label] -= 1.0;
                    for g in &mut grad {
                        *g *= batch_scale;
                    }
                    Self::apply_step(
                        &mut module,
                        &record.encoding,
                        &grad,
                        config.learning_rate,
                    )?;
                }
            }
        }

        Ok(module)
    }

    fn infer(&self, module: &TrainedModule, encoding: &[f32]) -> Result<Inference> {
        Self::forward(module, encoding).map(|(_, inference)| inference)
    }

    fn logit_step(
        &self,
        module: &mut TrainedModule,
        encoding: &[f32],
        grad_logits: &[f32],
        learning_rate: f32,
    ) -> Result<()> {
        Self::apply_step(module, encoding, grad_logits, learning_rate)
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

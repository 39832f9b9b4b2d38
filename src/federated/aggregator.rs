//! Parameter aggregation for federated training.
//!
//! Implements FedAvg over trained modules and differential privacy.

use crate::core::{now, Error, Result};
use crate::module::TrainedModule;
use std::sync::Arc;
use tracing::info;

/// Name given to the averaged global module.
const GLOBAL_MODULE_NAME: &str = "federated_global";

/// Federated aggregator: unweighted averaging plus privacy noise.
#[derive(Clone, Debug)]
pub struct FederatedAggregator {
    /// Per-parameter sensitivity bound used for privacy calibration.
    ///
    /// Fixed at 1.0. A production deployment would calibrate this per
    /// parameter; the fixed bound is a deliberate simplification.
    pub sensitivity: f32,
}

impl FederatedAggregator {
    /// Create an aggregator with the fixed sensitivity bound.
    pub fn new() -> Self {
        Self { sensitivity: 1.0 }
    }

    /// Average the parameters of several trained modules.
    ///
    /// Every module contributes equal weight regardless of its training
    /// corpus size; this unweighted mean is a deliberate design choice.
    /// All inputs must share an identical parameter schema. Inputs are
    /// never mutated; the result is a fresh module.
    pub fn average(&self, modules: &[Arc<TrainedModule>]) -> Result<TrainedModule> {
        let first = modules
            .first()
            .ok_or_else(|| Error::EmptyInput("no modules to average".to_string()))?;

        for module in &modules[1..] {
            if !first.schema_matches(module) {
                return Err(Error::SchemaMismatch(format!(
                    "module {} does not match schema of {}",
                    module.name, first.name
                )));
            }
        }

        let count = modules.len() as f32;
        let mut averaged = first.parameters.clone();
        for (name, tensor) in averaged.iter_mut() {
            for module in &modules[1..] {
                // Schema already checked; the name is present.
                let other = &module.parameters[name.as_str()];
                for (a, b) in tensor.data.iter_mut().zip(other.data.iter()) {
                    *a += b;
                }
            }
            for a in &mut tensor.data {
                *a /= count;
            }
        }

        info!(modules = modules.len(), "federated averaging complete");
        Ok(TrainedModule {
            name: GLOBAL_MODULE_NAME.to_string(),
            parameters: averaged,
            dims: first.dims,
            version: 1,
            trained_at: now(),
        })
    }

    /// Add differential-privacy noise to every parameter tensor.
    ///
    /// Consumes the module so no caller can keep aliasing a clean view of
    /// the same parameters. Noise is zero-mean Gaussian with scale
    /// `sensitivity / epsilon`: smaller epsilon, larger noise, stronger
    /// privacy, weaker fidelity.
    pub fn apply_privacy(&self, mut module: TrainedModule, epsilon: f32) -> Result<TrainedModule> {
        if epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be strictly positive, got {}",
                epsilon
            )));
        }

        let scale = self.sensitivity / epsilon;
        let mut rng = rand::thread_rng();

        for tensor in module.parameters.values_mut() {
            for value in &mut tensor.data {
                *value += gaussian_noise(&mut rng, scale);
            }
        }

        info!(module = %module.name, epsilon, scale, "privacy noise applied");
        Ok(module)
    }
}

impl Default for FederatedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample zero-mean Gaussian noise via the Box-Muller transform.
fn gaussian_noise<R: rand::Rng>(rng: &mut R, scale: f32) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
    let u2: f32 = rng.gen::<f32>();
    let standard = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    standard * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParameterMap, Tensor};
    use crate::module::ModuleDims;

    fn dims() -> ModuleDims {
        ModuleDims {
            encoding_width: 4,
            hidden_width: 3,
            class_count: 2,
        }
    }

    fn module_with(name: &str, value: f32) -> Arc<TrainedModule> {
        let mut params = ParameterMap::new();
        params.insert(
            "encoder.weight".to_string(),
            Tensor::from_data(&[3, 4], vec![value; 12]).unwrap(),
        );
        params.insert(
            "encoder.bias".to_string(),
            Tensor::from_data(&[3], vec![value; 3]).unwrap(),
        );
        Arc::new(TrainedModule::new(name, params, dims()))
    }

    #[test]
    fn test_average_of_identical_modules_is_identity() {
        for n in 1..=4 {
            let modules: Vec<_> = (0..n).map(|i| module_with(&format!("m{}", i), 0.5)).collect();
            let averaged = FederatedAggregator::new().average(&modules).unwrap();
            for tensor in averaged.parameters.values() {
                for value in &tensor.data {
                    assert!((value - 0.5).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_average_is_elementwise_mean() {
        let modules = vec![module_with("a", 1.0), module_with("b", 3.0)];
        let averaged = FederatedAggregator::new().average(&modules).unwrap();
        for tensor in averaged.parameters.values() {
            for value in &tensor.data {
                assert!((value - 2.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_average_empty_fails() {
        let result = FederatedAggregator::new().average(&[]);
        assert!(matches!(result, Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_average_schema_mismatch_leaves_inputs_unmodified() {
        let a = module_with("a", 1.0);
        let mut params = ParameterMap::new();
        params.insert(
            "encoder.weight".to_string(),
            Tensor::from_data(&[4, 3], vec![2.0; 12]).unwrap(),
        );
        params.insert(
            "encoder.bias".to_string(),
            Tensor::from_data(&[3], vec![2.0; 3]).unwrap(),
        );
        let b = Arc::new(TrainedModule::new("b", params, dims()));

        let result = FederatedAggregator::new().average(&[Arc::clone(&a), Arc::clone(&b)]);
        assert!(matches!(result, Err(Error::SchemaMismatch(_))));

        // Inputs untouched.
        assert!(a.parameters["encoder.weight"].data.iter().all(|v| *v == 1.0));
        assert!(b.parameters["encoder.weight"].data.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_average_does_not_mutate_inputs() {
        let a = module_with("a", 1.0);
        let b = module_with("b", 3.0);
        FederatedAggregator::new()
            .average(&[Arc::clone(&a), Arc::clone(&b)])
            .unwrap();
        assert!(a.parameters["encoder.weight"].data.iter().all(|v| *v == 1.0));
        assert!(b.parameters["encoder.weight"].data.iter().all(|v| *v == 3.0));
    }

    #[test]
    fn test_privacy_rejects_non_positive_epsilon() {
        let aggregator = FederatedAggregator::new();
        let module = Arc::try_unwrap(module_with("m", 0.0)).unwrap();
        assert!(matches!(
            aggregator.apply_privacy(module.clone(), 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            aggregator.apply_privacy(module, -1.0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_privacy_perturbs_parameters() {
        let aggregator = FederatedAggregator::new();
        let module = Arc::try_unwrap(module_with("m", 0.0)).unwrap();
        let noised = aggregator.apply_privacy(module, 1.0).unwrap();
        let perturbed = noised.parameters["encoder.weight"]
            .data
            .iter()
            .any(|v| *v != 0.0);
        assert!(perturbed);
    }

    #[test]
    fn test_larger_epsilon_means_smaller_noise() {
        let aggregator = FederatedAggregator::new();

        let mean_abs = |epsilon: f32| -> f32 {
            let mut total = 0.0;
            let mut count = 0usize;
            for _ in 0..20 {
                let module = Arc::try_unwrap(module_with("m", 0.0)).unwrap();
                let noised = aggregator.apply_privacy(module, epsilon).unwrap();
                for tensor in noised.parameters.values() {
                    total += tensor.data.iter().map(|v| v.abs()).sum::<f32>();
                    count += tensor.len();
                }
            }
            total / count as f32
        };

        // Expected magnitudes differ by two orders; repeated trials make
        // the comparison statistically safe.
        assert!(mean_abs(0.1) > mean_abs(10.0));
    }
}

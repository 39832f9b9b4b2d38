//! Knowledge distillation.
//!
//! Trains a small student module to mimic a larger teacher's output
//! distribution, softened by a temperature parameter.

use crate::core::{Error, Result};
use crate::data::{Corpus, Encoder};
use crate::module::TrainedModule;
use crate::training::backend::{softmax, EncodedRecord, TrainingBackend};
use std::sync::Arc;
use tracing::info;

/// Distillation hyperparameters.
#[derive(Clone, Debug)]
pub struct DistillConfig {
    /// Softening temperature (positive). Above 1 softens both
    /// distributions, making the signal more informative near decision
    /// boundaries at the cost of contrast.
    pub temperature: f32,
    /// Epoch count, the sole stopping rule (positive)
    pub epochs: usize,
    /// Student learning rate
    pub learning_rate: f32,
    /// Batch size for walking the corpus in order
    pub batch_size: usize,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            temperature: 3.0,
            epochs: 5,
            learning_rate: 1e-4,
            batch_size: 32,
        }
    }
}

impl DistillConfig {
    fn validate(&self) -> Result<()> {
        if self.temperature <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "temperature must be strictly positive, got {}",
                self.temperature
            )));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidParameter(
                "epoch count must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidParameter(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Teacher-to-student knowledge transfer.
pub struct Distiller {
    backend: Arc<dyn TrainingBackend>,
}

impl Distiller {
    /// Create a distiller over a training backend.
    pub fn new(backend: Arc<dyn TrainingBackend>) -> Self {
        Self { backend }
    }

    /// Distill the teacher's behavior into the student.
    ///
    /// The teacher is inference-only and never updated. Batches follow
    /// corpus order; no shuffling happens here. The training signal is
    /// the KL divergence between the temperature-softened student and
    /// teacher distributions, averaged per batch; each batch triggers one
    /// optimizer step on the student. Consumes the student and returns it
    /// mutated.
    pub fn distill(
        &self,
        teacher: &TrainedModule,
        mut student: TrainedModule,
        corpus: &Corpus,
        encoder: &dyn Encoder,
        config: &DistillConfig,
    ) -> Result<TrainedModule> {
        config.validate()?;
        if corpus.is_empty() {
            return Err(Error::EmptyInput("distillation corpus is empty".to_string()));
        }
        if teacher.dims.class_count != student.dims.class_count {
            return Err(Error::SchemaMismatch(format!(
                "teacher has {} classes, student has {}",
                teacher.dims.class_count, student.dims.class_count
            )));
        }

        let encoded = encode_for(teacher, student.dims.encoding_width, corpus, encoder)?;
        let temperature = config.temperature;

        for epoch in 0..config.epochs {
            let mut epoch_loss = 0.0;
            let mut batches = 0usize;

            for batch in encoded.chunks(config.batch_size) {
                let mut batch_loss = 0.0;
                for record in batch {
                    let teacher_probs = self.softened(teacher, record, temperature)?;
                    let student_logits =
                        self.backend.infer(&student, &record.encoding)?.logits;
                    let scaled: Vec<f32> =
                        student_logits.iter().map(|l| l / temperature).collect();
                    let student_probs = softmax(&scaled);

                    batch_loss += kl_divergence(&teacher_probs, &student_probs);

                    // d(KL)/d(student_logits) for softened softmax targets.
                    let grad: Vec<f32> = student_probs
                        .iter()
                        .zip(teacher_probs.iter())
                        .map(|(s, t)| (s - t) / (temperature * batch.len() as f32))
                        .collect();
                    self.backend.logit_step(
                        &mut student,
                        &record.encoding,
                        &grad,
                        config.learning_rate,
                    )?;
                }
                epoch_loss += batch_loss / batch.len() as f32;
                batches += 1;
            }

            info!(
                epoch,
                loss = epoch_loss / batches as f32,
                "distillation epoch complete"
            );
        }

        student.version += 1;
        Ok(student)
    }

    /// Mean softened KL divergence of the student from the teacher over
    /// a corpus. Useful for validating a distillation run.
    pub fn divergence(
        &self,
        teacher: &TrainedModule,
        student: &TrainedModule,
        corpus: &Corpus,
        encoder: &dyn Encoder,
        temperature: f32,
    ) -> Result<f32> {
        if corpus.is_empty() {
            return Err(Error::EmptyInput("divergence corpus is empty".to_string()));
        }

        let encoded = encode_for(teacher, student.dims.encoding_width, corpus, encoder)?;
        let mut total = 0.0;
        for record in &encoded {
            let teacher_probs = self.softened(teacher, record, temperature)?;
            let student_logits = self.backend.infer(student, &record.encoding)?.logits;
            let scaled: Vec<f32> = student_logits.iter().map(|l| l / temperature).collect();
            total += kl_divergence(&teacher_probs, &softmax(&scaled));
        }
        Ok(total / encoded.len() as f32)
    }

    fn softened(
        &self,
        teacher: &TrainedModule,
        record: &EncodedRecord,
        temperature: f32,
    ) -> Result<Vec<f32>> {
        let logits = self.backend.infer(teacher, &record.encoding)?.logits;
        let scaled: Vec<f32> = logits.iter().map(|l| l / temperature).collect();
        Ok(softmax(&scaled))
    }
}

fn encode_for(
    teacher: &TrainedModule,
    student_width: usize,
    corpus: &Corpus,
    encoder: &dyn Encoder,
) -> Result<Vec<EncodedRecord>> {
    if teacher.dims.encoding_width != student_width {
        return Err(Error::SchemaMismatch(format!(
            "teacher encoding width {} does not match student width {}",
            teacher.dims.encoding_width, student_width
        )));
    }

    Ok(corpus
        .records
        .iter()
        .map(|record| EncodedRecord {
            encoding: encoder.encode(&record.text, student_width),
            label: record.label,
        })
        .collect())
}

/// KL divergence of `q` from `p` over probability vectors.
fn kl_divergence(p: &[f32], q: &[f32]) -> f32 {
    p.iter()
        .zip(q.iter())
        .filter(|(pi, _)| **pi > 0.0)
        .map(|(pi, qi)| pi * (pi / qi.max(f32::MIN_POSITIVE)).ln())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HashingEncoder, TextRecord};
    use crate::module::ModuleConfig;
    use crate::training::backend::LinearBackend;

    fn toy_corpus() -> Corpus {
        let records = (0..8)
            .map(|i| TextRecord::new(&format!("regulation clause variant {}", i), i % 2))
            .collect();
        Corpus::from_records(records)
    }

    fn train_config(name: &str, epochs: usize) -> ModuleConfig {
        ModuleConfig::new(name, "base", vec!["ds".to_string()])
            .with_max_sequence_length(12)
            .with_epochs(epochs)
            .with_batch_size(4)
            .with_learning_rate(0.05)
    }

    async fn fit(backend: &LinearBackend, name: &str, epochs: usize) -> TrainedModule {
        let encoder = HashingEncoder::new();
        let encoded: Vec<EncodedRecord> = toy_corpus()
            .records
            .iter()
            .map(|r| EncodedRecord {
                encoding: encoder.encode(&r.text, 12),
                label: r.label,
            })
            .collect();
        backend
            .fit(&train_config(name, epochs), &encoded)
            .await
            .unwrap()
    }

    #[test]
    fn test_kl_divergence_zero_for_identical() {
        let p = vec![0.25, 0.75];
        assert!(kl_divergence(&p, &p).abs() < 1e-6);
    }

    #[test]
    fn test_kl_divergence_positive_for_different() {
        assert!(kl_divergence(&[0.9, 0.1], &[0.1, 0.9]) > 0.0);
    }

    #[tokio::test]
    async fn test_distill_rejects_bad_temperature() {
        let backend = Arc::new(LinearBackend::new(4, 2));
        let teacher = fit(&backend, "teacher", 20).await;
        let student = fit(&backend, "student", 1).await;
        let distiller = Distiller::new(backend);

        for temperature in [0.0, -1.0] {
            let config = DistillConfig {
                temperature,
                ..Default::default()
            };
            let result = distiller.distill(
                &teacher,
                student.clone(),
                &toy_corpus(),
                &HashingEncoder::new(),
                &config,
            );
            assert!(matches!(result, Err(Error::InvalidParameter(_))));
        }
    }

    #[tokio::test]
    async fn test_distill_leaves_teacher_untouched() {
        let backend = Arc::new(LinearBackend::new(4, 2));
        let teacher = fit(&backend, "teacher", 20).await;
        let student = fit(&backend, "student", 1).await;
        let before = teacher.clone();

        let distiller = Distiller::new(backend);
        distiller
            .distill(
                &teacher,
                student,
                &toy_corpus(),
                &HashingEncoder::new(),
                &DistillConfig::default(),
            )
            .unwrap();

        assert_eq!(teacher.parameters, before.parameters);
    }

    #[tokio::test]
    async fn test_distill_drives_divergence_down() {
        let backend = Arc::new(LinearBackend::new(6, 2));
        let teacher = fit(&backend, "teacher", 40).await;
        let student = fit(&backend, "student", 1).await;

        let distiller = Distiller::new(Arc::clone(&backend) as Arc<dyn TrainingBackend>);
        let encoder = HashingEncoder::new();
        let corpus = toy_corpus();
        let temperature = 2.0;

        let before = distiller
            .divergence(&teacher, &student, &corpus, &encoder, temperature)
            .unwrap();

        let config = DistillConfig {
            temperature,
            epochs: 300,
            learning_rate: 0.05,
            batch_size: 4,
        };
        let student = distiller
            .distill(&teacher, student, &corpus, &encoder, &config)
            .unwrap();

        let after = distiller
            .divergence(&teacher, &student, &corpus, &encoder, temperature)
            .unwrap();

        assert!(after < before, "divergence rose: {} -> {}", before, after);
        assert!(after < 0.05, "divergence did not approach zero: {}", after);
    }
}

use shared::{CLASS_COUNT, ClassLabel, ModelOutcome, PredictionResult};
use std::sync::Arc;

use crate::error::{InferenceError, PreprocessError};
use crate::model::Classifier;
use crate::preprocess::{self, PreprocessedTensor};

/// Index and value of the largest entry. Ties go to the lowest index.
pub fn top_prediction(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((i, p)),
        }
    }
    best
}

pub fn predict(
    tensor: &PreprocessedTensor,
    classifier: &dyn Classifier,
) -> Result<PredictionResult, InferenceError> {
    let (expected_h, expected_w) = classifier.input_size();
    if tensor.height() != expected_h || tensor.width() != expected_w {
        return Err(InferenceError::ShapeMismatch {
            expected_h,
            expected_w,
            actual_h: tensor.height(),
            actual_w: tensor.width(),
        });
    }

    let probabilities = classifier.forward(tensor)?;
    if probabilities.len() != CLASS_COUNT {
        return Err(InferenceError::OutputLength {
            expected: CLASS_COUNT,
            actual: probabilities.len(),
        });
    }

    // Range check only; the output is not required to sum to one.
    if let Some((index, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0 || **v > 1.0)
    {
        return Err(InferenceError::InvalidOutput { index, value });
    }

    let (index, confidence) =
        top_prediction(&probabilities).ok_or(InferenceError::OutputLength {
            expected: CLASS_COUNT,
            actual: 0,
        })?;
    let label = ClassLabel::from_index(index).ok_or(InferenceError::OutputLength {
        expected: CLASS_COUNT,
        actual: probabilities.len(),
    })?;

    Ok(PredictionResult {
        label,
        confidence,
        probabilities,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub width: u32,
    pub height: u32,
    pub outcomes: Vec<ModelOutcome>,
}

/// Runs one upload through every loaded model. Each model's outcome stands on
/// its own: one failing model does not hide the other's result.
#[derive(Clone)]
pub struct DualModelRunner {
    models: Vec<Arc<dyn Classifier>>,
}

impl DualModelRunner {
    pub fn new(models: Vec<Arc<dyn Classifier>>) -> Self {
        Self { models }
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn run(&self, bytes: &[u8]) -> Result<RunOutput, PreprocessError> {
        let image = preprocess::decode(bytes)?;
        let tensor = preprocess::preprocess_image(&image);

        let outcomes = self
            .models
            .iter()
            .map(|model| match predict(&tensor, model.as_ref()) {
                Ok(prediction) => {
                    log::info!(
                        "{}: {} ({:.2}%)",
                        model.name(),
                        prediction.label,
                        prediction.confidence_percent()
                    );
                    ModelOutcome::success(model.name(), prediction)
                }
                Err(e) => {
                    log::error!("{} inference failed: {}", model.name(), e);
                    ModelOutcome::failure(model.name(), e.to_string())
                }
            })
            .collect();

        Ok(RunOutput {
            width: image.width(),
            height: image.height(),
            outcomes,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::preprocess::tests::gradient_png;
    use ndarray::Array3;

    pub(crate) enum Behaviour {
        Output(Vec<f32>),
        Fail,
    }

    pub(crate) struct StubClassifier {
        pub name: String,
        pub input_size: (u32, u32),
        pub behaviour: Behaviour,
    }

    impl StubClassifier {
        pub(crate) fn returning(name: &str, output: Vec<f32>) -> Self {
            Self {
                name: name.to_string(),
                input_size: (200, 200),
                behaviour: Behaviour::Output(output),
            }
        }

        pub(crate) fn failing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                input_size: (200, 200),
                behaviour: Behaviour::Fail,
            }
        }
    }

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn input_size(&self) -> (u32, u32) {
            self.input_size
        }

        fn forward(&self, _tensor: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
            match &self.behaviour {
                Behaviour::Output(v) => Ok(v.clone()),
                Behaviour::Fail => Err(InferenceError::Runtime(tch::TchError::Torch(
                    "stub failure".to_string(),
                ))),
            }
        }
    }

    fn tensor() -> PreprocessedTensor {
        PreprocessedTensor::from_array(Array3::from_elem((1, 200, 200), 0.5))
    }

    #[test]
    fn argmax_picks_first_of_equal_maxima() {
        assert_eq!(top_prediction(&[0.1, 0.4, 0.4, 0.1]), Some((1, 0.4)));
        assert_eq!(top_prediction(&[0.25; 4]), Some((0, 0.25)));
        assert_eq!(top_prediction(&[]), None);
    }

    #[test]
    fn predict_returns_label_and_confidence() {
        let stub = StubClassifier::returning("m", vec![0.05, 0.1, 0.8, 0.05]);
        let result = predict(&tensor(), &stub).unwrap();
        assert_eq!(result.label, ClassLabel::Stone);
        assert!((result.confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.probabilities.len(), 4);
    }

    #[test]
    fn every_index_maps_to_one_of_four_labels() {
        for i in 0..CLASS_COUNT {
            let mut output = vec![0.1; CLASS_COUNT];
            output[i] = 0.7;
            let stub = StubClassifier::returning("m", output);
            let result = predict(&tensor(), &stub).unwrap();
            assert_eq!(result.label.index(), i);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn wrong_input_size_is_rejected_before_forward() {
        let stub = StubClassifier {
            name: "m".to_string(),
            input_size: (224, 224),
            behaviour: Behaviour::Fail,
        };
        let err = predict(&tensor(), &stub).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch {
                expected_h: 224,
                actual_h: 200,
                ..
            }
        ));
    }

    #[test]
    fn wrong_output_length_is_an_inference_error() {
        let stub = StubClassifier::returning("m", vec![0.5, 0.5]);
        let err = predict(&tensor(), &stub).unwrap_err();
        assert!(matches!(err, InferenceError::OutputLength { expected: 4, actual: 2 }));
    }

    #[test]
    fn out_of_range_or_nan_output_is_rejected() {
        let stub = StubClassifier::returning("m", vec![0.1, 2.5, 0.1, 0.1]);
        assert!(matches!(
            predict(&tensor(), &stub),
            Err(InferenceError::InvalidOutput { index: 1, .. })
        ));

        let stub = StubClassifier::returning("m", vec![0.1, 0.1, f32::NAN, 0.1]);
        assert!(matches!(
            predict(&tensor(), &stub),
            Err(InferenceError::InvalidOutput { index: 2, .. })
        ));
    }

    #[test]
    fn unnormalised_output_is_accepted() {
        let stub = StubClassifier::returning("m", vec![0.9, 0.9, 0.1, 0.0]);
        let result = predict(&tensor(), &stub).unwrap();
        assert_eq!(result.label, ClassLabel::Cyst);
    }

    #[test]
    fn one_failing_model_does_not_hide_the_other() {
        let models: Vec<Arc<dyn Classifier>> = vec![
            Arc::new(StubClassifier::failing("Model 1")),
            Arc::new(StubClassifier::returning("Model 2", vec![0.1, 0.6, 0.2, 0.1])),
        ];
        let runner = DualModelRunner::new(models);

        let output = runner.run(&gradient_png(40, 30)).unwrap();
        assert_eq!((output.width, output.height), (40, 30));
        assert_eq!(output.outcomes.len(), 2);

        assert_eq!(output.outcomes[0].model, "Model 1");
        assert!(output.outcomes[0].prediction.is_none());
        assert!(output.outcomes[0].error.as_deref().unwrap().contains("stub failure"));

        let second = output.outcomes[1].prediction.as_ref().unwrap();
        assert_eq!(second.label, ClassLabel::Normal);
        assert_eq!(runner.model_names(), vec!["Model 1", "Model 2"]);
    }

    #[test]
    fn undecodable_upload_fails_the_whole_request() {
        let models: Vec<Arc<dyn Classifier>> = vec![Arc::new(StubClassifier::returning(
            "Model 1",
            vec![1.0, 0.0, 0.0, 0.0],
        ))];
        let runner = DualModelRunner::new(models);
        assert!(matches!(
            runner.run(b"plain text"),
            Err(PreprocessError::Decode(_))
        ));
    }

    /// Needs the exported models under `Models/` and a reference stone scan
    /// at `KIDNEY_STONE_FIXTURE`.
    #[test]
    #[ignore]
    fn reference_stone_scan_is_classified_as_stone() {
        let fixture = std::env::var("KIDNEY_STONE_FIXTURE").expect("KIDNEY_STONE_FIXTURE not set");
        let bytes = std::fs::read(fixture).unwrap();
        let config = crate::config::AppConfig::default();
        let runner = DualModelRunner::new(crate::model::load_models(&config.models).unwrap());

        let output = runner.run(&bytes).unwrap();
        assert!(output.outcomes.iter().any(|o| o
            .prediction
            .as_ref()
            .is_some_and(|p| p.label == ClassLabel::Stone && p.confidence > 0.5)));
    }
}

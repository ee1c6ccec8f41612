use image::GrayImage;
use std::sync::Arc;

use crate::error::Result;

/// Receives every intermediate image while a pipeline runs.
///
/// Index 0 is the pipeline input; step `i` (0-based) reports as `i + 1`.
pub trait StageObserver {
    fn on_stage(&mut self, index: usize, name: &str, image: &GrayImage) -> Result<()>;
}

/// Observer that discards all stages
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&mut self, _index: usize, _name: &str, _image: &GrayImage) -> Result<()> {
        Ok(())
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Transform one grayscale image into another of the same size.
    /// Invalid parameters are reported before any work is done.
    fn process(&self, image: &GrayImage) -> Result<GrayImage>;

    /// Human-readable name for this step (used in logs and stage dumps)
    fn name(&self) -> &str;
}

/// Composable chain of filtering steps
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, stopping at the first error
    pub fn run(&self, input: GrayImage, observer: &mut dyn StageObserver) -> Result<GrayImage> {
        self.run_partial(input, self.steps.len(), observer)
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(
        &self,
        input: GrayImage,
        num_steps: usize,
        observer: &mut dyn StageObserver,
    ) -> Result<GrayImage> {
        observer.on_stage(0, "input", &input)?;

        let mut data = input;
        for (i, step) in self.steps.iter().take(num_steps).enumerate() {
            tracing::debug!(
                pipeline = %self.name,
                "Running step {}: {} ({}x{})",
                i + 1,
                step.name(),
                data.width(),
                data.height()
            );
            data = step.process(&data)?;
            observer.on_stage(i + 1, step.name(), &data)?;
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SegmentationError;
    use image::Luma;

    struct AddStep(u8);

    impl PipelineStep for AddStep {
        fn process(&self, image: &GrayImage) -> Result<GrayImage> {
            let mut out = image.clone();
            for p in out.pixels_mut() {
                *p = Luma([p[0].saturating_add(self.0)]);
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            "Add"
        }
    }

    struct FailStep;

    impl PipelineStep for FailStep {
        fn process(&self, _image: &GrayImage) -> Result<GrayImage> {
            Err(SegmentationError::InvalidParameter("always fails".into()))
        }

        fn name(&self) -> &str {
            "Fail"
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(usize, String, u8)>);

    impl StageObserver for Recorder {
        fn on_stage(&mut self, index: usize, name: &str, image: &GrayImage) -> Result<()> {
            self.0.push((index, name.to_string(), image.get_pixel(0, 0)[0]));
            Ok(())
        }
    }

    #[test]
    fn steps_run_in_order_and_are_observed() {
        let pipeline = Pipeline::new("test")
            .add_step(Arc::new(AddStep(1)))
            .add_step_boxed(Box::new(AddStep(10)));
        let mut recorder = Recorder::default();
        let out = pipeline.run(GrayImage::new(2, 2), &mut recorder).unwrap();
        assert_eq!(out.get_pixel(1, 1)[0], 11);
        assert_eq!(
            recorder.0,
            vec![
                (0, "input".to_string(), 0),
                (1, "Add".to_string(), 1),
                (2, "Add".to_string(), 11),
            ]
        );
    }

    #[test]
    fn partial_run_stops_early() {
        let pipeline = Pipeline::new("test")
            .add_step(Arc::new(AddStep(1)))
            .add_step(Arc::new(AddStep(1)))
            .add_step(Arc::new(AddStep(1)));
        let out = pipeline
            .run_partial(GrayImage::new(1, 1), 2, &mut NoopObserver)
            .unwrap();
        assert_eq!(out.get_pixel(0, 0)[0], 2);
    }

    #[test]
    fn first_error_aborts_the_run() {
        let pipeline = Pipeline::new("test")
            .add_step(Arc::new(FailStep))
            .add_step(Arc::new(AddStep(1)));
        let mut recorder = Recorder::default();
        assert!(pipeline.run(GrayImage::new(1, 1), &mut recorder).is_err());
        assert_eq!(recorder.0.len(), 1);
    }
}

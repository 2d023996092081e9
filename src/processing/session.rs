//! Consumer-side analysis session
//!
//! Owns everything a front end would display: the current file, progress,
//! the latest visualization, a status line and the last prediction. All of
//! it is mutated on the consumer thread while draining coordinator events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{ClassifierService, PredictionResult};
use crate::config::Config;
use crate::error::{GenderError, Result};
use crate::features::FeatureExtractor;
use crate::visualization::{VisualizationData, VisualizationPipeline};
use super::coordinator::{
    AsyncTaskCoordinator, AudioBackend, TaskConsumer, TaskEvent, TaskHandle, TaskId, TaskOutput,
};
use super::progress::{ProgressReporter, ProgressState};

pub struct SessionView {
    classifier: Arc<ClassifierService>,
    reporter: Box<dyn ProgressReporter + Send>,
    progress: ProgressState,
    progress_task: Option<TaskId>,
    visualization_task: Option<TaskId>,
    prediction_task: Option<TaskId>,
    current_file: Option<PathBuf>,
    visualization: Option<VisualizationData>,
    prediction: Option<PredictionResult>,
    prediction_enabled: bool,
    status: String,
}

impl SessionView {
    fn new(classifier: Arc<ClassifierService>, reporter: Box<dyn ProgressReporter + Send>) -> Self {
        Self {
            classifier,
            reporter,
            progress: ProgressState::new(),
            progress_task: None,
            visualization_task: None,
            prediction_task: None,
            current_file: None,
            visualization: None,
            prediction: None,
            prediction_enabled: false,
            status: "Ready".to_string(),
        }
    }

    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn visualization(&self) -> Option<&VisualizationData> {
        self.visualization.as_ref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Progress tracks the current visualization task only.
    fn on_progress(&mut self, id: TaskId, percent: u8) {
        if self.visualization_task != Some(id) {
            return;
        }
        if self.progress_task != Some(id) {
            self.progress_task = Some(id);
            self.progress.reset();
        }
        if self.progress.advance(percent) {
            self.reporter.report(self.progress.value());
        }
    }

    fn on_delivered(&mut self, id: TaskId, output: TaskOutput) {
        match output {
            TaskOutput::Visualization(data) => {
                if self.visualization_task != Some(id) {
                    log::debug!("Dropping visualization of superseded task {}", id);
                    return;
                }
                log::info!("Visualization ready for {}", data.source.display());
                self.status = format!("Loaded: {}", data.source.display());
                self.visualization = Some(*data);
            }
            TaskOutput::Features(features) => {
                if self.prediction_task != Some(id) {
                    log::debug!("Dropping features of superseded task {}", id);
                    return;
                }
                match self.classifier.predict(&features) {
                    Ok(result) => {
                        self.status = format!("Result: {}", result);
                        self.prediction = Some(result);
                    }
                    Err(e) => {
                        log::warn!("Prediction failed: {}", e);
                        self.status = format!("Prediction failed: {}", e);
                    }
                }
            }
        }
    }

    fn on_failed(&mut self, id: TaskId, message: String) {
        if self.visualization_task == Some(id) {
            self.prediction_enabled = false;
            self.status = format!("Failed to load file: {}", message);
        } else if self.prediction_task == Some(id) {
            self.status = format!("Prediction failed: {}", message);
        } else {
            log::debug!("Ignoring failure of superseded task {}: {}", id, message);
        }
    }
}

impl TaskConsumer for SessionView {
    fn on_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress { id, percent } => self.on_progress(id, percent),
            TaskEvent::Delivered { id, output } => self.on_delivered(id, output),
            TaskEvent::Failed { id, message } => self.on_failed(id, message),
        }
    }
}

/// Front-end state plus the coordinator that feeds it.
pub struct AnalysisSession {
    coordinator: AsyncTaskCoordinator,
    extractor: Arc<FeatureExtractor>,
    view: SessionView,
}

impl AnalysisSession {
    /// Build a session around an already loaded classifier.
    pub fn new(
        config: &Config,
        classifier: Arc<ClassifierService>,
        reporter: Box<dyn ProgressReporter + Send>,
    ) -> Result<Self> {
        let extractor = Arc::new(FeatureExtractor::new(config.features.clone())?);
        if extractor.dimension() != classifier.input_dim() {
            return Err(GenderError::model_load(format!(
                "Classifier expects {} features but extractor produces {}",
                classifier.input_dim(), extractor.dimension()
            )));
        }

        let pipeline = VisualizationPipeline::new(config.visualization.clone());
        let backend = AudioBackend::new(pipeline, Arc::clone(&extractor));
        let coordinator = AsyncTaskCoordinator::new(Arc::new(backend))?;

        Ok(Self {
            coordinator,
            extractor,
            view: SessionView::new(classifier, reporter),
        })
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn coordinator(&self) -> &AsyncTaskCoordinator {
        &self.coordinator
    }

    /// Make `path` the current file and start visualizing it.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<TaskHandle> {
        let path = path.as_ref().to_path_buf();
        let handle = self.coordinator.submit(path.clone())?;

        self.view.visualization_task = Some(handle.id());
        self.view.visualization = None;
        self.view.prediction_task = None;
        self.view.prediction = None;
        self.view.prediction_enabled = true;
        self.view.status = format!("Loading: {}", path.display());
        self.view.current_file = Some(path);
        Ok(handle)
    }

    pub fn pump(&mut self) -> usize {
        self.coordinator.dispatch(&mut self.view)
    }

    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        self.coordinator.dispatch_timeout(&mut self.view, timeout)
    }

    /// Pump until `handle` has finished.
    pub fn wait(&mut self, handle: &TaskHandle) -> Result<()> {
        self.coordinator.wait(handle, &mut self.view).map(|_| ())
    }

    fn predictable_file(&self) -> Result<PathBuf> {
        if !self.view.prediction_enabled {
            return Err(GenderError::processing("Prediction is unavailable: load a file first"));
        }
        self.view.current_file.clone()
            .ok_or_else(|| GenderError::processing("No file loaded"))
    }

    /// Extract and classify the current file on the calling thread.
    ///
    /// Blocks until decoding and inference finish. Interactive front ends
    /// use [`request_prediction`](Self::request_prediction) instead.
    pub fn predict(&mut self) -> Result<PredictionResult> {
        let path = self.predictable_file()?;
        let outcome = self.extractor
            .extract(&path)
            .and_then(|features| self.view.classifier.predict(&features));

        match outcome {
            Ok(result) => {
                self.view.status = format!("Result: {}", result);
                self.view.prediction = Some(result);
                Ok(result)
            }
            Err(e) => {
                log::warn!("Prediction failed for {}: {}", path.display(), e);
                self.view.status = format!("Prediction failed: {}", e);
                Err(e)
            }
        }
    }

    /// Queue extraction of the current file behind any pending work; the
    /// result lands in [`SessionView::prediction`] on a later pump.
    pub fn request_prediction(&mut self) -> Result<TaskHandle> {
        let path = self.predictable_file()?;
        let handle = self.coordinator.submit_extraction(path)?;
        self.view.prediction_task = Some(handle.id());
        self.view.status = "Predicting...".to_string();
        Ok(handle)
    }

    pub fn shutdown(&mut self) {
        self.coordinator.shutdown();
        self.pump();
    }
}

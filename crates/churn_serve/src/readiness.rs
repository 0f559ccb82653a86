//! Readiness-gated pipeline handle
//!
//! Starts unready and becomes ready exactly once, when the trained pipeline
//! has been loaded. It is never reset; after that point every reader shares
//! the same immutable pipeline without locking.

use churn_core::{ChurnError, Result, TrainedPipeline};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Default)]
pub struct PipelineHandle {
    inner: Arc<OnceCell<TrainedPipeline>>,
}

impl PipelineHandle {
    /// An unready handle
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is ready from the start
    pub fn ready(pipeline: TrainedPipeline) -> Self {
        let handle = Self::new();
        let _ = handle.inner.set(pipeline);
        handle
    }

    /// Transition to ready. A handle that is already ready keeps its
    /// pipeline and hands the rejected one back.
    pub fn install(&self, pipeline: TrainedPipeline) -> std::result::Result<(), TrainedPipeline> {
        let width = pipeline.metadata.output_width;
        self.inner.set(pipeline)?;
        info!("Pipeline ready ({} output features)", width);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.get().is_some()
    }

    /// The loaded pipeline, or `NotReady`
    pub fn get(&self) -> Result<&TrainedPipeline> {
        self.inner.get().ok_or(ChurnError::NotReady)
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

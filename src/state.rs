//! Application state management

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::convert::{ConversionPipeline, FetchError};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize URL fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("Failed to prepare temp directory: {0}")]
    TempDir(#[from] std::io::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: ConversionPipeline,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Create the application state with the real converters
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let pipeline = ConversionPipeline::from_config(&config.conversion)?;
        Self::with_pipeline(config, pipeline).await
    }

    /// Create the application state around an existing pipeline
    pub async fn with_pipeline(config: Config, pipeline: ConversionPipeline) -> Result<Self, StateError> {
        pipeline.temp().prepare().await?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                started: Instant::now(),
                started_at: Utc::now(),
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion pipeline
    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.inner.pipeline
    }

    /// Seconds since the state was created
    pub fn uptime(&self) -> f64 {
        self.inner.started.elapsed().as_secs_f64()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}

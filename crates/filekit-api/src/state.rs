//! Shared state handed to every handler.

use filekit_pipeline::RequestPipeline;
use filekit_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) pipeline: RequestPipeline,
    pub(crate) telemetry: Metrics,
    /// Location advertised in `/sitemap.xml`.
    pub(crate) site_url: String,
}

impl ApiState {
    pub(crate) fn new(pipeline: RequestPipeline, telemetry: Metrics, site_url: String) -> Self {
        Self {
            pipeline,
            telemetry,
            site_url,
        }
    }
}

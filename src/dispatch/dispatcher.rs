//! Per-request shadow pipeline.
//!
//! # Responsibilities
//! - Capture the inbound request once
//! - Forward to control and experiment (sequentially or concurrently)
//! - Apply the forward-error policy
//! - Compare and hand the result to the aggregator

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use uuid::Uuid;

use crate::compare::{Comparator, Observation};
use crate::config::ScienceConfig;
use crate::dispatch::policy::{DispatchOutcome, ForwardErrorPolicy, Side};
use crate::forward::{BackendTarget, CapturedRequest, ForwardError, ForwardedResponse, Forwarder, TargetError};
use crate::observability::metrics;
use crate::stats::DiffAggregator;

/// Orchestrates capture → forward ×2 → compare → record.
///
/// Holds no per-request state; the aggregator is the only shared mutable part.
pub struct Dispatcher {
    control: BackendTarget,
    experiment: BackendTarget,
    forwarder: Forwarder,
    comparator: Comparator,
    policy: ForwardErrorPolicy,
    parallel_forward: bool,
    max_body_bytes: usize,
    aggregator: Arc<DiffAggregator>,
}

impl Dispatcher {
    /// Build a dispatcher from validated configuration.
    pub fn from_config(
        config: &ScienceConfig,
        aggregator: Arc<DiffAggregator>,
    ) -> Result<Self, TargetError> {
        Ok(Self {
            control: BackendTarget::parse(&config.backends.control)?,
            experiment: BackendTarget::parse(&config.backends.experiment)?,
            forwarder: Forwarder::new(
                config.comparison.strip_headers.clone(),
                config.limits.max_body_bytes,
            ),
            comparator: Comparator::new(config.comparison.mode),
            policy: config.dispatch.on_forward_error,
            parallel_forward: config.dispatch.parallel_forward,
            max_body_bytes: config.limits.max_body_bytes,
            aggregator,
        })
    }

    pub fn aggregator(&self) -> &Arc<DiffAggregator> {
        &self.aggregator
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    pub fn control(&self) -> &BackendTarget {
        &self.control
    }

    pub fn experiment(&self) -> &BackendTarget {
        &self.experiment
    }

    /// Capture and dispatch an inbound request.
    pub async fn handle(&self, request: Request<Body>) -> DispatchOutcome {
        match CapturedRequest::capture(request, self.max_body_bytes).await {
            Ok(captured) => self.dispatch(&captured).await,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping request");
                metrics::record_outcome(DispatchOutcome::Skipped);
                DispatchOutcome::Skipped
            }
        }
    }

    /// Forward a captured request to both backends and record the comparison.
    pub async fn dispatch(&self, request: &CapturedRequest) -> DispatchOutcome {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
            "Dispatching request"
        );

        let observed = if self.parallel_forward {
            let (control, experiment) = tokio::join!(
                self.forward_side(Side::Control, request, request_id),
                self.forward_side(Side::Experiment, request, request_id),
            );
            self.observe(Side::Control, control)
                .zip(self.observe(Side::Experiment, experiment))
        } else {
            match self.observe(
                Side::Control,
                self.forward_side(Side::Control, request, request_id).await,
            ) {
                Some(control) => self
                    .observe(
                        Side::Experiment,
                        self.forward_side(Side::Experiment, request, request_id).await,
                    )
                    .map(|experiment| (control, experiment)),
                None => None,
            }
        };

        let Some((control, experiment)) = observed else {
            metrics::record_outcome(DispatchOutcome::Skipped);
            return DispatchOutcome::Skipped;
        };

        let equal = self.comparator.equal(&control, &experiment);
        let request_dump = if equal { Vec::new() } else { request.dump() };
        self.aggregator
            .record(&request_dump, &control, &experiment, !equal);

        let outcome = if equal {
            DispatchOutcome::Equal
        } else {
            metrics::record_diff(experiment.code(), control.code());
            tracing::info!(
                request_id = %request_id,
                control_status = control.code(),
                experiment_status = experiment.code(),
                "Responses differ"
            );
            DispatchOutcome::Diff
        };
        metrics::record_outcome(outcome);
        outcome
    }

    async fn forward_side(
        &self,
        side: Side,
        request: &CapturedRequest,
        request_id: Uuid,
    ) -> Result<ForwardedResponse, ForwardError> {
        let target = match side {
            Side::Control => &self.control,
            Side::Experiment => &self.experiment,
        };
        let start = Instant::now();
        let result = self.forwarder.forward(request, target).await;
        metrics::record_forward_duration(side, start);

        match &result {
            Ok(res) => tracing::debug!(
                request_id = %request_id,
                side = %side,
                status = res.status(),
                "Backend responded"
            ),
            Err(e) => {
                metrics::record_forward_error(side, e);
                tracing::warn!(
                    request_id = %request_id,
                    side = %side,
                    error = %e,
                    "Error forwarding request"
                );
            }
        }
        result
    }

    /// `None` means the policy says to stop here.
    fn observe(
        &self,
        side: Side,
        result: Result<ForwardedResponse, ForwardError>,
    ) -> Option<Observation> {
        match result {
            Ok(res) => Some(Observation::from_response(res)),
            Err(e) => match self.policy {
                ForwardErrorPolicy::Acknowledge => None,
                ForwardErrorPolicy::RecordSentinel => Some(Observation::failed(side.as_str(), &e)),
            },
        }
    }
}

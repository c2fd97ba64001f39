// Handshake metrics
// With the `metrics` feature off, HandshakeMetrics records nothing

#[cfg(feature = "metrics")]
mod enabled {
    use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
    use std::sync::Arc;

    use crate::relay::Phase;

    pub struct HandshakeMetrics {
        pub phases_completed: IntCounterVec,
        pub runs: IntCounterVec,
        pub phase_duration: HistogramVec,

        registry: Arc<Registry>,
    }

    impl HandshakeMetrics {
        pub fn new() -> prometheus::Result<Self> {
            let registry = Arc::new(Registry::new());

            let phases_completed = IntCounterVec::new(
                Opts::new("handshake_phases_completed_total", "Handshake phases accepted by their chain"),
                &["phase"],
            )?;
            let runs = IntCounterVec::new(
                Opts::new("handshake_runs_total", "Handshake runs by outcome"),
                &["outcome"],
            )?;
            let phase_duration = HistogramVec::new(
                HistogramOpts::new("handshake_phase_duration_seconds", "Time to query, prove and submit one phase"),
                &["phase"],
            )?;

            registry.register(Box::new(phases_completed.clone()))?;
            registry.register(Box::new(runs.clone()))?;
            registry.register(Box::new(phase_duration.clone()))?;

            Ok(Self {
                phases_completed,
                runs,
                phase_duration,
                registry,
            })
        }

        pub fn record_phase(&self, phase: Phase, seconds: f64) {
            self.phases_completed.with_label_values(&[phase.as_str()]).inc();
            self.phase_duration.with_label_values(&[phase.as_str()]).observe(seconds);
        }

        pub fn record_run(&self, outcome: &str) {
            self.runs.with_label_values(&[outcome]).inc();
        }

        pub fn registry(&self) -> Arc<Registry> {
            self.registry.clone()
        }
    }
}

#[cfg(not(feature = "metrics"))]
mod enabled {
    use crate::relay::Phase;

    #[derive(Default)]
    pub struct HandshakeMetrics;

    impl HandshakeMetrics {
        pub fn new() -> Result<Self, std::convert::Infallible> {
            Ok(Self)
        }

        pub fn record_phase(&self, _phase: Phase, _seconds: f64) {}

        pub fn record_run(&self, _outcome: &str) {}
    }
}

pub use enabled::HandshakeMetrics;

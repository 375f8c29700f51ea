use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

pub struct Metrics {
    estimations: Counter<u64>,
    estimation_duration: Histogram<u64>,
    pose_advancements: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("pose_coach");
        global::set_meter_provider(provider);

        let estimations = meter
            .u64_counter("estimations_total")
            .with_description("Total number of pose estimation requests by outcome")
            .build();

        let estimation_duration = meter
            .u64_histogram("estimation_duration_ms")
            .with_boundaries(vec![
                25.0, 50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0,
            ])
            .with_description("Duration of pose estimation round trips in milliseconds")
            .build();

        let pose_advancements = meter
            .u64_counter("pose_advancements_total")
            .with_description("Number of completed pose holds")
            .build();

        Metrics {
            estimations,
            estimation_duration,
            pose_advancements,
            registry,
        }
    }

    pub fn record_estimation(&self, outcome: &str) {
        let attributes = vec![KeyValue::new("outcome", outcome.to_string())];
        self.estimations.add(1, &attributes);
    }

    pub fn record_estimation_duration(&self, duration_ms: u64) {
        self.estimation_duration.record(duration_ms, &[]);
    }

    pub fn record_pose_advancement(&self, pose: &str) {
        let attributes = vec![KeyValue::new("pose", pose.to_string())];
        self.pose_advancements.add(1, &attributes);
    }
}

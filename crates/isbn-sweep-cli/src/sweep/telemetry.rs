//! # Telemetry Features
//!
//! Console logging through `tracing_subscriber::fmt` is always on and is
//! filtered with `RUST_LOG` (default `info`). OpenTelemetry export is opt-in:
//!
//! - `otel`: exports spans (one per partition) via `tracing-opentelemetry`.
//! - `metrics`: exports counters and histograms for scanned candidates,
//!   accepted identifiers and partition outcomes.
//! - `stdout`: the exporter used by `otel` and `metrics`.
//!
//! ```bash
//! cargo run --release --features otel,metrics,stdout -- --num-workers 16
//! ```

// Disallow using `stdout` without `otel` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "otel", feature = "metrics"))))]
compile_error!("The 'stdout' feature requires at least one of 'otel' or 'metrics' to be enabled.");

use isbn_sweep::PartitionStats;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Metrics-specific imports
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

// Either
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_semantic_conventions as semvcns;

// Span-export imports
#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace as sdktrace;

pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every exporter. Errors are printed rather than
    /// returned since logging may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "otel"))]
    let scope = InstrumentationScope::builder("isbn-sweep")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        );

    #[cfg(feature = "otel")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "metrics", feature = "otel"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("isbn-sweep")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(30))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg(feature = "otel")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let exporter = SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    builder.build()
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static CANDIDATES_SCANNED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static ISBNS_ACCEPTED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PARTITIONS_COMPLETED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PARTITIONS_FAILED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PARTITION_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = CANDIDATES_SCANNED.set(
        meter
            .u64_counter("candidates_scanned")
            .with_description("Candidate ISBNs generated and checked")
            .build(),
    );

    let _ = ISBNS_ACCEPTED.set(
        meter
            .u64_counter("isbns_accepted")
            .with_description("ISBNs written to partition outputs")
            .build(),
    );

    let _ = PARTITIONS_COMPLETED.set(
        meter
            .u64_counter("partitions_completed")
            .with_description("Partitions that reached the end of their range")
            .build(),
    );

    let _ = PARTITIONS_FAILED.set(
        meter
            .u64_counter("partitions_failed")
            .with_description("Partitions that failed or were cancelled")
            .build(),
    );

    let _ = PARTITION_DURATION_MS.set(
        meter
            .f64_histogram("partition_duration")
            .with_unit("ms")
            .with_description("Wall time per partition")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn record_partition(stats: &PartitionStats) {
    let attrs = [KeyValue::new("prefix", stats.partition.prefix.to_string())];
    if let Some(counter) = CANDIDATES_SCANNED.get() {
        counter.add(stats.scanned, &attrs);
    }
    if let Some(counter) = ISBNS_ACCEPTED.get() {
        counter.add(stats.accepted, &attrs);
    }
    if let Some(histogram) = PARTITION_DURATION_MS.get() {
        histogram.record(stats.elapsed.as_secs_f64() * 1_000.0, &attrs);
    }
    let done = if stats.cancelled {
        PARTITIONS_FAILED.get()
    } else {
        PARTITIONS_COMPLETED.get()
    };
    if let Some(counter) = done {
        counter.add(1, &attrs);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_partition(_stats: &PartitionStats) {}

#[cfg(feature = "metrics")]
pub fn increment_partitions_failed() {
    if let Some(counter) = PARTITIONS_FAILED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_partitions_failed() {}

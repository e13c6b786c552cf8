use bizdiag_config::Benchmark;
use bizdiag_model::{AnalyticsFact, format_number};

use crate::collector::FactCollector;

/// Emits `<metric>_vs_benchmark` (actual minus benchmark) for every
/// benchmark whose metric fact exists.
pub(crate) fn emit_benchmark_gaps(benchmarks: &[Benchmark], out: &mut FactCollector) {
    for benchmark in benchmarks {
        let Some(actual) = out.facts().get(&benchmark.metric) else {
            continue;
        };
        let Some(value) = actual.value else {
            continue;
        };
        let label = if benchmark.label.is_empty() {
            actual.label.clone()
        } else {
            benchmark.label.clone()
        };
        let fact = AnalyticsFact::numeric(
            format!("{}_vs_benchmark", benchmark.metric),
            format!("{label} vs benchmark of {}", format_number(benchmark.value)),
            value - benchmark.value,
            benchmark.unit.unwrap_or(actual.unit),
        )
        .with_period(actual.period.clone())
        .with_source(if benchmark.source.is_empty() {
            "benchmark".to_string()
        } else {
            benchmark.source.clone()
        });
        out.push(fact);
    }
}

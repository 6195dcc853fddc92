/// Runs a block and returns `(result, elapsed)`, logging the elapsed time
/// under the given label. The calling crate must depend on `tracing`.
#[macro_export]
macro_rules! measure_time {
    ($label:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = { $block };
        let duration = start.elapsed();
        ::tracing::debug!(label = $label, ?duration, "Execution time");
        (result, duration)
    }};
}

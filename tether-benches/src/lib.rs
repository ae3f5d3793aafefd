//! Criterion benchmarks for the tether tracker.

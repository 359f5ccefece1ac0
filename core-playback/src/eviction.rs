//! Sliding-window eviction of already-played media.

/// Decides which prefix of the decode buffer may be discarded.
///
/// Everything older than `max_retained + safety_margin` seconds behind the
/// playhead is eligible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    pub safety_margin_secs: f64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            safety_margin_secs: 5.0,
        }
    }
}

impl EvictionPolicy {
    pub fn new(safety_margin_secs: f64) -> Self {
        Self { safety_margin_secs }
    }

    /// Range `(start, end)` in seconds to remove, or `None` to keep everything.
    ///
    /// Pure; safe to call whenever the playhead is sampled.
    pub fn decide(
        &self,
        buffered_start: f64,
        position: f64,
        max_retained_secs: f64,
    ) -> Option<(f64, f64)> {
        if position - buffered_start <= max_retained_secs {
            return None;
        }

        let end = position - max_retained_secs - self.safety_margin_secs;
        if end > buffered_start {
            Some((buffered_start, end))
        } else {
            None
        }
    }
}

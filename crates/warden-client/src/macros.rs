// Metric macro wrappers with no-op fallbacks when telemetry is disabled.
#[cfg(feature = "telemetry")]
#[allow(unused_macros)]
macro_rules! t_counter {
    ($($tt:tt)*) => {
        metrics::counter!($($tt)*)
    };
}

#[cfg(not(feature = "telemetry"))]
#[allow(unused_macros)]
macro_rules! t_counter {
    ($($tt:tt)*) => {
        $crate::macros::NoopCounter
    };
}

#[cfg(feature = "telemetry")]
#[allow(unused_macros)]
macro_rules! t_gauge {
    ($($tt:tt)*) => {
        metrics::gauge!($($tt)*)
    };
}

#[cfg(not(feature = "telemetry"))]
#[allow(unused_macros)]
macro_rules! t_gauge {
    ($($tt:tt)*) => {
        $crate::macros::NoopGauge
    };
}

#[cfg(not(feature = "telemetry"))]
#[allow(dead_code)]
#[derive(Copy, Clone)]
pub(crate) struct NoopCounter;

#[cfg(not(feature = "telemetry"))]
#[allow(dead_code)]
impl NoopCounter {
    pub(crate) fn increment(&self, _value: u64) {}
}

#[cfg(not(feature = "telemetry"))]
#[allow(dead_code)]
#[derive(Copy, Clone)]
pub(crate) struct NoopGauge;

#[cfg(not(feature = "telemetry"))]
#[allow(dead_code)]
impl NoopGauge {
    pub(crate) fn set(&self, _value: f64) {}

    pub(crate) fn increment(&self, _value: f64) {}

    pub(crate) fn decrement(&self, _value: f64) {}
}

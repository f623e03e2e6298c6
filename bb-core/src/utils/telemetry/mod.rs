//! Telemetry sink.
//!
//! Components publish numeric key/value pairs once per tick. Formatting and
//! transport belong to whoever implements [`TelemetrySink`].

/// Receiver of per-tick telemetry values.
pub trait TelemetrySink {
    fn put(
        &mut self,
        key: &'static str,
        value: f32,
    );
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    fn put(
        &mut self,
        key: &'static str,
        value: f32,
    ) {
        (**self).put(key, value)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn put(
        &mut self,
        _key: &'static str,
        _value: f32,
    ) {
    }
}

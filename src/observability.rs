use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gpt.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("gpt.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("gpt.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gpt.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("gpt.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("gpt.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("gpt.stream.duration_seconds");

pub(crate) static TRANSCRIPT_MESSAGES: Counter = Counter::new("gpt.transcript.messages");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&TRANSCRIPT_MESSAGES);
}

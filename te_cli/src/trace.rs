use indicatif::{ProgressState, ProgressStyle};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::Subscriber;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{
    fmt::{format::Writer, time::FormatTime},
    layer::SubscriberExt,
    EnvFilter, Layer,
};

/// Epochs over this duration get their spinner highlighted.
const SLOW_SPAN: Duration = Duration::from_secs(30);

/// Log to stderr through the progress bars, with a spinner per open span (`epoch`, `evaluate`, ...).
///
/// `RUST_LOG` overrides `default_directives` when set.
pub fn create_subscriber(default_directives: &str) -> impl Subscriber + Send + Sync + use<> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let indicatif_layer = IndicatifLayer::new()
        .with_progress_style(span_style())
        .with_span_child_prefix_symbol("↳ ")
        .with_span_child_prefix_indent(" ");

    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_source_location(false)
        .with_timer(Uptime(Instant::now()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .event_format(format)
                .with_filter(env_filter),
        )
        .with(indicatif_layer)
}

fn span_style() -> ProgressStyle {
    let template = "{span_child_prefix}{spinner} {highlight}{span_name}{reset} {span_fields} {wide_msg} {elapsed_subsec}";

    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .with_key("elapsed_subsec", elapsed_subsec)
        .with_key("highlight", |state: &ProgressState, writer: &mut dyn fmt::Write| {
            if state.elapsed() > SLOW_SPAN {
                // Bold yellow
                let _ = writer.write_str("\x1b[1;33m");
            }
        })
        .with_key("reset", |state: &ProgressState, writer: &mut dyn fmt::Write| {
            if state.elapsed() > SLOW_SPAN {
                let _ = writer.write_str("\x1b[0m");
            }
        })
}

struct Uptime(Instant);

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write_subsec(w, self.0.elapsed())
    }
}

fn elapsed_subsec(state: &ProgressState, writer: &mut dyn fmt::Write) {
    let _ = write_subsec(writer, state.elapsed());
}

fn write_subsec(w: &mut dyn fmt::Write, elapsed: Duration) -> fmt::Result {
    write!(w, "{}.{}s", elapsed.as_secs(), elapsed.subsec_millis() / 100)
}

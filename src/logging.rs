//! Diagnostics on standard error, one line each, prefixed with the name the
//! program was invoked as.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{FilterExt, filter_fn};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Formats every event as `PROGRAM: message`.
pub struct ProgramPrefix {
    program: String,
}

impl ProgramPrefix {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ProgramPrefix
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}: ", self.program)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `RUST_LOG` when set and valid, `info` otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Build the subscriber used by the binary, writing to `writer`.
///
/// Warnings and errors are always written. `filter` only decides about the
/// quieter levels, such as the verbose invocation lines.
pub fn subscriber<W>(
    program: &str,
    filter: EnvFilter,
    writer: W,
) -> impl Subscriber + Send + Sync + use<W>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let always = filter_fn(|meta| *meta.level() <= Level::WARN);
    tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .event_format(ProgramPrefix::new(program))
            .with_filter(always.or(filter)),
    )
}

/// Install the stderr subscriber for the whole process.
pub fn init(program: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber(program, env_filter(), std::io::stderr))
}

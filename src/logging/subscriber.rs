//! Tracing subscriber: console formatter, structured file layer, and setup.
//!
//! Outcome events carry `status` and `reason` fields, and the applier enters
//! a `plan` span around each run. The file layer writes both as `key=value`
//! pairs so the log can be grepped per plan or per status.
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target for stage headers.
pub(super) const STAGE_TARGET: &str = "macprefs::stage";
/// Target for dry-run actions.
pub(super) const DRY_RUN_TARGET: &str = "macprefs::dry_run";
/// Target for recorded directive and restart outcomes.
pub(super) const OUTCOME_TARGET: &str = "macprefs::outcome";

/// How an event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    DryRun,
    Outcome,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        match (*metadata.level(), metadata.target()) {
            (_, OUTCOME_TARGET) => Self::Outcome,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Tag written in front of the message in the log file.
    const fn file_tag(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::DryRun => "    [dry run] ",
            Self::Outcome => "    [outcome] ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Info => "    ",
            Self::Debug => "    [debug] ",
        }
    }
}

/// The message and named fields of an event or span, in recording order.
#[derive(Debug, Default)]
struct Fields {
    message: String,
    named: Vec<(&'static str, String)>,
}

impl Fields {
    fn of_event(event: &Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.named.push((field.name(), value));
        }
    }

    /// Named fields as space-separated `key=value` pairs; values with
    /// whitespace are quoted.
    fn pairs(&self) -> String {
        self.named
            .iter()
            .map(|(key, value)| {
                if value.contains(char::is_whitespace) {
                    format!("{key}={value:?}")
                } else {
                    format!("{key}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// Appends every event to the per-command log file, timestamped and with
/// ANSI codes stripped.
///
/// Outcome lines also carry their own fields and those of the enclosing
/// spans.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command`, write a run header, and return a
    /// layer appending to it.
    ///
    /// Returns `None` if the cache directory or the file is unusable.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("MACPREFS_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "# macprefs {version} {command} started {}\n",
            format_utc_datetime()
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

/// `key=value` pairs of every span enclosing `event`, outermost first.
fn span_pairs<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> Vec<String>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    ctx.event_scope(event)
        .into_iter()
        .flat_map(|scope| scope.from_root())
        .filter_map(|span| {
            let extensions = span.extensions();
            extensions.get::<Fields>().map(Fields::pairs)
        })
        .filter(|pairs| !pairs.is_empty())
        .collect()
}

impl<S> tracing_subscriber::Layer<S> for FileLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let kind = Kind::of(event);
        let fields = Fields::of_event(event);

        let mut line = format!(
            "[{}] {}{}",
            format_utc_time(),
            kind.file_tag(),
            strip_ansi(&fields.message)
        );
        if kind == Kind::Outcome {
            let own = fields.pairs();
            let pairs = std::iter::once(own)
                .chain(span_pairs(event, &ctx))
                .filter(|p| !p.is_empty());
            for pair in pairs {
                line.push(' ');
                line.push_str(&pair);
            }
        }

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console formatter: `==>` stage headers, coloured levels, indented body.
///
/// Outcome events are left to the run summary.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = Fields::of_event(event).message;
        match Kind::of(event) {
            Kind::Outcome => Ok(()),
            Kind::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Kind::DryRun => writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            Kind::Error => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            Kind::Warn => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            Kind::Info => writeln!(writer, "  {msg}"),
            Kind::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console output goes to stdout (warnings and errors to stderr); every
/// event, `debug` included, is also written to
/// `$XDG_CACHE_HOME/macprefs/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

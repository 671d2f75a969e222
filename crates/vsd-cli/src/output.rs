use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use colored::Colorize;
use regex::Regex;

/// Category of a printed text, which decides its color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    /// Standard output of a process.
    Default,

    /// Standard error of a process.
    Error,

    /// Debug string.
    Debug,

    /// DLL (un)loading.
    DllLoad,

    /// Process lifecycle.
    Info,
}

impl Color {
    const fn html(self) -> &'static str {
        match self {
            Self::Default => "black",
            Self::Error => "red",
            Self::Debug | Self::DllLoad => "green",
            Self::Info => "blue",
        }
    }
}

/// Destination of printed text.
trait Sink {
    fn write(&mut self, color: Color, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Console, colored with ANSI sequences.
struct Console<W: Write> {
    out: W,
}

impl<W: Write> Sink for Console<W> {
    fn write(&mut self, color: Color, text: &str) -> io::Result<()> {
        match color {
            Color::Default => write!(self.out, "{text}"),
            Color::Error => write!(self.out, "{}", text.bright_red()),
            Color::Debug => write!(self.out, "{}", text.bright_green()),
            Color::DllLoad => write!(self.out, "{}", text.green()),
            Color::Info => write!(self.out, "{}", text.bright_blue()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Plain text log.
struct PlainLog<W: Write> {
    out: W,
}

impl<W: Write> Sink for PlainLog<W> {
    fn write(&mut self, _color: Color, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Colored HTML log, one paragraph per color change.
struct HtmlLog<W: Write> {
    out: W,
    color: Option<Color>,
    line_break: Regex,
}

impl<W: Write> HtmlLog<W> {
    fn new(mut out: W, title: &str) -> io::Result<Self> {
        write!(
            out,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\" />\n<title>VSD {}</title>\n</head>\n<body>",
            escape_html(title)
        )?;

        Ok(Self {
            out,
            color: None,
            line_break: Regex::new(r"\r\n|\r|\n").map_err(io::Error::other)?,
        })
    }
}

impl<W: Write> Sink for HtmlLog<W> {
    fn write(&mut self, color: Color, text: &str) -> io::Result<()> {
        if self.color != Some(color) {
            if self.color.is_some() {
                write!(self.out, "</p>")?;
            }
            write!(self.out, "<p style=\"color:{}\">", color.html())?;
            self.color = Some(color);
        }

        let escaped = escape_html(text);
        write!(self.out, "{}", self.line_break.replace_all(&escaped, "<br/>"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for HtmlLog<W> {
    fn drop(&mut self) {
        let closing = if self.color.is_some() { "</p>" } else { "" };

        let finished = write!(self.out, "{closing}</body>\n\n</html>\n")
            .and_then(|()| self.out.flush());

        if let Err(e) = finished {
            tracing::warn!(error = %e, "failed to finish HTML log");
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Group of destinations every printed text is written to.
#[derive(Default)]
pub struct Output {
    sinks: Vec<Box<dyn Sink + Send>>,
}

impl Output {
    /// Adds the console (stdout) as a destination.
    pub fn with_console(mut self) -> Self {
        #[cfg(windows)]
        let _ = colored::control::set_virtual_terminal(true);

        self.sinks.push(Box::new(Console { out: io::stdout() }));
        self
    }

    /// Adds a plain text log file as a destination.
    pub fn with_plain_log(mut self, path: &Path) -> io::Result<Self> {
        let out = BufWriter::new(File::create(path)?);

        self.sinks.push(Box::new(PlainLog { out }));
        Ok(self)
    }

    /// Adds a colored HTML log file as a destination.
    ///
    /// `title` names the traced command.
    pub fn with_html_log(mut self, path: &Path, title: &str) -> io::Result<Self> {
        let out = BufWriter::new(File::create(path)?);

        self.sinks.push(Box::new(HtmlLog::new(out, title)?));
        Ok(self)
    }

    /// Writes `text` to every destination.
    ///
    /// Every destination is attempted, the first error is returned.
    pub fn write(&mut self, color: Color, text: &str) -> io::Result<()> {
        self.sinks
            .iter_mut()
            .map(|sink| sink.write(color, text))
            .fold(Ok(()), Result::and)
    }

    /// Flushes every destination.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sinks
            .iter_mut()
            .map(|sink| sink.flush())
            .fold(Ok(()), Result::and)
    }

    #[cfg(test)]
    fn with_sink(mut self, sink: impl Sink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

use bytes::Bytes;

pub const DATA_PREFIX: &str = "data: ";
pub const COMMENT_MARKER: char = ':';

/// Strip the SSE `data:` field name (and its optional single space).
pub fn strip_data_prefix(line: &str) -> Option<&str> {
    line.strip_prefix("data:")
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
}

/// One wire-level unit: one or more non-empty lines plus a blank-line terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    lines: Vec<String>,
}

impl Frame {
    pub fn single(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Bodies of the frame's data lines, prefix removed.
    pub fn data(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| strip_data_prefix(l))
    }

    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum::<usize>() + 1);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.to_wire())
    }
}

/// Classification of one raw line of an event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Comment,
    Data(&'a str),
    Other(&'a str),
}

impl<'a> Line<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.trim().is_empty() {
            Line::Blank
        } else if line.starts_with(COMMENT_MARKER) {
            Line::Comment
        } else if let Some(body) = strip_data_prefix(line) {
            Line::Data(body)
        } else {
            Line::Other(line)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    /// No frame in progress; blank lines here are noise.
    ExpectFrame,
    /// At least one data line is held; a blank line closes the frame.
    ExpectBlank,
}

/// Result of feeding one line to a [`FrameParser`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feed {
    Pending,
    Frame(Frame),
    /// A non-data, non-comment line. `flushed` is the frame that was open
    /// when it arrived, so the caller can emit it before reporting.
    Malformed {
        flushed: Option<Frame>,
        line: String,
    },
}

/// Reassembles blank-line-delimited frames from a line stream without
/// interpreting their payloads. Holds at most one frame.
#[derive(Debug)]
pub struct FrameParser {
    state: ParserState,
    pending: Vec<String>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::ExpectFrame,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn feed(&mut self, line: &str) -> Feed {
        match Line::classify(line) {
            Line::Data(_) => {
                self.pending.push(line.to_string());
                self.state = ParserState::ExpectBlank;
                Feed::Pending
            }
            Line::Blank => match self.take() {
                Some(frame) => Feed::Frame(frame),
                None => Feed::Pending,
            },
            Line::Comment => Feed::Pending,
            Line::Other(raw) => Feed::Malformed {
                flushed: self.take(),
                line: raw.to_string(),
            },
        }
    }

    /// End of input: hand back a frame that never saw its terminator.
    pub fn finish(&mut self) -> Option<Frame> {
        self.take()
    }

    fn take(&mut self) -> Option<Frame> {
        self.state = ParserState::ExpectFrame;
        if self.pending.is_empty() {
            None
        } else {
            Some(Frame {
                lines: std::mem::take(&mut self.pending),
            })
        }
    }
}

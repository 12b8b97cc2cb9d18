use std::io::{self, Write};

use serde_json::Value;

use conduit_core::ResultPayload;

/// Minimum width blanked when a progress line is cleared.
pub const CLEAR_WIDTH: usize = 80;
pub const PROGRESS_PREFIX: &str = "🔄 ";
const RULE_WIDTH: usize = 70;

/// Output side of a stream consumer. Progress is a single line redrawn in
/// place; tokens append; terminal events print once.
pub trait Renderer {
    /// Redraw the progress line. `previous` is what is currently shown.
    fn replace_line(&mut self, previous: &str, text: &str);
    fn clear_line(&mut self, previous: &str);
    fn append_token(&mut self, content: &str);
    fn results(&mut self, payload: &ResultPayload);
    fn done(&mut self);
    fn failure(&mut self, message: &str, details: Option<&str>);
    /// A line that could not be decoded. The stream goes on.
    fn diagnostic(&mut self, message: &str, raw: &str);
}

/// Renders to a terminal-like writer with carriage-return redraws.
///
/// Write errors are kept rather than raised; once one occurs further output
/// is skipped. Check [`TerminalRenderer::take_error`] after the stream ends.
pub struct TerminalRenderer<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn search_banner(&mut self, query: &str) {
        let text = format!(
            "\n{rule}\n🔍 SEARCH STREAMING\n{rule}\nQuery: '{query}'\n{dash}\n\n",
            rule = "=".repeat(RULE_WIDTH),
            dash = "-".repeat(RULE_WIDTH),
        );
        self.emit(&text);
    }

    pub fn chat_banner(&mut self, question: &str, address: Option<&str>) {
        let text = format!(
            "\n{rule}\n💬 CHAT STREAMING\n{rule}\nQuestion: {question}\nProperty: {address}\n{dash}\n\n💬 ",
            rule = "=".repeat(RULE_WIDTH),
            dash = "-".repeat(RULE_WIDTH),
            address = address.unwrap_or("N/A"),
        );
        self.emit(&text);
    }

    fn emit(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "terminal write failed");
            self.error = Some(e);
        }
    }
}

fn blank(previous: &str, text: &str) -> String {
    let width = (previous.chars().count() + 2)
        .max(text.chars().count() + 2)
        .max(CLEAR_WIDTH);
    format!("\r{}\r", " ".repeat(width))
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn replace_line(&mut self, previous: &str, text: &str) {
        let line = format!("{}{PROGRESS_PREFIX}{text}", blank(previous, text));
        self.emit(&line);
    }

    fn clear_line(&mut self, previous: &str) {
        let line = blank(previous, "");
        self.emit(&line);
    }

    fn append_token(&mut self, content: &str) {
        self.emit(content);
    }

    fn results(&mut self, payload: &ResultPayload) {
        let text = results_report(payload);
        self.emit(&text);
    }

    fn done(&mut self) {
        self.emit("\n\n✅ [Chat response complete]\n");
    }

    fn failure(&mut self, message: &str, details: Option<&str>) {
        let mut text = format!("\n\n❌ Error: {message}\n");
        if let Some(details) = details {
            text.push_str(&format!("Details: {details}\n"));
        }
        self.emit(&text);
    }

    fn diagnostic(&mut self, message: &str, raw: &str) {
        let text = format!("\n[client] {message}\nRaw line: {raw}\n");
        self.emit(&text);
    }
}

/// Plain-text display of one JSON field; absent or null shows as `N/A`.
pub fn field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Price with thousands separators (`850000` → `850,000`).
pub fn price(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => {
            let text = n.to_string();
            let (int, frac) = match text.split_once('.') {
                Some((int, frac)) => (int.to_string(), format!(".{frac}")),
                None => (text, String::new()),
            };
            format!("{}{frac}", group_thousands(&int))
        }
        other => field(other),
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{sign}{out}")
}

/// The full search results block.
pub fn results_report(payload: &ResultPayload) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("\n\n{rule}\n✅ SEARCH RESULTS:\n{rule}\n");

    if !payload.properties.is_empty() {
        out.push_str("\n📋 Properties Found:\n");
        for prop in &payload.properties {
            out.push_str(&format!("\n   • {}\n", field(prop.get("address"))));
            out.push_str(&format!(
                "     Price: ${} | Bedrooms: {} | Bathrooms: {} | Size: {} sq ft\n",
                price(prop.get("price")),
                field(prop.get("bedrooms")),
                field(prop.get("bathrooms")),
                field(prop.get("square_feet")),
            ));
            out.push_str(&format!(
                "     Type: {} | Year Built: {}\n",
                field(prop.get("property_type")),
                field(prop.get("year_built")),
            ));

            let schools = prop.get("schools").and_then(Value::as_array);
            if let Some(schools) = schools.filter(|s| !s.is_empty()) {
                out.push_str("     🎓 Nearby Schools:\n");
                for school in schools {
                    out.push_str(&format!(
                        "        - {} (Rating: {}/10, Distance: {}, Grade: {})\n",
                        field(school.get("name")),
                        field(school.get("rating")),
                        field(school.get("distance")),
                        field(school.get("grade")),
                    ));
                }
            }
        }
    }

    if !payload.landmarks.is_empty() {
        out.push_str("\n📍 Nearby Landmarks:\n");
        for landmark in &payload.landmarks {
            out.push_str(&format!(
                "   • {} ({}) - {}\n",
                field(landmark.get("name")),
                field(landmark.get("distance")),
                field(landmark.get("type")),
            ));
        }
    }
    out.push('\n');
    out
}

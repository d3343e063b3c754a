//! Touchscreen display protocol.
//!
//! The vendor HMI takes ASCII assignments of the form
//! `<widget>.<attribute>=<value>`, each preceded and followed by three `0xFF`
//! bytes. The leading run flushes whatever partial command the display may
//! still be holding; the trailing run terminates the command.
//!
//! Only the three assignment kinds the firmware sends are modeled: text
//! (`t41.txt="..."`), picture (`p0.pic=171`) and number (`n0.val=1`).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Marker byte framing every command.
pub const FRAME_MARKER: u8 = 0xFF;

/// Number of marker bytes on each side of a command.
pub const FRAME_MARKER_LEN: usize = 3;

/// Value assigned to a widget attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayValue {
    /// Text label content (`.txt`).
    Text(String),
    /// Picture resource id (`.pic`).
    Picture(u16),
    /// Numeric value (`.val`).
    Number(i32),
}

impl DisplayValue {
    /// Attribute name this value is assigned to.
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::Text(_) => "txt",
            Self::Picture(_) => "pic",
            Self::Number(_) => "val",
        }
    }
}

/// One assignment sent to the display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayCommand {
    /// Target widget id, e.g. `t41`.
    pub widget: String,
    /// Value to assign.
    pub value: DisplayValue,
}

impl DisplayCommand {
    /// Assign text to a label widget.
    pub fn text(widget: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            widget: widget.into(),
            value: DisplayValue::Text(text.into()),
        }
    }

    /// Show a picture resource on an image widget.
    pub fn picture(widget: impl Into<String>, id: u16) -> Self {
        Self {
            widget: widget.into(),
            value: DisplayValue::Picture(id),
        }
    }

    /// Assign a number to a value widget.
    pub fn number(widget: impl Into<String>, value: i32) -> Self {
        Self {
            widget: widget.into(),
            value: DisplayValue::Number(value),
        }
    }

    /// Render the assignment without framing.
    ///
    /// # Example
    ///
    /// ```
    /// use bed_tramming::protocol::DisplayCommand;
    ///
    /// assert_eq!(DisplayCommand::picture("p0", 171).body(), "p0.pic=171");
    /// assert_eq!(DisplayCommand::text("t4", "Turn").body(), "t4.txt=\"Turn\"");
    /// ```
    pub fn body(&self) -> String {
        let attribute = self.value.attribute();
        match &self.value {
            DisplayValue::Text(text) => {
                format!("{}.{}=\"{}\"", self.widget, attribute, escape_text(text))
            }
            DisplayValue::Picture(id) => format!("{}.{}={}", self.widget, attribute, id),
            DisplayValue::Number(value) => format!("{}.{}={}", self.widget, attribute, value),
        }
    }

    /// Append the framed command to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        let body = self.body();
        buf.reserve(body.len() + 2 * FRAME_MARKER_LEN);
        buf.put_bytes(FRAME_MARKER, FRAME_MARKER_LEN);
        buf.put_slice(body.as_bytes());
        buf.put_bytes(FRAME_MARKER, FRAME_MARKER_LEN);
    }

    /// Get the framed command as bytes.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parse an unframed assignment such as `p3.pic=185`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] if the body is not a supported
    /// assignment.
    pub fn parse_body(body: &str) -> Result<Self> {
        let invalid = |context: &str| Error::InvalidFrame {
            context: format!("{}: {:?}", context, body),
        };

        let (target, value) = body.split_once('=').ok_or_else(|| invalid("missing '='"))?;
        let (widget, attribute) = target
            .split_once('.')
            .ok_or_else(|| invalid("missing attribute"))?;
        if widget.is_empty() {
            return Err(invalid("empty widget id"));
        }

        let value = match attribute {
            "txt" => {
                let quoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .ok_or_else(|| invalid("unquoted text"))?;
                DisplayValue::Text(unescape_text(quoted))
            }
            "pic" => DisplayValue::Picture(
                value
                    .parse()
                    .map_err(|_| invalid("picture id is not a number"))?,
            ),
            "val" => DisplayValue::Number(
                value
                    .parse()
                    .map_err(|_| invalid("value is not a number"))?,
            ),
            _ => return Err(invalid("unsupported attribute")),
        };

        Ok(Self {
            widget: widget.to_string(),
            value,
        })
    }
}

impl std::fmt::Display for DisplayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.body())
    }
}

/// Split a byte stream into display commands.
///
/// Runs of marker bytes of any length separate commands; empty segments are
/// skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidFrame`] for a segment that is not UTF-8 or not a
/// supported assignment.
pub fn decode_frames(data: &[u8]) -> Result<Vec<DisplayCommand>> {
    data.split(|&b| b == FRAME_MARKER)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let body = std::str::from_utf8(segment).map_err(|e| Error::InvalidFrame {
                context: format!("segment is not UTF-8: {}", e),
            })?;
            DisplayCommand::parse_body(body)
        })
        .collect()
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_text(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
                continue;
            }
        }
        unescaped.push(c);
    }
    unescaped
}

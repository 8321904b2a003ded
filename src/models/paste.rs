//! Represents a paste and the text encoding of its metadata record.

use bytes::Bytes;

/// A paste as handed to and returned from a storage backend.
///
/// The storage name is not part of the struct: it is derived from these four
/// fields by the backend on `put` and supplied by the caller on `get`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paste {
    /// Free-form title supplied by the submitter (may be empty).
    pub title: String,

    /// Submission timestamp. Opaque to the store.
    pub date: String,

    /// Rendering hint such as `rust` or `text` (may be empty).
    pub language: String,

    /// Paste body, stored verbatim.
    pub content: Bytes,
}

impl Paste {
    pub fn new(
        title: impl Into<String>,
        date: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    /// Encode `title`, `date` and `language` as the three-line metadata record.
    ///
    /// Values are written as-is; a value containing a newline will not survive
    /// a round-trip through [`Paste::apply_metadata`].
    pub fn metadata_record(&self) -> String {
        format!(
            "Title: {}\nDate: {}\nLanguage: {}\n",
            self.title, self.date, self.language
        )
    }

    /// Populate `title`, `date` and `language` from a metadata record.
    ///
    /// Each line is split on its first colon and both halves are trimmed.
    /// Unknown labels and lines without a colon are skipped, and a label that
    /// never appears leaves its field untouched.
    pub fn apply_metadata(&mut self, record: &str) {
        for line in record.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match label.trim() {
                "Title" => self.title = value.to_string(),
                "Date" => self.date = value.to_string(),
                "Language" => self.language = value.to_string(),
                _ => {}
            }
        }
    }

    /// Build a paste from a metadata record and a body.
    pub fn from_records(metadata: &str, content: impl Into<Bytes>) -> Self {
        let mut paste = Self {
            content: content.into(),
            ..Self::default()
        };
        paste.apply_metadata(metadata);
        paste
    }
}

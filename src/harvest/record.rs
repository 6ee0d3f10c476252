//! Normalized photo metadata
//!
//! A [`PhotoRecord`] is built once by the extractor and handed to the
//! persistence stage unchanged. Only `photo_id` and `title` are guaranteed;
//! every other field may be absent after a degraded extraction.

/// Store-ready metadata snapshot for one photograph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub photo_id: String,
    pub title: String,
    pub description: Option<String>,
    pub square_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub small_url: Option<String>,
    pub medium_url: Option<String>,
    pub large_url: Option<String>,
    pub original_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl PhotoRecord {
    /// Creates a record with only the identifying fields set
    pub fn new(photo_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            photo_id: photo_id.into(),
            title: title.into(),
            description: None,
            square_url: None,
            thumbnail_url: None,
            small_url: None,
            medium_url: None,
            large_url: None,
            original_url: None,
            width: None,
            height: None,
        }
    }

    /// Flattens the record into `(field, value)` pairs, skipping absent fields
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("description", self.description.clone()),
            ("square_url", self.square_url.clone()),
            ("thumbnail_url", self.thumbnail_url.clone()),
            ("small_url", self.small_url.clone()),
            ("medium_url", self.medium_url.clone()),
            ("large_url", self.large_url.clone()),
            ("original_url", self.original_url.clone()),
            ("width", self.width.map(|w| w.to_string())),
            ("height", self.height.map(|h| h.to_string())),
        ];

        let mut fields = vec![
            ("photo_id", self.photo_id.clone()),
            ("title", self.title.clone()),
        ];
        fields.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v))),
        );
        fields
    }

    /// Rebuilds a record from stored `(field, value)` pairs
    ///
    /// Returns `None` if `photo_id` is missing. Unknown fields are ignored and
    /// unparseable dimensions are treated as absent.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut photo_id = None;
        let mut record = Self::new(String::new(), String::new());

        for (name, value) in fields {
            let value = value.to_string();
            match name {
                "photo_id" => photo_id = Some(value),
                "title" => record.title = value,
                "description" => record.description = Some(value),
                "square_url" => record.square_url = Some(value),
                "thumbnail_url" => record.thumbnail_url = Some(value),
                "small_url" => record.small_url = Some(value),
                "medium_url" => record.medium_url = Some(value),
                "large_url" => record.large_url = Some(value),
                "original_url" => record.original_url = Some(value),
                "width" => record.width = value.parse().ok(),
                "height" => record.height = value.parse().ok(),
                _ => {}
            }
        }

        record.photo_id = photo_id.filter(|id| !id.is_empty())?;
        Some(record)
    }

    /// Returns true if every optional field was populated
    pub fn is_complete(&self) -> bool {
        self.fields().len() == 11
    }

    /// Ordering score for the index: the numeric photo id, or 0.0 when not numeric
    pub fn index_score(&self) -> f64 {
        index_score(&self.photo_id)
    }
}

/// Ordering score for a photo id
///
/// Numeric ids (the normal case) sort numerically. Anything else scores
/// `0.0` and falls back to key ordering inside the index.
pub fn index_score(photo_id: &str) -> f64 {
    photo_id.parse::<u64>().map(|id| id as f64).unwrap_or(0.0)
}

//! Built-in extractors for the common editor types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::content::{Property, PropertyValue};
use crate::extract::FieldExtractor;
use crate::model::{FieldValue, IndexField};

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid markup pattern"));

/// Values of `property` matching the requested (culture, segment) pair
fn matching_values<'a>(
    property: &'a Property,
    culture: Option<&str>,
    segment: Option<&str>,
    published: bool,
) -> impl Iterator<Item = &'a PropertyValue> + 'a {
    let culture = culture.map(|c| c.to_string());
    let segment = segment.map(|s| s.to_string());
    property.values.iter().filter(move |value| {
        value.culture == culture && value.segment == segment && (!published || value.published)
    })
}

fn single_field(
    property: &Property,
    culture: Option<&str>,
    segment: Option<&str>,
    value: FieldValue,
) -> Vec<IndexField> {
    if value.is_empty() {
        return Vec::new();
    }
    vec![IndexField::new(property.alias.clone(), value).with_variation(
        culture.map(|c| c.to_string()),
        segment.map(|s| s.to_string()),
    )]
}

/// Plain text editors (textbox, textarea) → unweighted texts
pub struct TextExtractor;

impl FieldExtractor for TextExtractor {
    fn supports(&self, editor: &str) -> bool {
        matches!(editor, "textbox" | "textarea")
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let texts: Vec<String> = matching_values(property, culture, segment, published)
            .map(|v| v.value.clone())
            .filter(|v| !v.is_empty())
            .collect();
        single_field(property, culture, segment, FieldValue::texts(texts))
    }
}

/// Rich text → markup stripped, indexed as unweighted texts
pub struct RichTextExtractor;

impl FieldExtractor for RichTextExtractor {
    fn supports(&self, editor: &str) -> bool {
        editor == "richtext"
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let texts: Vec<String> = matching_values(property, culture, segment, published)
            .map(|v| MARKUP.replace_all(&v.value, " ").trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        single_field(property, culture, segment, FieldValue::texts(texts))
    }
}

/// Tag editors → exact-match keywords, one per comma-separated token
pub struct TagsExtractor;

impl FieldExtractor for TagsExtractor {
    fn supports(&self, editor: &str) -> bool {
        editor == "tags"
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let keywords: Vec<String> = matching_values(property, culture, segment, published)
            .flat_map(|v| v.value.split(','))
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        single_field(property, culture, segment, FieldValue::keywords(keywords))
    }
}

/// Integer editors → integers
pub struct IntegerExtractor;

impl FieldExtractor for IntegerExtractor {
    fn supports(&self, editor: &str) -> bool {
        matches!(editor, "integer" | "numeric")
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let integers: Vec<i64> = matching_values(property, culture, segment, published)
            .filter_map(|v| v.value.trim().parse::<i64>().ok())
            .collect();
        single_field(property, culture, segment, FieldValue::integers(integers))
    }
}

/// Decimal editors → decimals
pub struct DecimalExtractor;

impl FieldExtractor for DecimalExtractor {
    fn supports(&self, editor: &str) -> bool {
        matches!(editor, "decimal" | "slider")
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let decimals: Vec<f64> = matching_values(property, culture, segment, published)
            .filter_map(|v| v.value.trim().parse::<f64>().ok())
            .collect();
        single_field(property, culture, segment, FieldValue::decimals(decimals))
    }
}

/// Date/time editors → timestamps (RFC 3339 values)
pub struct DateTimeExtractor;

impl FieldExtractor for DateTimeExtractor {
    fn supports(&self, editor: &str) -> bool {
        matches!(editor, "datetime" | "date")
    }

    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField> {
        let timestamps: Vec<DateTime<Utc>> =
            matching_values(property, culture, segment, published)
                .filter_map(|v| {
                    DateTime::parse_from_rfc3339(v.value.trim())
                        .map(|dt| dt.with_timezone(&Utc))
                        .ok()
                })
                .collect();
        single_field(
            property,
            culture,
            segment,
            FieldValue::timestamps(timestamps),
        )
    }
}

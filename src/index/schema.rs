//! Physical tantivy schema construction
//!
//! Value kinds are encoded into suffixed engine field names (`title__r1`,
//! `price__i64`, ...). This naming never leaves the engine; callers only see
//! the logical names from the index definition.

use std::collections::HashMap;
use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

use crate::index::{FieldDefinition, FieldKind, IndexDefinition};

/// Sentinel stored for "no culture"/"no segment"/"unprotected"
pub(crate) const SENTINEL_NONE: &str = "none";

/// System field names
pub(crate) const F_DOC_ID: &str = "__id";
pub(crate) const F_KEY: &str = "__key";
pub(crate) const F_KIND: &str = "__kind";
pub(crate) const F_ANCESTORS: &str = "__ancestors";
pub(crate) const F_CULTURE: &str = "__culture";
pub(crate) const F_SEGMENT: &str = "__segment";
pub(crate) const F_PROTECTION: &str = "__protection";
pub(crate) const F_FACETS: &str = "__facets";

/// Physical columns backing one declared logical field
#[derive(Debug, Clone)]
pub(crate) struct FieldColumns {
    pub kinds: Vec<FieldKind>,
    pub text_r1: Option<Field>,
    pub text_r2: Option<Field>,
    pub text_r3: Option<Field>,
    pub text: Option<Field>,
    pub keyword: Option<Field>,
    pub integer: Option<Field>,
    pub decimal: Option<Field>,
    pub datetime: Option<Field>,
}

impl FieldColumns {
    pub fn has_kind(&self, kind: FieldKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// The primary column for a kind, `None` when the kind is not declared.
    /// For text this is the untiered `__txt` column.
    pub fn column(&self, kind: FieldKind) -> Option<Field> {
        match kind {
            FieldKind::Text => self.text,
            FieldKind::Keyword => self.keyword,
            FieldKind::Integer => self.integer,
            FieldKind::Decimal => self.decimal,
            FieldKind::DateTime => self.datetime,
        }
    }

    /// All text tier columns, highest weight first, with their boosts
    pub fn text_tiers(&self) -> Vec<(Field, f32)> {
        [
            (self.text_r1, 10.0),
            (self.text_r2, 5.0),
            (self.text_r3, 2.0),
            (self.text, 1.0),
        ]
        .into_iter()
        .filter_map(|(field, boost)| field.map(|f| (f, boost)))
        .collect()
    }
}

/// The built schema plus handles to every field
pub(crate) struct IndexSchema {
    pub schema: Schema,
    pub doc_id: Field,
    pub key: Field,
    pub kind: Field,
    pub ancestors: Field,
    pub culture: Field,
    pub segment: Field,
    pub protection: Field,
    pub facets: Field,
    columns: HashMap<String, FieldColumns>,
}

impl IndexSchema {
    pub fn build(definition: &IndexDefinition) -> Self {
        let mut builder = Schema::builder();

        let doc_id = builder.add_text_field(F_DOC_ID, STRING | STORED);
        let key = builder.add_text_field(F_KEY, STRING | STORED);
        let kind = builder.add_text_field(F_KIND, STRING | STORED);
        let ancestors = builder.add_text_field(F_ANCESTORS, STRING);
        let culture = builder.add_text_field(F_CULTURE, STRING | STORED);
        let segment = builder.add_text_field(F_SEGMENT, STRING | STORED);
        let protection = builder.add_text_field(F_PROTECTION, STRING);
        let facets = builder.add_facet_field(F_FACETS, INDEXED);

        let mut columns = HashMap::new();
        for field in &definition.fields {
            columns.insert(field.name.clone(), Self::add_columns(&mut builder, field));
        }

        Self {
            schema: builder.build(),
            doc_id,
            key,
            kind,
            ancestors,
            culture,
            segment,
            protection,
            facets,
            columns,
        }
    }

    fn add_columns(
        builder: &mut tantivy::schema::SchemaBuilder,
        field: &FieldDefinition,
    ) -> FieldColumns {
        let name = &field.name;
        let mut columns = FieldColumns {
            kinds: field.kinds.clone(),
            text_r1: None,
            text_r2: None,
            text_r3: None,
            text: None,
            keyword: None,
            integer: None,
            decimal: None,
            datetime: None,
        };

        for kind in &field.kinds {
            match kind {
                FieldKind::Text => {
                    columns.text_r1 =
                        Some(builder.add_text_field(&format!("{}__r1", name), TEXT));
                    columns.text_r2 =
                        Some(builder.add_text_field(&format!("{}__r2", name), TEXT));
                    columns.text_r3 =
                        Some(builder.add_text_field(&format!("{}__r3", name), TEXT));
                    // Stored so string sorting can read the value back
                    columns.text =
                        Some(builder.add_text_field(&format!("{}__txt", name), TEXT | STORED));
                }
                FieldKind::Keyword => {
                    columns.keyword = Some(
                        builder.add_text_field(&format!("{}__kw", name), STRING | STORED),
                    );
                }
                FieldKind::Integer => {
                    columns.integer = Some(builder.add_i64_field(
                        &format!("{}__i64", name),
                        INDEXED | STORED | FAST,
                    ));
                }
                FieldKind::Decimal => {
                    columns.decimal = Some(builder.add_f64_field(
                        &format!("{}__f64", name),
                        INDEXED | STORED | FAST,
                    ));
                }
                FieldKind::DateTime => {
                    columns.datetime = Some(builder.add_date_field(
                        &format!("{}__dt", name),
                        INDEXED | STORED | FAST,
                    ));
                }
            }
        }

        columns
    }

    pub fn columns(&self, name: &str) -> Option<&FieldColumns> {
        self.columns.get(name)
    }

    /// Engine column name for a (logical name, kind) pair, used by fast-field
    /// sorting which addresses columns by name
    pub fn column_name(name: &str, kind: FieldKind) -> String {
        let suffix = match kind {
            FieldKind::Text => "txt",
            FieldKind::Keyword => "kw",
            FieldKind::Integer => "i64",
            FieldKind::Decimal => "f64",
            FieldKind::DateTime => "dt",
        };
        format!("{}__{}", name, suffix)
    }

    /// All text tier columns across every declared text field, with boosts
    pub fn all_text_tiers(&self) -> Vec<(Field, f32)> {
        let mut tiers = Vec::new();
        for columns in self.columns.values() {
            tiers.extend(columns.text_tiers());
        }
        tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectKind;

    #[test]
    fn test_schema_creates_suffixed_columns() {
        let definition = IndexDefinition::new("content", ObjectKind::Document)
            .with_field(FieldDefinition::new("title", FieldKind::Text))
            .with_field(FieldDefinition::new("year", FieldKind::Integer));

        let schema = IndexSchema::build(&definition);
        assert!(schema.schema.get_field("title__r1").is_ok());
        assert!(schema.schema.get_field("title__txt").is_ok());
        assert!(schema.schema.get_field("year__i64").is_ok());
        assert!(schema.schema.get_field("year__kw").is_err());

        let columns = schema.columns("title").unwrap();
        assert!(columns.has_kind(FieldKind::Text));
        assert_eq!(columns.text_tiers().len(), 4);
    }

    #[test]
    fn test_multi_kind_field_gets_all_columns() {
        let definition = IndexDefinition::new("content", ObjectKind::Document).with_field(
            FieldDefinition::with_kinds("topics", vec![FieldKind::Keyword, FieldKind::Text]),
        );

        let schema = IndexSchema::build(&definition);
        assert!(schema.schema.get_field("topics__kw").is_ok());
        assert!(schema.schema.get_field("topics__r1").is_ok());
    }
}

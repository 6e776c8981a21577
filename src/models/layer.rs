use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shapefile::dbase::CodePageMark;
use shapefile::Shape;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Number,
    Boolean,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub width: u8,
    pub decimals: u8,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, width: u8, decimals: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            width,
            decimals,
        }
    }

    pub fn text(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, ColumnKind::Text, width.clamp(1, 254) as u8, 0)
    }

    pub fn number(name: impl Into<String>, width: u8, decimals: u8) -> Self {
        Self::new(name, ColumnKind::Number, width, decimals)
    }

    /// Widen this column so it can also hold values described by `other`.
    /// Conflicting kinds fall back to text.
    pub fn unify(&mut self, other: &Column) {
        if self.kind != other.kind {
            self.kind = ColumnKind::Text;
            self.decimals = 0;
        } else {
            self.decimals = self.decimals.max(other.decimals);
        }
        self.width = self.width.max(other.width);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
}

static NULL_VALUE: AttributeValue = AttributeValue::Null;

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Textual rendering used for kind promotion; `None` for nulls.
    pub fn render(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Text(s) => Some(s.clone()),
            AttributeValue::Number(n) => Some(format_number(*n)),
            AttributeValue::Boolean(b) => Some(if *b { "T" } else { "F" }.to_string()),
            AttributeValue::Date(d) => Some(d.format("%Y%m%d").to_string()),
        }
    }

    /// Normalised key used for attribute joins. Nulls and blank text never match.
    pub fn join_key(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            other => other.render(),
        }
    }

    /// Convert the value so it fits a column of the given kind.
    pub fn coerce(&self, kind: ColumnKind) -> AttributeValue {
        match (kind, self) {
            (_, AttributeValue::Null) => AttributeValue::Null,
            (ColumnKind::Text, AttributeValue::Text(_)) => self.clone(),
            (ColumnKind::Text, other) => other
                .render()
                .map(AttributeValue::Text)
                .unwrap_or_default(),
            (ColumnKind::Number, AttributeValue::Number(_)) => self.clone(),
            (ColumnKind::Number, AttributeValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(AttributeValue::Number)
                .unwrap_or_default(),
            (ColumnKind::Boolean, AttributeValue::Boolean(_)) => self.clone(),
            (ColumnKind::Date, AttributeValue::Date(_)) => self.clone(),
            _ => AttributeValue::Null,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub struct Feature {
    pub shape: Shape,
    pub attributes: HashMap<String, AttributeValue>,
}

// `Shape` derives neither Clone nor Debug; the concrete geometries do.
impl Clone for Feature {
    fn clone(&self) -> Self {
        Self {
            shape: clone_shape(&self.shape),
            attributes: self.attributes.clone(),
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("shape", &self.shape.shapetype())
            .field("attributes", &self.attributes)
            .finish()
    }
}

pub fn clone_shape(shape: &Shape) -> Shape {
    match shape {
        Shape::NullShape => Shape::NullShape,
        Shape::Point(s) => Shape::Point(*s),
        Shape::PointM(s) => Shape::PointM(*s),
        Shape::PointZ(s) => Shape::PointZ(*s),
        Shape::Polyline(s) => Shape::Polyline(s.clone()),
        Shape::PolylineM(s) => Shape::PolylineM(s.clone()),
        Shape::PolylineZ(s) => Shape::PolylineZ(s.clone()),
        Shape::Polygon(s) => Shape::Polygon(s.clone()),
        Shape::PolygonM(s) => Shape::PolygonM(s.clone()),
        Shape::PolygonZ(s) => Shape::PolygonZ(s.clone()),
        Shape::Multipoint(s) => Shape::Multipoint(s.clone()),
        Shape::MultipointM(s) => Shape::MultipointM(s.clone()),
        Shape::MultipointZ(s) => Shape::MultipointZ(s.clone()),
        Shape::Multipatch(s) => Shape::Multipatch(s.clone()),
    }
}

impl Feature {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Attribute value, `Null` when the feature lacks the column.
    pub fn get(&self, name: &str) -> &AttributeValue {
        self.attributes.get(name).unwrap_or(&NULL_VALUE)
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }
}

/// In-memory geospatial layer: an ordered schema, features and an optional CRS
/// (the WKT text of the source `.prj`). `code_page` is the text encoding mark of the
/// `.dbf` the layer was read from, so a rewrite keeps the same encoding.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub crs: Option<String>,
    pub code_page: Option<CodePageMark>,
    columns: Vec<Column>,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: None,
            code_page: None,
            columns: Vec::new(),
            features: Vec::new(),
        }
    }

    pub fn with_code_page(mut self, code_page: Option<CodePageMark>) -> Self {
        self.code_page = code_page;
        self
    }

    pub fn with_crs(mut self, crs: Option<String>) -> Self {
        self.crs = crs;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First column whose trimmed name matches case-insensitively.
    pub fn find_column_ignore_case(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Add a column to the schema, or widen the existing column of the same name.
    pub fn add_column(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => existing.unify(&column),
            None => self.columns.push(column),
        }
    }

    pub fn push_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Replace (or create) a column and its per-feature values.
    pub fn set_column(&mut self, column: Column, values: Vec<AttributeValue>) {
        debug_assert_eq!(values.len(), self.features.len());
        let name = column.name.clone();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        for (feature, value) in self.features.iter_mut().zip(values) {
            feature.set(name.clone(), value);
        }
    }

    /// Rename a column in the schema and in every feature. Returns false if absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let Some(column) = self.columns.iter_mut().find(|c| c.name == from) else {
            return false;
        };
        column.name = to.to_string();
        for feature in &mut self.features {
            if let Some(value) = feature.attributes.remove(from) {
                feature.attributes.insert(to.to_string(), value);
            }
        }
        true
    }

    /// Row-wise concatenation. The schema becomes the union of both schemas; rows
    /// from either side hold nulls for columns they lacked. The CRS of `self` wins.
    pub fn append(&mut self, other: Layer) {
        for column in other.columns {
            self.add_column(column);
        }
        if self.features.is_empty() {
            if self.crs.is_none() {
                self.crs = other.crs;
            }
            if self.code_page.is_none() {
                self.code_page = other.code_page;
            }
        }
        self.features.extend(other.features);
    }

    /// Build a layer from parts, used by transforms that rebuild the feature list.
    pub fn from_parts(
        name: impl Into<String>,
        crs: Option<String>,
        columns: Vec<Column>,
        features: Vec<Feature>,
    ) -> Self {
        Self {
            name: name.into(),
            crs,
            code_page: None,
            columns,
            features,
        }
    }
}

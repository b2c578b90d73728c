// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Validation and normalization of incoming chart requests.
//!
//! Normalization is a pure transformation. It checks the structural shape of
//! the request (title, specification object, tabular records, formats) and
//! produces a [`NormalizedSpec`] whose document embeds the records inline, so
//! the persisted specification can be replayed without any other file.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{error::Error, format::OutputFormat};

/// Maximum nesting depth accepted in a specification document.
pub const MAX_SPEC_DEPTH: usize = 64;

/// A single data row keyed by field name.
pub type Record = Map<String, Value>;

/// Raw `create_chart` arguments as received from the caller.
///
/// Fields are kept loosely typed so structural problems surface as
/// [`Error::Validation`] from [`normalize`] instead of opaque decoding errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartRequest {
    /// Human readable chart title, also used to name the artifact directory.
    #[serde(alias = "chart_title")]
    pub title:          String,
    /// Vega-Lite specification document.
    #[serde(alias = "specification", alias = "spec")]
    pub vega_lite_spec: Value,
    /// Tabular records bound to the chart.
    #[serde(default)]
    pub data:           Option<Value>,
    /// Requested format or list of formats.
    #[serde(default, alias = "output_format", alias = "formats")]
    pub format:         Option<FormatSelection>
}

/// One format name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormatSelection {
    /// Single format name such as `"svg"`.
    Single(String),
    /// Several format names rendered independently.
    Many(Vec<String>)
}

impl ChartRequest {
    /// Decodes tool-call arguments into a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when required fields are missing or have
    /// the wrong primitive type.
    pub fn from_arguments(arguments: Value) -> Result<Self, Error> {
        serde_json::from_value(arguments)
            .map_err(|source| Error::validation(format!("malformed chart request: {source}")))
    }
}

/// Validated request ready for persistence and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpec {
    /// Trimmed chart title.
    pub title:    String,
    /// Input records in their original order.
    pub records:  Vec<Record>,
    /// Specification with `data.values` bound to [`records`](Self::records).
    pub document: Map<String, Value>,
    /// Formats to render, de-duplicated in request order.
    pub formats:  Vec<OutputFormat>
}

impl NormalizedSpec {
    /// Returns the bound specification as a JSON value.
    pub fn document_value(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

/// Validates `request` and binds its data into the specification.
///
/// When the request omits `data`, records embedded in the specification under
/// `data.values` are adopted instead. The request title always replaces any
/// title declared by the specification.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the title is blank, the specification is
/// not an object or nests too deeply, the data is not a list of uniform flat
/// records, or a requested format is unsupported.
///
/// # Examples
///
/// ```
/// use chartgen::{ChartRequest, OutputFormat, normalize};
/// use serde_json::json;
///
/// let request = ChartRequest::from_arguments(json!({
///     "title": "Sales",
///     "vega_lite_spec": {"mark": "bar"},
///     "data": [{"region": "EU", "sales": 10}]
/// }))
/// .expect("well-formed request");
/// let normalized = normalize(request, OutputFormat::Svg).expect("valid request");
/// assert_eq!(normalized.document["data"]["values"][0]["region"], "EU");
/// assert_eq!(normalized.formats, [OutputFormat::Svg]);
/// ```
pub fn normalize(request: ChartRequest, default_format: OutputFormat) -> Result<NormalizedSpec, Error> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title must not be empty"));
    }

    let formats = resolve_formats(request.format.as_ref(), default_format)?;

    let mut document = match request.vega_lite_spec {
        Value::Object(document) => document,
        other => {
            return Err(Error::validation(format!(
                "vega_lite_spec must be an object, got {}",
                type_name(&other)
            )));
        }
    };
    check_depth(&document)?;

    let raw_data = match request.data {
        Some(Value::Null) | None => embedded_values(&document).unwrap_or(Value::Array(Vec::new())),
        Some(data) => data
    };
    let records = validate_records(raw_data)?;

    let mut inline = Map::new();
    inline.insert("values".to_owned(), Value::Array(records.iter().cloned().map(Value::Object).collect()));
    document.insert("data".to_owned(), Value::Object(inline));
    document.insert("title".to_owned(), Value::String(title.to_owned()));

    Ok(NormalizedSpec {
        title: title.to_owned(),
        records,
        document,
        formats
    })
}

fn resolve_formats(
    selection: Option<&FormatSelection>,
    default_format: OutputFormat
) -> Result<Vec<OutputFormat>, Error> {
    let names = match selection {
        None => return Ok(vec![default_format]),
        Some(FormatSelection::Single(name)) => std::slice::from_ref(name),
        Some(FormatSelection::Many(names)) => names.as_slice()
    };

    if names.is_empty() {
        return Err(Error::validation("format list must not be empty"));
    }

    let mut formats = Vec::with_capacity(names.len());
    for name in names {
        let format = OutputFormat::parse(name)?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    Ok(formats)
}

fn embedded_values(document: &Map<String, Value>) -> Option<Value> {
    document
        .get("data")
        .and_then(|data| data.get("values"))
        .cloned()
}

fn validate_records(data: Value) -> Result<Vec<Record>, Error> {
    let rows = match data {
        Value::Array(rows) => rows,
        other => {
            return Err(Error::validation(format!(
                "data must be a list of records, got {}",
                type_name(&other)
            )));
        }
    };

    let mut records: Vec<Record> = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let record = match row {
            Value::Object(record) => record,
            other => {
                return Err(Error::validation(format!(
                    "data record {index} must be an object, got {}",
                    type_name(&other)
                )));
            }
        };

        if let Some((field, value)) = record.iter().find(|(_, value)| !is_scalar(value)) {
            return Err(Error::validation(format!(
                "data record {index} field '{field}' must be a scalar, got {}",
                type_name(value)
            )));
        }

        if let Some(first) = records.first()
            && !same_fields(first, &record)
        {
            return Err(Error::validation(format!(
                "data record {index} has fields [{}] but record 0 has [{}]",
                field_list(&record),
                field_list(first)
            )));
        }

        records.push(record);
    }

    Ok(records)
}

fn check_depth(document: &Map<String, Value>) -> Result<(), Error> {
    let mut pending: Vec<(&Value, usize)> = document.values().map(|value| (value, 2)).collect();

    while let Some((value, depth)) = pending.pop() {
        if depth > MAX_SPEC_DEPTH {
            return Err(Error::validation(format!(
                "vega_lite_spec nests deeper than {MAX_SPEC_DEPTH} levels"
            )));
        }
        match value {
            Value::Object(map) => pending.extend(map.values().map(|child| (child, depth + 1))),
            Value::Array(items) => pending.extend(items.iter().map(|child| (child, depth + 1))),
            _ => {}
        }
    }

    Ok(())
}

fn same_fields(left: &Record, right: &Record) -> bool {
    left.len() == right.len() && left.keys().all(|key| right.contains_key(key))
}

fn field_list(record: &Record) -> String {
    let mut fields: Vec<&str> = record.keys().map(String::as_str).collect();
    fields.sort_unstable();
    fields.join(", ")
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object"
    }
}

// src/query.rs
//! Query compiler: catalog + user selection → concrete query lines.
//!
//! Only the district dimension fans out into separate lines. Every other multi-value
//! selection is written into the same line with positional keys, which the target
//! treats as an OR-set.

use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::catalog::{FilterCatalog, FilterDefinition, NEWEST_FIRST, PAGE, PHOTO_ONLY};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SelectionValue {
    #[default]
    Absent,
    Scalar(String),
    List(Vec<String>),
}

impl SelectionValue {
    /// Empty strings and empty lists count as absent.
    pub fn normalized(self) -> Self {
        match self {
            Self::Scalar(s) if s.trim().is_empty() => Self::Absent,
            Self::List(v) if v.is_empty() => Self::Absent,
            other => other,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<&str> for SelectionValue {
    fn from(s: &str) -> Self { Self::Scalar(s.to_string()) }
}

impl From<String> for SelectionValue {
    fn from(s: String) -> Self { Self::Scalar(s) }
}

impl From<Vec<String>> for SelectionValue {
    fn from(v: Vec<String>) -> Self { Self::List(v) }
}

impl From<Vec<&str>> for SelectionValue {
    fn from(v: Vec<&str>) -> Self { Self::List(v.into_iter().map(str::to_string).collect()) }
}

impl<const N: usize> From<[&str; N]> for SelectionValue {
    fn from(v: [&str; N]) -> Self { Self::List(v.iter().map(|s| s.to_string()).collect()) }
}

impl<T: Into<SelectionValue>> From<Option<T>> for SelectionValue {
    fn from(v: Option<T>) -> Self { v.map_or(Self::Absent, Into::into) }
}

fn json_scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TryFrom<&Value> for SelectionValue {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        let out = match v {
            Value::Null => Self::Absent,
            Value::Array(items) => {
                let list = items
                    .iter()
                    .map(|i| json_scalar(i).ok_or_else(|| Error::config(format!("unsupported list element {i}"))))
                    .collect::<Result<Vec<_>>>()?;
                Self::List(list)
            }
            other => Self::Scalar(
                json_scalar(other).ok_or_else(|| Error::config(format!("unsupported selection value {other}")))?,
            ),
        };
        Ok(out.normalized())
    }
}

/// Filter name → selected value(s). Names are checked against the catalog at compile time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    values: BTreeMap<String, SelectionValue>,
}

impl Selection {
    pub fn new() -> Self { Self::default() }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SelectionValue>) -> &mut Self {
        self.values.insert(name.into(), value.into().normalized());
        self
    }

    pub fn get(&self, name: &str) -> Option<&SelectionValue> { self.values.get(name) }
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Later entries win.
    pub fn merge(&mut self, other: Selection) {
        self.values.extend(other.values);
    }

    /// `{"Dzielnica": ["Wola", "Mokotów"], "Cena do": 500000, "Rynek": null}`
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(Error::config("selection must be a JSON object of filter name → value"));
        };
        let mut sel = Self::new();
        for (name, v) in &map {
            let v = SelectionValue::try_from(v).map_err(|e| Error::config(format!("filter '{name}': {e}")))?;
            sel.set(name.as_str(), v);
        }
        Ok(sel)
    }

    /// Parse one `Name=v1|v2` flag. One value is a scalar, several a list, none absent.
    pub fn parse_flag(&mut self, flag: &str) -> Result<()> {
        let (name, rest) = flag
            .split_once('=')
            .ok_or_else(|| Error::config(format!("expected Name=value, got '{flag}'")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::config(format!("missing filter name in '{flag}'")));
        }
        let mut parts: Vec<String> = rest
            .split('|')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let value = match parts.len() {
            0 => SelectionValue::Absent,
            1 => SelectionValue::Scalar(parts.remove(0)),
            _ => SelectionValue::List(parts),
        };
        self.set(name, value);
        Ok(())
    }
}

/// One crawlable query line: wire key → wire value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledQuery {
    params: BTreeMap<String, String>,
}

impl CompiledQuery {
    pub fn get(&self, key: &str) -> Option<&str> { self.params.get(key).map(String::as_str) }
    pub fn len(&self) -> usize { self.params.len() }
    pub fn is_empty(&self) -> bool { self.params.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }

    /// `base` with this line's parameters and `page_key=page` appended.
    pub fn page_url(&self, base: &Url, page_key: &str, page: u32) -> Url {
        let mut url = base.clone();
        {
            let mut q = url.query_pairs_mut();
            for (k, v) in &self.params {
                q.append_pair(k, v);
            }
            q.append_pair(page_key, &page.to_string());
        }
        url
    }

    /// Short human label for logs: the district code if any, else the parameter count.
    pub fn label(&self) -> String {
        self.params
            .iter()
            .find(|(k, _)| k.contains("district"))
            .map(|(_, v)| format!("district {v}"))
            .unwrap_or_else(|| format!("{} params", self.params.len()))
    }
}

/// Always-on selections, applied before the caller's.
fn defaults() -> Selection {
    let mut sel = Selection::new();
    sel.set(NEWEST_FIRST, "on").set(PHOTO_ONLY, "on");
    sel
}

/// Compile a selection against the catalog. All validation happens here,
/// before any crawl request is made.
pub fn compile(catalog: &FilterCatalog, selection: &Selection) -> Result<Vec<CompiledQuery>> {
    for (name, _) in selection.iter() {
        if catalog.get(name).is_none() {
            return Err(Error::config(format!("unknown filter '{name}'")));
        }
    }

    let mut effective = defaults();
    effective.merge(selection.clone());

    let mut base = CompiledQuery::default();
    let mut lines: Option<(&FilterDefinition, Vec<String>)> = None;

    for def in catalog.filters() {
        if def.name == PAGE {
            continue;
        }
        let value = effective.get(&def.name).cloned().unwrap_or_default();
        if def.is_multi_line {
            let values = match value {
                SelectionValue::Absent => continue,
                SelectionValue::Scalar(v) => vec![v],
                SelectionValue::List(vs) => vs,
            };
            let codes = values.iter().map(|v| def.encode(v)).collect::<Result<Vec<_>>>()?;
            lines = Some((def, codes));
            continue;
        }
        write_filter(&mut base, def, value)?;
    }

    let Some((district, codes)) = lines else {
        return Ok(vec![base]);
    };
    Ok(codes
        .into_iter()
        .map(|code| {
            let mut q = base.clone();
            q.insert(district.key_for(0), code);
            q
        })
        .collect())
}

fn write_filter(out: &mut CompiledQuery, def: &FilterDefinition, value: SelectionValue) -> Result<()> {
    match value {
        SelectionValue::Absent => {}
        SelectionValue::Scalar(v) => out.insert(def.key_for(0), def.encode(&v)?),
        SelectionValue::List(vs) => {
            if !def.is_positional() && vs.len() > 1 {
                return Err(Error::config(format!(
                    "filter '{}' takes a single value, got {}",
                    def.name,
                    vs.len()
                )));
            }
            for (i, v) in vs.iter().enumerate() {
                out.insert(def.key_for(i), def.encode(v)?);
            }
        }
    }
    Ok(())
}

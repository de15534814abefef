use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::error::{Result, SearchError};
use crate::text::{edit_distance_within, tokenize, tokenize_spans};

use super::SearchEngine;

const DEFAULT_SIZE: usize = 10;
const FRAGMENT_CHARS: usize = 100;
const FRAGMENT_LEAD_CHARS: usize = 30;

/// Process-local engine that understands the query subset this crate emits.
///
/// Scoring is the number of distinct query terms found across the matched
/// fields. Ties fall back to document id order.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    indices: RwLock<HashMap<String, StoredIndex>>,
}

#[derive(Debug, Default, Clone)]
struct StoredIndex {
    schema: Value,
    docs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct FuzzyTerms {
    terms: Vec<String>,
    fuzziness: usize,
    prefix_length: usize,
}

impl FuzzyTerms {
    fn matches(&self, token: &str) -> bool {
        self.terms
            .iter()
            .any(|term| fuzzy_match(term, token, self.fuzziness, self.prefix_length))
    }
}

impl InMemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, index: &str) -> Result<Option<usize>> {
        let indices = self.read()?;
        Ok(indices.get(index).map(|stored| stored.docs.len()))
    }

    pub fn document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let indices = self.read()?;
        Ok(indices
            .get(index)
            .and_then(|stored| stored.docs.get(id))
            .cloned())
    }

    pub fn schema(&self, index: &str) -> Result<Option<Value>> {
        let indices = self.read()?;
        Ok(indices.get(index).map(|stored| stored.schema.clone()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, StoredIndex>>> {
        self.indices
            .read()
            .map_err(|_| SearchError::Internal("in-memory engine lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredIndex>>> {
        self.indices
            .write()
            .map_err(|_| SearchError::Internal("in-memory engine lock poisoned".to_string()))
    }
}

impl SearchEngine for InMemoryEngine {
    fn exists(&self, index: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(index))
    }

    fn create_index(&self, index: &str, schema: &Value) -> Result<()> {
        let mut indices = self.write()?;
        if indices.contains_key(index) {
            return Err(SearchError::Engine {
                status: 400,
                reason: format!(
                    "resource_already_exists_exception: index [{index}] already exists"
                ),
            });
        }
        indices.insert(
            index.to_string(),
            StoredIndex {
                schema: schema.clone(),
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn delete_index(&self, index: &str, ignore_missing: bool) -> Result<()> {
        let removed = self.write()?.remove(index);
        if removed.is_none() && !ignore_missing {
            return Err(index_not_found(index));
        }
        Ok(())
    }

    fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<()> {
        if !body.is_object() {
            return Err(SearchError::Engine {
                status: 400,
                reason: "mapper_parsing_exception: document body must be an object".to_string(),
            });
        }
        // Writing into a missing index creates it, like the real engine does.
        self.write()?
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(id.to_string(), body.clone());
        Ok(())
    }

    fn query(&self, index: &str, dsl: &Value) -> Result<Value> {
        let indices = self.read()?;
        let stored = indices.get(index).ok_or_else(|| index_not_found(index))?;
        run_search(index, stored, dsl)
    }
}

fn run_search(index: &str, stored: &StoredIndex, dsl: &Value) -> Result<Value> {
    let match_all = json!({ "match_all": {} });
    let query = dsl.get("query").unwrap_or(&match_all);

    let mut matched = Vec::<(&String, f64, &Value)>::new();
    for (id, doc) in &stored.docs {
        if let Some(score) = evaluate(query, doc)? {
            matched.push((id, score, doc));
        }
    }

    let sort_keys = parse_sort(dsl.get("sort"))?;
    matched.sort_by(|a, b| {
        sort_keys
            .iter()
            .map(|(field, descending)| {
                if field != "_score" {
                    return compare_field(lookup(a.2, field), lookup(b.2, field), *descending);
                }
                let ordering = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
                if *descending { ordering.reverse() } else { ordering }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let from = read_usize(dsl, "from", 0)?;
    let size = read_usize(dsl, "size", DEFAULT_SIZE)?;
    let highlight_terms = collect_fuzzy_terms(query);
    let total = matched.len();

    let hits = matched
        .into_iter()
        .skip(from)
        .take(size)
        .map(|(id, score, doc)| {
            let mut hit = Map::new();
            hit.insert("_index".to_string(), json!(index));
            hit.insert("_id".to_string(), json!(id));
            hit.insert("_score".to_string(), json!(score));
            if let Some(source) = project_source(doc, dsl.get("_source")) {
                hit.insert("_source".to_string(), source);
            }
            if let Some(highlight) = dsl
                .get("highlight")
                .and_then(|spec| build_highlight(spec, doc, &highlight_terms))
            {
                hit.insert("highlight".to_string(), highlight);
            }
            Value::Object(hit)
        })
        .collect::<Vec<_>>();

    Ok(json!({
        "hits": {
            "total": { "value": total, "relation": "eq" },
            "hits": hits,
        }
    }))
}

fn evaluate(query: &Value, doc: &Value) -> Result<Option<f64>> {
    let Some((kind, body)) = single_entry(query) else {
        return Err(parse_error("query must be an object with exactly one clause"));
    };
    match kind {
        "match_all" => Ok(Some(1.0)),
        "bool" => evaluate_bool(body, doc),
        "multi_match" => Ok(evaluate_multi_match(body, doc)?.map(|hits| hits as f64)),
        "term" => {
            let (field, expected) =
                single_entry(body).ok_or_else(|| parse_error("[term] needs one field"))?;
            let expected = expected.get("value").unwrap_or(expected);
            Ok(lookup(doc, field)
                .is_some_and(|actual| values_equal(actual, expected))
                .then_some(1.0))
        }
        "terms" => {
            let (field, expected) =
                single_entry(body).ok_or_else(|| parse_error("[terms] needs one field"))?;
            let expected = expected
                .as_array()
                .ok_or_else(|| parse_error("[terms] values must be an array"))?;
            Ok(lookup(doc, field)
                .is_some_and(|actual| expected.iter().any(|value| values_equal(actual, value)))
                .then_some(1.0))
        }
        "range" => {
            let (field, bounds) =
                single_entry(body).ok_or_else(|| parse_error("[range] needs one field"))?;
            Ok(lookup(doc, field)
                .is_some_and(|actual| within_range(actual, bounds))
                .then_some(1.0))
        }
        other => Err(parse_error(&format!("unknown query [{other}]"))),
    }
}

fn evaluate_bool(body: &Value, doc: &Value) -> Result<Option<f64>> {
    let mut score = 0.0;
    for clause in clauses(body.get("must")) {
        match evaluate(clause, doc)? {
            Some(partial) => score += partial,
            None => return Ok(None),
        }
    }
    for clause in clauses(body.get("filter")) {
        if evaluate(clause, doc)?.is_none() {
            return Ok(None);
        }
    }
    for clause in clauses(body.get("must_not")) {
        if evaluate(clause, doc)?.is_some() {
            return Ok(None);
        }
    }
    Ok(Some(score))
}

fn evaluate_multi_match(body: &Value, doc: &Value) -> Result<Option<usize>> {
    let terms = parse_fuzzy_terms(body)?;
    let fields = body
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_error("[multi_match] requires fields"))?;

    let doc_tokens = fields
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|field| lookup(doc, field).and_then(Value::as_str))
        .flat_map(tokenize)
        .collect::<Vec<_>>();

    let matched = terms
        .terms
        .iter()
        .filter(|term| {
            doc_tokens
                .iter()
                .any(|token| fuzzy_match(term, token, terms.fuzziness, terms.prefix_length))
        })
        .count();
    Ok((matched > 0).then_some(matched))
}

fn parse_fuzzy_terms(body: &Value) -> Result<FuzzyTerms> {
    let text = body
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error("[multi_match] requires query"))?;
    let fuzziness = match body.get("fuzziness") {
        None => 0,
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        Some(Value::String(s)) => s
            .parse::<usize>()
            .map_err(|_| parse_error(&format!("unsupported fuzziness [{s}]")))?,
        Some(_) => return Err(parse_error("fuzziness must be a number")),
    };
    let prefix_length = body
        .get("prefix_length")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let mut terms = tokenize(text);
    terms.dedup();
    Ok(FuzzyTerms {
        terms,
        fuzziness,
        prefix_length,
    })
}

fn collect_fuzzy_terms(query: &Value) -> Vec<FuzzyTerms> {
    let mut out = Vec::new();
    collect_into(query, &mut out);
    out
}

fn collect_into(query: &Value, out: &mut Vec<FuzzyTerms>) {
    let Some((kind, body)) = single_entry(query) else {
        return;
    };
    match kind {
        "multi_match" => out.extend(parse_fuzzy_terms(body).ok()),
        "bool" => {
            for clause in clauses(body.get("must")) {
                collect_into(clause, out);
            }
        }
        _ => {}
    }
}

fn fuzzy_match(term: &str, token: &str, fuzziness: usize, prefix_length: usize) -> bool {
    if term == token {
        return true;
    }
    if fuzziness == 0 {
        return false;
    }
    let term_prefix = term.chars().take(prefix_length).collect::<String>();
    let token_prefix = token.chars().take(prefix_length).collect::<String>();
    if term_prefix != token_prefix || term_prefix.chars().count() < prefix_length {
        return false;
    }
    edit_distance_within(term, token, fuzziness)
}

fn build_highlight(spec: &Value, doc: &Value, terms: &[FuzzyTerms]) -> Option<Value> {
    let fields = spec.get("fields")?.as_object()?;
    let no_match_size = spec
        .get("no_match_size")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    let mut out = Map::new();
    for (field, field_spec) in fields {
        let Some(text) = lookup(doc, field).and_then(Value::as_str) else {
            continue;
        };
        let no_match_size = field_spec
            .get("no_match_size")
            .and_then(Value::as_u64)
            .map_or(no_match_size, |size| size as usize);
        let fragment =
            match_fragment(text, terms).or_else(|| leading_fragment(text, no_match_size));
        if let Some(fragment) = fragment {
            out.insert(field.clone(), json!([fragment]));
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

fn match_fragment(text: &str, terms: &[FuzzyTerms]) -> Option<String> {
    let spans = tokenize_spans(text);
    let hit_flags = spans
        .iter()
        .map(|(_, _, token)| terms.iter().any(|set| set.matches(token)))
        .collect::<Vec<_>>();
    let first = hit_flags.iter().position(|hit| *hit)?;

    let anchor = spans[first].0;
    let begin_idx = (0..=first)
        .find(|&idx| anchor - spans[idx].0 <= FRAGMENT_LEAD_CHARS)
        .unwrap_or(first);
    let begin = spans[begin_idx].0;
    let end_idx = (begin_idx..spans.len())
        .take_while(|&idx| spans[idx].1 - begin <= FRAGMENT_CHARS || idx == first)
        .last()
        .unwrap_or(first);

    let mut fragment = String::new();
    let mut cursor = begin;
    for idx in begin_idx..=end_idx {
        let (start, stop, _) = &spans[idx];
        fragment.push_str(&text[cursor..*start]);
        if hit_flags[idx] {
            fragment.push_str("<em>");
            fragment.push_str(&text[*start..*stop]);
            fragment.push_str("</em>");
        } else {
            fragment.push_str(&text[*start..*stop]);
        }
        cursor = *stop;
    }
    Some(fragment)
}

fn leading_fragment(text: &str, max_chars: usize) -> Option<String> {
    if max_chars == 0 || text.trim().is_empty() {
        return None;
    }
    let end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx);
    Some(text[..end].trim_end().to_string())
}

fn project_source(doc: &Value, spec: Option<&Value>) -> Option<Value> {
    let excludes = match spec {
        None | Some(Value::Bool(true)) => Vec::new(),
        Some(Value::Bool(false)) => return None,
        Some(spec) => spec
            .get("excludes")
            .or_else(|| spec.get("exclude"))
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default(),
    };
    let mut source = doc.clone();
    if let Some(object) = source.as_object_mut() {
        for field in excludes {
            object.remove(field);
        }
    }
    Some(source)
}

fn parse_sort(raw: Option<&Value>) -> Result<Vec<(String, bool)>> {
    let Some(raw) = raw else {
        return Ok(vec![("_score".to_string(), true)]);
    };
    let entries = match raw {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    };
    let mut keys = Vec::new();
    for entry in entries {
        let (field, order) = match entry {
            Value::String(field) => (field.as_str(), None),
            other => {
                let (field, spec) =
                    single_entry(other).ok_or_else(|| parse_error("malformed sort entry"))?;
                let order = spec
                    .get("order")
                    .and_then(Value::as_str)
                    .or_else(|| spec.as_str());
                (field, order)
            }
        };
        let descending = match order {
            Some("desc") => true,
            Some("asc") => false,
            None => field == "_score",
            Some(other) => return Err(parse_error(&format!("unknown sort order [{other}]"))),
        };
        keys.push((field.to_string(), descending));
    }
    Ok(keys)
}

// Missing values sort last in either direction.
fn compare_field(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            if descending { ordering.reverse() } else { ordering }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (as_date(a), as_date(b)) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn within_range(actual: &Value, bounds: &Value) -> bool {
    let checks: [(&str, fn(Ordering) -> bool); 4] = [
        ("gte", |o| o != Ordering::Less),
        ("gt", |o| o == Ordering::Greater),
        ("lte", |o| o != Ordering::Greater),
        ("lt", |o| o == Ordering::Less),
    ];
    checks.iter().all(|(key, accept)| match bounds.get(*key) {
        None => true,
        Some(bound) => accept(compare_values(actual, bound)),
    })
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            b.parse::<f64>().ok() == a.as_f64()
        }
        _ => actual == expected,
    }
}

fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Resolves a dotted path; a trailing `.raw` addresses the keyword sub-field.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_suffix(".raw").unwrap_or(path);
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
}

fn clauses(raw: Option<&Value>) -> Vec<&Value> {
    match raw {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.iter().next().map(|(k, v)| (k.as_str(), v))
}

fn read_usize(dsl: &Value, key: &str, default_value: usize) -> Result<usize> {
    match dsl.get(key) {
        None => Ok(default_value),
        Some(value) => value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| parse_error(&format!("[{key}] must be a non-negative integer"))),
    }
}

fn parse_error(reason: &str) -> SearchError {
    SearchError::Engine {
        status: 400,
        reason: format!("parsing_exception: {reason}"),
    }
}

fn index_not_found(index: &str) -> SearchError {
    SearchError::Engine {
        status: 404,
        reason: format!("index_not_found_exception: no such index [{index}]"),
    }
}

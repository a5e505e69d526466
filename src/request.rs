//! Query parameter assembly for record listing requests.

pub const FIELDS_PARAM: &str = "fields[]";
pub const FORMULA_PARAM: &str = "filterByFormula";
pub const OFFSET_PARAM: &str = "offset";

/// Ordered query pairs. Keys may repeat (`fields[]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamSet {
    pairs: Vec<(String, String)>,
}

impl ParamSet {
    pub fn new() -> Self { Self::default() }

    pub fn push<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] { &self.pairs }

    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

    pub fn len(&self) -> usize { self.pairs.len() }

    /// All values for `key`, in insertion order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Percent-encoded `k=v&k=v` form, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Build the parameters for one page request.
///
/// A continuation request carries only the cursor: the server remembers the original
/// field list and formula by cursor, so they must not be resent.
pub fn build_params(fields: Option<&[String]>, formula: Option<&str>, cursor: Option<&str>) -> ParamSet {
    let mut params = ParamSet::new();
    if let Some(c) = cursor {
        params.push(OFFSET_PARAM, c);
        return params;
    }
    if let Some(fs) = fields {
        for f in fs {
            params.push(FIELDS_PARAM, f.as_str());
        }
    }
    if let Some(f) = formula {
        params.push(FORMULA_PARAM, f);
    }
    params
}

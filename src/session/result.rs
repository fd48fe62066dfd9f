//! Query results.

use std::sync::Arc;

use crate::bolt::packstream::Value;

/// How many rows a PULL should request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOptions {
    /// Maximum rows to stream, or -1 for all remaining rows.
    pub n: i64,
    /// Which open query to pull from, on versions that multiplex queries
    /// inside a transaction. `None` pulls from the latest.
    pub qid: Option<i64>,
}

impl PullOptions {
    /// Pull all remaining rows.
    pub fn all() -> Self {
        Self { n: -1, qid: None }
    }

    /// Pull at most `n` rows.
    pub fn limit(n: i64) -> Self {
        Self { n, qid: None }
    }

    /// Address a specific open query.
    pub fn with_qid(mut self, qid: i64) -> Self {
        self.qid = Some(qid);
        self
    }
}

impl Default for PullOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// One result row, paired with the column names from the query summary.
///
/// Column names are shared between all records of a result, not cloned
/// per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// The column names, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The row's values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index)
    }

    /// Look up a value by position.
    pub fn index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the record, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

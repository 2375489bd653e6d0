use std::collections::BTreeMap;
use std::fmt;

/// A worksheet held in memory: one header row of column names plus data rows
/// of cell strings aligned to the header by position. Rows may be shorter than
/// the header (older files); accessors treat missing cells as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct TableError {
    pub code: &'static str,
    pub message: String,
}

impl TableError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TableError {}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.header.iter().all(|h| h.is_empty())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Resolve the key column by exact name, falling back to an alternate name
    /// only when the primary is genuinely absent. The comparison is on the
    /// lookup result, not on the index value: a key column sitting at index 0
    /// must still win over the fallback.
    pub fn key_column_index(&self, primary: &str, fallback: &str) -> Option<usize> {
        self.column_index(primary)
            .or_else(|| self.column_index(fallback))
    }

    /// First data row whose cell at `key_idx`, trimmed, equals the trimmed
    /// needle. Duplicate keys: the first match in row order is canonical.
    pub fn find_row(&self, key_idx: usize, key_value: &str) -> Option<usize> {
        let needle = key_value.trim();
        self.rows
            .iter()
            .position(|r| r.get(key_idx).map(|c| c.trim()).unwrap_or("") == needle)
    }

    /// Append every required column missing from the header and backfill an
    /// empty cell on each existing row. Idempotent; existing columns are never
    /// reordered or removed, and new columns land after them in `required`
    /// order.
    pub fn ensure_columns(&mut self, required: &[&str]) {
        for col in required {
            if self.column_index(col).is_none() {
                self.header.push((*col).to_string());
                for row in &mut self.rows {
                    if row.len() < self.header.len() {
                        row.resize(self.header.len(), String::new());
                    }
                }
            }
        }
    }

    /// Update-or-insert the row identified by `key_value` in `key_column`,
    /// then overwrite exactly the cells named by the patch. Patch columns
    /// absent from the header are a silent no-op: callers with a wider input
    /// schema than the sheet must never corrupt the row set. Returns the
    /// data-row index that was written.
    pub fn upsert(
        &mut self,
        key_column: &str,
        key_value: &str,
        patch: &BTreeMap<String, String>,
    ) -> Result<usize, TableError> {
        let key_idx = self.column_index(key_column).ok_or_else(|| {
            TableError::new(
                "schema_missing_column",
                format!("{} column missing", key_column),
            )
        })?;

        let key = key_value.trim();
        let row_idx = match self.find_row(key_idx, key) {
            Some(i) => i,
            None => {
                let mut row = vec![String::new(); self.header.len()];
                row[key_idx] = key.to_string();
                self.rows.push(row);
                self.rows.len() - 1
            }
        };

        for (col, value) in patch {
            if let Some(idx) = self.column_index(col) {
                let row = &mut self.rows[row_idx];
                if row.len() <= idx {
                    row.resize(self.header.len(), String::new());
                }
                row[idx] = value.clone();
            }
        }

        Ok(row_idx)
    }

    /// Merge another table into this one, keyed by `key_column` in the source
    /// header. The destination header is first extended with any source-only
    /// columns, then each source data row is applied as an upsert patch. Rows
    /// with duplicate keys are each applied in order, so the last occurrence
    /// wins. Returns the number of source data rows processed.
    pub fn merge_from(&mut self, source: &Table, key_column: &str) -> Result<usize, TableError> {
        let src_key_idx = source.column_index(key_column).ok_or_else(|| {
            TableError::new(
                "schema_missing_column",
                format!("{} column missing in source", key_column),
            )
        })?;

        let required: Vec<&str> = source
            .header
            .iter()
            .filter(|h| !h.is_empty())
            .map(|s| s.as_str())
            .collect();
        self.ensure_columns(&required);

        let mut processed = 0usize;
        for row in &source.rows {
            let key_value = row.get(src_key_idx).map(|c| c.trim()).unwrap_or("");
            let mut patch = BTreeMap::new();
            for (i, col) in source.header.iter().enumerate() {
                if col.is_empty() {
                    continue;
                }
                if self.column_index(col).is_some() {
                    patch.insert(col.clone(), row.get(i).cloned().unwrap_or_default());
                }
            }
            self.upsert(key_column, key_value, &patch)?;
            processed += 1;
        }

        Ok(processed)
    }

    /// Project one data row as a column-name → value record. Columns with an
    /// empty header name are skipped; cells past the end of a short row read
    /// as empty strings.
    pub fn record(&self, row_idx: usize) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let Some(row) = self.rows.get(row_idx) else {
            return out;
        };
        for (i, col) in self.header.iter().enumerate() {
            if col.is_empty() {
                continue;
            }
            out.insert(col.clone(), row.get(i).cloned().unwrap_or_default());
        }
        out
    }
}

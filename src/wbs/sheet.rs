//! The WBS sheet: a flat table whose rows form a code hierarchy.
//!
//! Rows at levels below 10 are WBS nodes (code, description). A level-10
//! row directly below a node holds the user's description for that node and
//! carries no code of its own.

use std::io::Read;
use std::path::Path;

use crate::error::WbsError;

/// Level of the user description row.
pub const DESCRIPTION_LEVEL: u32 = 10;

const LEVEL_NAMES: &[&str] = &["nivel", "level"];
const CODE_NAMES: &[&str] = &["wbs", "wbs code", "codigo", "code"];
const DESCRIPTION_NAMES: &[&str] = &["descricao", "desc", "description"];
const UNIT_NAMES: &[&str] = &["unid", "unidade", "unit"];
const QUANTITY_NAMES: &[&str] = &["qdte", "quantidade", "quantity", "qty"];

/// Positions of the known columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WbsColumns {
    pub level: usize,
    pub code: usize,
    pub description: usize,
    pub unit: Option<usize>,
    pub quantity: Option<usize>,
}

impl WbsColumns {
    /// Locate the columns by normalized header name.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self, WbsError> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let find = |names: &[&str]| normalized.iter().position(|h| names.contains(&h.as_str()));
        let require = |names: &[&str], column: &'static str| {
            find(names).ok_or_else(|| WbsError::MissingColumn {
                column,
                available: headers
                    .iter()
                    .map(|h| h.as_ref().trim())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        };

        Ok(Self {
            level: require(LEVEL_NAMES, "level")?,
            code: require(CODE_NAMES, "code")?,
            description: require(DESCRIPTION_NAMES, "description")?,
            unit: find(UNIT_NAMES),
            quantity: find(QUANTITY_NAMES),
        })
    }
}

/// A node row with a user description that differs from the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantLeaf {
    pub code: String,
    /// Description of the node row.
    pub description: String,
    /// Text of the level-10 row below it.
    pub user_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WbsSheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: WbsColumns,
    delimiter: u8,
}

impl WbsSheet {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WbsError> {
        let path = path.as_ref();
        let mut content = String::new();
        std::fs::File::open(path)
            .and_then(|mut file| file.read_to_string(&mut content))
            .map_err(|source| WbsError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let sheet = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            rows = sheet.len(),
            "Loaded WBS sheet"
        );
        Ok(sheet)
    }

    /// Parse CSV text. The delimiter (`,` or `;`) is taken from the header
    /// line; a leading byte-order mark is ignored.
    pub fn parse(content: &str) -> Result<Self, WbsError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let delimiter = detect_delimiter(content.lines().next().unwrap_or_default());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = WbsColumns::detect(&headers)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self {
            headers,
            rows,
            columns,
            delimiter,
        })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn columns(&self) -> WbsColumns {
        self.columns
    }

    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map_or("", |s| s.trim())
    }

    #[must_use]
    pub fn level(&self, row: usize) -> Option<u32> {
        parse_level(self.cell(row, self.columns.level))
    }

    #[must_use]
    pub fn code(&self, row: usize) -> &str {
        self.cell(row, self.columns.code)
    }

    #[must_use]
    pub fn description(&self, row: usize) -> &str {
        self.cell(row, self.columns.description)
    }

    #[must_use]
    pub fn unit(&self, row: usize) -> &str {
        self.columns.unit.map_or("", |c| self.cell(row, c))
    }

    #[must_use]
    pub fn quantity(&self, row: usize) -> &str {
        self.columns.quantity.map_or("", |c| self.cell(row, c))
    }

    #[must_use]
    pub fn is_description_row(&self, row: usize) -> bool {
        self.level(row) == Some(DESCRIPTION_LEVEL)
    }

    fn is_node_row(&self, row: usize) -> bool {
        self.level(row).is_some_and(|l| l < DESCRIPTION_LEVEL) && !self.code(row).is_empty()
    }

    /// Node rows (code, description) in sheet order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        (0..self.len())
            .filter(|&row| self.is_node_row(row))
            .map(|row| (self.code(row), self.description(row)))
    }

    /// First node row carrying `code`.
    #[must_use]
    pub fn leaf_row(&self, code: &str) -> Option<usize> {
        let code = code.trim();
        (0..self.len()).find(|&row| self.is_node_row(row) && self.code(row) == code)
    }

    /// The level-10 row belonging to the node at `leaf_row`: the first one
    /// before the next row that carries a code.
    #[must_use]
    pub fn description_row(&self, leaf_row: usize) -> Option<usize> {
        for row in leaf_row + 1..self.len() {
            if self.is_description_row(row) {
                return Some(row);
            }
            if !self.code(row).is_empty() {
                return None;
            }
        }
        None
    }

    /// Level-10 text of a leaf, empty when it has none.
    #[must_use]
    pub fn user_description(&self, code: &str) -> &str {
        self.leaf_row(code)
            .and_then(|row| self.description_row(row))
            .map_or("", |row| self.description(row))
    }

    /// Unit of a leaf: the level-10 row's unit, else the node row's.
    #[must_use]
    pub fn leaf_unit(&self, code: &str) -> &str {
        let Some(leaf) = self.leaf_row(code) else {
            return "";
        };
        self.description_row(leaf)
            .map(|row| self.unit(row))
            .filter(|unit| !unit.is_empty())
            .unwrap_or_else(|| self.unit(leaf))
    }

    /// Make sure `code` has a level-10 row, inserting an empty one right
    /// after the node row when missing. Returns the row index, or `None`
    /// when the code is not in the sheet.
    pub fn ensure_description_row(&mut self, code: &str) -> Option<usize> {
        let leaf = self.leaf_row(code)?;
        if let Some(row) = self.description_row(leaf) {
            return Some(row);
        }
        let mut row = vec![String::new(); self.headers.len()];
        if let Some(cell) = row.get_mut(self.columns.level) {
            *cell = DESCRIPTION_LEVEL.to_string();
        }
        self.rows.insert(leaf + 1, row);
        tracing::debug!(code, row = leaf + 1, "Inserted description row");
        Some(leaf + 1)
    }

    /// Leaves whose level-10 description was edited relative to `baseline`
    /// (compared row by row), in sheet order without duplicates. Without a
    /// baseline every non-blank description counts as edited.
    #[must_use]
    pub fn relevant_leaves(&self, baseline: Option<&WbsSheet>) -> Vec<RelevantLeaf> {
        let mut leaves: Vec<RelevantLeaf> = Vec::new();
        let mut current: Option<usize> = None;

        for row in 0..self.len() {
            if self.is_node_row(row) {
                current = Some(row);
                continue;
            }
            if !self.is_description_row(row) {
                continue;
            }
            let Some(leaf) = current else {
                continue;
            };

            let text = self.description(row);
            let original = baseline.map_or("", |b| b.description(row));
            if text.is_empty() || text == original {
                continue;
            }

            let code = self.code(leaf);
            if let Some(existing) = leaves.iter_mut().find(|l| l.code == code) {
                existing.user_description = text.to_string();
            } else {
                leaves.push(RelevantLeaf {
                    code: code.to_string(),
                    description: self.description(leaf).to_string(),
                    user_description: text.to_string(),
                });
            }
        }
        leaves
    }
}

/// `3`, `3.0` and `3,0` are all level 3.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_level(value: &str) -> Option<u32> {
    let value = value.trim().replace(',', ".");
    let level = value.parse::<f64>().ok()?;
    if !level.is_finite() || level < 0.0 || level > f64::from(u32::MAX) {
        return None;
    }
    Some(level.trunc() as u32)
}

/// Lower-case, accents folded, whitespace collapsed, trailing dots dropped.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    let folded: String = header.chars().map(fold_accent).collect::<String>().to_lowercase();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('.').trim_end().to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ª' => 'a',
        'º' => 'o',
        other => other,
    }
}

fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

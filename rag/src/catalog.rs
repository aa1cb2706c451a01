use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CatalogError;
use crate::extract_code::normalize_code;

const PROGRAM_COLUMN_PREFIX: &str = "Required Courses for ";

/// "Required Courses for <program>" cell of a catalog row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgramRequirement {
    pub program: String,
    pub requirement: String,
}

/// One catalog row. Absent or blank cells are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CourseRecord {
    pub course_code: String,
    pub course_title: String,
    pub description: String,
    pub credits: String,
    pub prerequisites: String,
    pub source_url: String,
    /// In catalog column order.
    pub required_for_program: Vec<ProgramRequirement>,
}

impl CourseRecord {
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.course_code)
    }

    /// Source title shown for an exact match, e.g. "INFOST 790 – Info Architecture".
    pub fn source_title(&self) -> String {
        format!("{} – {}", self.course_code, self.course_title)
    }
}

/// Course records keyed by normalized code. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: Vec<CourseRecord>,
    by_code: HashMap<String, usize>,
    source: Option<PathBuf>,
}

impl Catalog {
    /// Builds the index; on a key collision the later record replaces the earlier one.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CourseRecord>,
    {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    fn insert(&mut self, record: CourseRecord) {
        let key = record.normalized_code();
        if key.is_empty() {
            tracing::warn!(title = %record.course_title, "skipping catalog row without course_code");
            return;
        }
        if let Some(&idx) = self.by_code.get(&key) {
            tracing::warn!(
                code = %key,
                previous = %self.records[idx].course_code,
                replacement = %record.course_code,
                "duplicate course code in catalog, keeping the later row"
            );
            self.records[idx] = record;
        } else {
            self.by_code.insert(key, self.records.len());
            self.records.push(record);
        }
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let code_col = column("course_code").ok_or(CatalogError::MissingColumn("course_code"))?;
        let title_col = column("course_title").ok_or(CatalogError::MissingColumn("course_title"))?;
        let description_col = column("description");
        let credits_col = column("credits");
        let prereq_col = column("prerequisites");
        let url_col = column("source_url");
        let program_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                h.strip_prefix(PROGRAM_COLUMN_PREFIX)
                    .map(|program| (i, program.trim().to_string()))
            })
            .collect();

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let cell = |col: Option<usize>| {
                col.and_then(|i| row.get(i))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            records.push(CourseRecord {
                course_code: cell(Some(code_col)),
                course_title: cell(Some(title_col)),
                description: cell(description_col),
                credits: cell(credits_col),
                prerequisites: cell(prereq_col),
                source_url: cell(url_col),
                required_for_program: program_cols
                    .iter()
                    .map(|(i, program)| ProgramRequirement {
                        program: program.clone(),
                        requirement: cell(Some(*i)),
                    })
                    .filter(|req| !req.requirement.is_empty())
                    .collect(),
            });
        }

        Ok(Self::from_records(records))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_reader(file)?;
        catalog.source = Some(path.to_path_buf());
        tracing::info!(path = %path.display(), courses = catalog.len(), "loaded course catalog");
        Ok(catalog)
    }

    /// Loads the first candidate path that exists.
    pub fn load_first(paths: &[PathBuf]) -> Result<Self, CatalogError> {
        match paths.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(CatalogError::NotFound(paths.to_vec())),
        }
    }

    pub fn get(&self, normalized_code: &str) -> Option<&CourseRecord> {
        self.by_code.get(normalized_code).map(|&idx| &self.records[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

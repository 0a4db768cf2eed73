//! Stage 4: flatten per-person records into six CSV tables.
//!
//! Every child row (degree, job, visit, honor, parent) carries the person's
//! identity columns so each table can be analysed on its own without a
//! key join.
//!
//! ## Tables
//!
//! | file             | one row per            |
//! |------------------|------------------------|
//! | `personal.csv`   | person                 |
//! | `degrees.csv`    | `degrees[]` element    |
//! | `employment.csv` | `employment[]` element |
//! | `visits.csv`     | `visits[]` element     |
//! | `honors.csv`     | `honors[]` element     |
//! | `parents.csv`    | `parents[]` element    |

use crate::config::PipelineConfig;
use crate::error::{Bio2CsvError, ItemError};
use crate::output::JoinStats;
use crate::pipeline::dates::year_or_none;
use crate::pipeline::table::{Row, Table};
use crate::pipeline::{ensure_dir, file_name, list_files, require_input_dir};
use crate::progress::Stage;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Identity fields copied from each record.
pub const PERSON_KEYS: [&str; 4] = ["full_name", "birthdate", "deathdate", "birthplace"];

const PERSONAL_COLUMNS: [&str; 6] = [
    "full_name",
    "birthdate",
    "deathdate",
    "birthplace",
    "birthyear",
    "deathyear",
];

const DEGREE_KEYS: &[&str] = &[
    "degree_institution_name",
    "degree_type",
    "degree_year",
    "degree_advisor",
];
const EMPLOYMENT_KEYS: &[&str] = &[
    "employer",
    "job_title",
    "job_year_begin",
    "job_year_end",
    "reason_end",
];
const VISIT_KEYS: &[&str] = &["visit_location", "visit_reason", "visit_year"];
const HONOR_KEYS: &[&str] = &["honor_name", "honor_year"];
const PARENT_KEYS: &[&str] = &[
    "parent_name",
    "parent_birthdate",
    "parent_deathdate",
    "parent_birthyear",
    "parent_deathyear",
    "parent_profession",
];

/// The six output tables, in memory.
#[derive(Debug, Clone)]
pub struct Tables {
    pub people: Table,
    pub degrees: Table,
    pub employment: Table,
    pub visits: Table,
    pub honors: Table,
    pub parents: Table,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            people: Table::new("personal", &PERSONAL_COLUMNS),
            degrees: Table::new("degrees", &child_columns(DEGREE_KEYS)),
            employment: Table::new("employment", &child_columns(EMPLOYMENT_KEYS)),
            visits: Table::new("visits", &child_columns(VISIT_KEYS)),
            honors: Table::new("honors", &child_columns(HONOR_KEYS)),
            parents: Table::new("parents", &child_columns(PARENT_KEYS)),
        }
    }
}

fn child_columns(keys: &'static [&'static str]) -> Vec<&'static str> {
    keys.iter().chain(PERSONAL_COLUMNS.iter()).copied().collect()
}

impl Tables {
    pub fn all(&self) -> [&Table; 6] {
        [
            &self.people,
            &self.degrees,
            &self.employment,
            &self.visits,
            &self.honors,
            &self.parents,
        ]
    }

    /// Add one person's record to every table.
    pub fn add_record(&mut self, record: &Map<String, Value>) {
        let personal = personal_row(record);

        for (field, table) in [
            ("degrees", &mut self.degrees),
            ("employment", &mut self.employment),
            ("visits", &mut self.visits),
            ("honors", &mut self.honors),
        ] {
            for element in list_elements(record, field) {
                table.push(merge_element(element, &personal));
            }
        }

        for parent in list_elements(record, "parents") {
            self.parents.push(parent_row(parent, &personal));
        }

        self.people.push(personal);
    }
}

/// Identity fields plus derived `birthyear`/`deathyear`.
fn personal_row(record: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    for key in PERSON_KEYS {
        row.insert(key.to_string(), record.get(key).cloned().unwrap_or(Value::Null));
    }
    row.insert("birthyear".into(), year_value(record.get("birthdate")));
    row.insert("deathyear".into(), year_value(record.get("deathdate")));
    row
}

fn year_value(v: Option<&Value>) -> Value {
    year_or_none(v).map_or(Value::Null, Value::from)
}

/// Object elements of a list field. Anything else is skipped.
fn list_elements<'a>(
    record: &'a Map<String, Value>,
    field: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    let items: &[Value] = match record.get(field) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => &[],
        Some(other) => {
            warn!("'{}' is not a list ({}), ignoring", field, type_name(other));
            &[]
        }
    };
    let field = field.to_string();
    items.iter().filter_map(move |item| match item {
        Value::Object(obj) => Some(obj),
        other => {
            warn!("Skipping non-object in '{}': {}", field, other);
            None
        }
    })
}

/// Element fields first, then personal fields not already present.
fn merge_element(element: &Map<String, Value>, personal: &Row) -> Row {
    let mut row = element.clone();
    for (k, v) in personal {
        row.entry(k.clone()).or_insert_with(|| v.clone());
    }
    row
}

fn parent_row(parent: &Map<String, Value>, personal: &Row) -> Row {
    let get = |k: &str| parent.get(k).cloned().unwrap_or(Value::Null);

    let mut row = Row::new();
    row.insert("parent_name".into(), get("name"));
    row.insert("parent_birthdate".into(), get("birthdate"));
    row.insert("parent_deathdate".into(), get("deathdate"));
    row.insert("parent_birthyear".into(), year_value(parent.get("birthdate")));
    row.insert("parent_deathyear".into(), year_value(parent.get("deathdate")));
    row.insert("parent_profession".into(), get("profession"));
    for (k, v) in personal {
        row.entry(k.clone()).or_insert_with(|| v.clone());
    }
    row
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read one parser output. Non-JSON and non-object files are errors.
fn load_record(path: &Path) -> Result<Map<String, Value>, ItemError> {
    let name = file_name(path);
    let fail = |detail: String| ItemError::LoadFailed {
        file: name.clone(),
        detail,
    };

    let text = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    match serde_json::from_str::<Value>(&text).map_err(|e| fail(e.to_string()))? {
        Value::Object(record) => Ok(record),
        other => Err(fail(format!("expected a JSON object, found {}", type_name(&other)))),
    }
}

/// Build the six tables from every `*.json` in `parse_dir`.
///
/// Returns the tables and the per-file load failures.
pub fn build_tables(parse_dir: &Path) -> Result<(Tables, Vec<ItemError>), Bio2CsvError> {
    let mut tables = Tables::default();
    let mut errors = Vec::new();

    for path in list_files(parse_dir, "json")? {
        match load_record(&path) {
            Ok(record) => {
                tables.add_record(&record);
                debug!("Joined {}", file_name(&path));
            }
            Err(e) => {
                warn!("Failed to load {}", e);
                errors.push(e);
            }
        }
    }
    Ok((tables, errors))
}

/// Join every record in `config.parse_dir` into six CSVs in `config.join_dir`.
pub async fn join_tables(config: &PipelineConfig) -> Result<JoinStats, Bio2CsvError> {
    require_input_dir(Stage::Join, &config.parse_dir)?;
    ensure_dir(&config.join_dir)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Join, 6);
    }

    let parse_dir = config.parse_dir.clone();
    let (tables, errors) = tokio::task::spawn_blocking(move || build_tables(&parse_dir))
        .await
        .map_err(|e| Bio2CsvError::Internal(format!("join task panicked: {e}")))??;

    for table in tables.all() {
        table.write_csv(&config.join_dir)?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_complete(Stage::Join, &table.file_name());
        }
    }
    for e in &errors {
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_error(Stage::Join, e.file(), &e.to_string());
        }
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(Stage::Join, 6, 6);
    }

    let stats = JoinStats {
        input_from: config.parse_dir.clone(),
        output_to: config.join_dir.clone(),
        num_people: tables.people.len(),
        num_degrees: tables.degrees.len(),
        num_employment_records: tables.employment.len(),
        num_visits: tables.visits.len(),
        num_honors: tables.honors.len(),
        num_parents: tables.parents.len(),
        num_load_errors: errors.len(),
    };
    info!(
        "Join complete: {} people, {} degrees, {} jobs, {} visits, {} honors, {} parents ({} unreadable)",
        stats.num_people,
        stats.num_degrees,
        stats.num_employment_records,
        stats.num_visits,
        stats.num_honors,
        stats.num_parents,
        stats.num_load_errors
    );
    Ok(stats)
}

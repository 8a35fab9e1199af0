//! Template Store: the canonical shape of an extracted record.
//!
//! The template JSON is resolved once into a tree of tagged `TemplateNode`s so
//! enforcement dispatches on an explicit variant instead of inspecting JSON
//! types at every call. A `Template` is immutable after loading and shared by
//! every concurrent extraction behind an `Arc`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

pub mod enforcer;

pub use enforcer::enforce;

/// Template shipped with the binary, used when no `TEMPLATE_PATH` is configured.
const BUNDLED_TEMPLATE: &str = include_str!("../../templates/resume_template.json");

pub const RECORD_KEY: &str = "ResumeParserData";

pub const RESUME_FILE_NAME: &str = "ResumeFileName";
pub const PARSING_DATE: &str = "ParsingDate";
pub const PERSONAL_DETAILS: &str = "PersonalDetails";
pub const CONTACT_DETAILS: &str = "ContactDetails";
pub const PASSPORT_DETAILS: &str = "PassportDetails";
pub const IDENTIFICATION: &str = "Identification";
pub const CATEGORY_DETAILS: &str = "CategoryDetails";
pub const EDUCATION: &str = "Education";
pub const WORK_EXPERIENCE: &str = "WorkExperience";
pub const PROJECTS: &str = "Projects";
pub const SEGREGATED_SKILL: &str = "SegregatedSkill";
pub const TECHNICAL_SKILLS: &str = "TechnicalSkills";
pub const SOFT_SKILLS: &str = "SoftSkills";
pub const WORKED_PERIOD: &str = "WorkedPeriod";
pub const ACHIEVEMENTS: &str = "Achievements";
pub const PUBLICATIONS: &str = "Publications";
pub const HOBBIES: &str = "Hobbies";
pub const REFERENCES: &str = "References";
pub const LANGUAGES_KNOWN: &str = "LanguagesKnown";

/// Sections the orchestrator reads from and writes to.
const REQUIRED_SECTIONS: &[&str] = &[
    RESUME_FILE_NAME,
    PARSING_DATE,
    PERSONAL_DETAILS,
    CONTACT_DETAILS,
    PASSPORT_DETAILS,
    IDENTIFICATION,
    CATEGORY_DETAILS,
    EDUCATION,
    WORK_EXPERIENCE,
    PROJECTS,
    SEGREGATED_SKILL,
    WORKED_PERIOD,
    ACHIEVEMENTS,
    PUBLICATIONS,
    HOBBIES,
    REFERENCES,
    LANGUAGES_KNOWN,
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Cannot read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template is missing required section '{0}'")]
    MissingSection(String),

    #[error("Template section '{0}' has the wrong shape: {1}")]
    WrongShape(String, &'static str),
}

/// One node of a resolved template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// A mapping with a fixed, ordered set of fields.
    Object(Vec<(String, TemplateNode)>),
    /// A list whose every entry has the element's shape.
    ArrayOfObject(Box<TemplateNode>),
    /// Anything else; the value is the default placeholder.
    Scalar(Value),
}

impl TemplateNode {
    /// Resolves a raw JSON value into a node tree. Total over all JSON input.
    ///
    /// A non-empty array whose first element is an object becomes
    /// `ArrayOfObject`; every other array (empty, or of scalars) is a `Scalar`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => TemplateNode::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), TemplateNode::from_value(v)))
                    .collect(),
            ),
            Value::Array(items) if matches!(items.first(), Some(Value::Object(_))) => {
                TemplateNode::ArrayOfObject(Box::new(TemplateNode::from_value(&items[0])))
            }
            other => TemplateNode::Scalar(other.clone()),
        }
    }

    /// Renders the node as the template file wrote it: arrays of records keep
    /// their single exemplar entry. This is the form sent to the model as
    /// structural guidance and returned as a section's safe default.
    pub fn to_value(&self) -> Value {
        match self {
            TemplateNode::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, node)| (k.clone(), node.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
            TemplateNode::ArrayOfObject(element) => Value::Array(vec![element.to_value()]),
            TemplateNode::Scalar(default) => default.clone(),
        }
    }

    /// Renders the node as an empty record would hold it: arrays of records
    /// are empty. Equal to `enforce(self, {})`.
    pub fn default_value(&self) -> Value {
        match self {
            TemplateNode::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, node)| (k.clone(), node.default_value()))
                    .collect::<Map<String, Value>>(),
            ),
            TemplateNode::ArrayOfObject(_) => Value::Array(Vec::new()),
            TemplateNode::Scalar(default) => default.clone(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&TemplateNode> {
        match self {
            TemplateNode::Object(fields) => {
                fields.iter().find(|(k, _)| k == key).map(|(_, node)| node)
            }
            _ => None,
        }
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some()
    }
}

/// The loaded résumé template.
#[derive(Debug, Clone)]
pub struct Template {
    root: TemplateNode,
}

impl Template {
    /// Reads and validates a template file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Self::from_json_str(&raw)?;
        info!("Loaded template from {}", path.display());
        Ok(template)
    }

    /// The template compiled into the binary.
    pub fn bundled() -> Result<Self, TemplateError> {
        Self::from_json_str(BUNDLED_TEMPLATE)
    }

    /// Loads `path` when given, otherwise the bundled template.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, TemplateError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TemplateError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, TemplateError> {
        let root = TemplateNode::from_value(value);
        validate(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &TemplateNode {
        &self.root
    }

    /// The `ResumeParserData` node.
    pub fn record(&self) -> &TemplateNode {
        // validate() guarantees presence
        self.root
            .field(RECORD_KEY)
            .unwrap_or(&self.root)
    }
}

fn validate(root: &TemplateNode) -> Result<(), TemplateError> {
    let record = root
        .field(RECORD_KEY)
        .ok_or_else(|| TemplateError::MissingSection(RECORD_KEY.to_string()))?;
    if !matches!(record, TemplateNode::Object(_)) {
        return Err(TemplateError::WrongShape(
            RECORD_KEY.to_string(),
            "expected an object",
        ));
    }

    for section in REQUIRED_SECTIONS {
        if !record.has_field(section) {
            return Err(TemplateError::MissingSection(section.to_string()));
        }
    }

    for section in [EDUCATION, WORK_EXPERIENCE, PROJECTS] {
        if !matches!(record.field(section), Some(TemplateNode::ArrayOfObject(_))) {
            return Err(TemplateError::WrongShape(
                section.to_string(),
                "expected a one-element array of objects",
            ));
        }
    }

    let skills = record.field(SEGREGATED_SKILL);
    for list in [TECHNICAL_SKILLS, SOFT_SKILLS] {
        match skills.and_then(|s| s.field(list)) {
            Some(TemplateNode::ArrayOfObject(_)) => {}
            Some(_) => {
                return Err(TemplateError::WrongShape(
                    format!("{SEGREGATED_SKILL}.{list}"),
                    "expected a one-element array of objects",
                ))
            }
            None => return Err(TemplateError::MissingSection(format!("{SEGREGATED_SKILL}.{list}"))),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundled_template_is_valid() {
        let template = Template::bundled().unwrap();
        assert!(matches!(template.record(), TemplateNode::Object(_)));
        assert!(matches!(
            template.record().field(EDUCATION),
            Some(TemplateNode::ArrayOfObject(_))
        ));
    }

    #[test]
    fn test_from_value_tags_nodes() {
        let node = TemplateNode::from_value(&json!({
            "name": "",
            "tags": [],
            "scores": [1, 2],
            "jobs": [{"title": ""}]
        }));

        assert_eq!(node.field("name"), Some(&TemplateNode::Scalar(json!(""))));
        assert_eq!(node.field("tags"), Some(&TemplateNode::Scalar(json!([]))));
        assert_eq!(node.field("scores"), Some(&TemplateNode::Scalar(json!([1, 2]))));
        assert!(matches!(node.field("jobs"), Some(TemplateNode::ArrayOfObject(_))));
    }

    #[test]
    fn test_to_value_round_trips_raw_template() {
        let raw = json!({"b": {"x": 1}, "a": [{"y": ""}], "c": null});
        let node = TemplateNode::from_value(&raw);
        assert_eq!(node.to_value(), raw);
    }

    #[test]
    fn test_field_order_is_preserved() {
        let template = Template::bundled().unwrap();
        let keys: Vec<String> = match template.record().default_value() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => panic!("record must be an object"),
        };
        assert_eq!(keys[0], RESUME_FILE_NAME);
        assert_eq!(keys[1], PARSING_DATE);
        assert_eq!(keys[2], PERSONAL_DETAILS);
    }

    #[test]
    fn test_default_value_empties_record_arrays() {
        let node = TemplateNode::from_value(&json!({"jobs": [{"title": ""}], "tags": []}));
        assert_eq!(node.default_value(), json!({"jobs": [], "tags": []}));
    }

    #[test]
    fn test_missing_record_key_is_rejected() {
        let err = Template::from_value(&json!({"Other": {}})).unwrap_err();
        assert!(matches!(err, TemplateError::MissingSection(ref s) if s == RECORD_KEY));
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let mut raw: Value = serde_json::from_str(BUNDLED_TEMPLATE).unwrap();
        raw[RECORD_KEY].as_object_mut().unwrap().remove(HOBBIES);
        let err = Template::from_value(&raw).unwrap_err();
        assert!(matches!(err, TemplateError::MissingSection(ref s) if s == HOBBIES));
    }

    #[test]
    fn test_education_must_be_array_of_records() {
        let mut raw: Value = serde_json::from_str(BUNDLED_TEMPLATE).unwrap();
        raw[RECORD_KEY][EDUCATION] = json!([]);
        let err = Template::from_value(&raw).unwrap_err();
        assert!(matches!(err, TemplateError::WrongShape(ref s, _) if s == EDUCATION));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, BUNDLED_TEMPLATE).unwrap();

        let template = Template::load(&path).unwrap();
        assert_eq!(
            template.record().field(WORKED_PERIOD).unwrap().to_value(),
            json!({
                "TotalExperienceInMonths": "",
                "TotalExperienceInYear": "",
                "TotalExperienceRange": ""
            })
        );
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Template::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }
}

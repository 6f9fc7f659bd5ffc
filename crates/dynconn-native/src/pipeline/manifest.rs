//! Subject manifest
//!
//! JSON list of `{"id": "...", "group": "control" | "patient"}` entries.
//! Controls form the reference cohort for threshold selection.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dynconn_core::SubjectGroup;

use crate::error::{AnalysisError, AnalysisResult};

/// One subject of a batch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Directory name under the input and output roots
    pub id: String,
    /// Cohort membership; `patient` when omitted
    #[serde(default)]
    pub group: SubjectGroup,
}

impl Subject {
    /// Subject in the reference cohort
    pub fn control(id: impl Into<String>) -> Self {
        Self { id: id.into(), group: SubjectGroup::Control }
    }

    /// Subject outside the reference cohort
    pub fn patient(id: impl Into<String>) -> Self {
        Self { id: id.into(), group: SubjectGroup::Patient }
    }

    /// Whether the subject contributes to the threshold
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.group == SubjectGroup::Control
    }
}

/// Validated list of subjects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Subject>", into = "Vec<Subject>")]
pub struct SubjectManifest {
    subjects: Vec<Subject>,
}

impl SubjectManifest {
    /// Validate a subject list
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for an empty list,
    /// duplicate ids, or ids that are not a single path component.
    pub fn new(subjects: Vec<Subject>) -> AnalysisResult<Self> {
        if subjects.is_empty() {
            return Err(AnalysisError::invalid_configuration("subject manifest is empty"));
        }
        let mut seen = HashSet::new();
        for s in &subjects {
            let id = s.id.as_str();
            if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
                return Err(AnalysisError::invalid_configuration(format!("invalid subject id `{id}`")));
            }
            if !seen.insert(id) {
                return Err(AnalysisError::invalid_configuration(format!("duplicate subject id `{id}`")));
            }
        }
        Ok(Self { subjects })
    }

    /// Read and validate a manifest file
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] if the file cannot be
    /// read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::invalid_configuration(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        let subjects: Vec<Subject> = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::invalid_configuration(format!("cannot parse manifest {}: {e}", path.display()))
        })?;
        Self::new(subjects)
    }

    /// All subjects in manifest order
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Subjects of the reference cohort
    pub fn reference_cohort(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter().filter(|s| s.is_reference())
    }

    /// Number of subjects
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Always false for a validated manifest
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl TryFrom<Vec<Subject>> for SubjectManifest {
    type Error = AnalysisError;

    fn try_from(subjects: Vec<Subject>) -> Result<Self, Self::Error> {
        Self::new(subjects)
    }
}

impl From<SubjectManifest> for Vec<Subject> {
    fn from(manifest: SubjectManifest) -> Self {
        manifest.subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default_group() {
        let json = r#"[{"id": "sub-10159", "group": "control"}, {"id": "sub-10171"}]"#;
        let manifest: SubjectManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.subjects()[1].group, SubjectGroup::Patient);
        let cohort: Vec<&str> = manifest.reference_cohort().map(|s| s.id.as_str()).collect();
        assert_eq!(cohort, vec!["sub-10159"]);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        for id in ["../etc", "a/b", "a\\b", "..", ""] {
            assert!(SubjectManifest::new(vec![Subject::patient(id)]).is_err(), "{id}");
        }
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let dup = vec![Subject::control("s1"), Subject::patient("s1")];
        assert!(SubjectManifest::new(dup).is_err());
        assert!(SubjectManifest::new(Vec::new()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subjects.json");
        fs::write(&path, r#"[{"id": "s1", "group": "patient"}]"#).unwrap();
        let manifest = SubjectManifest::load(&path).unwrap();
        assert_eq!(manifest.reference_cohort().count(), 0);

        let err = SubjectManifest::load(dir.path().join("missing.json")).unwrap_err();
        assert!(err.is_fatal());
    }
}

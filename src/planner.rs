//! Derive the field mutations for a true stretch
//!
//! The render resolution is set to the *target*, the fullscreen mode to one
//! that does not letterbox by itself, HDR off and the letterbox flags cleared.
//! Every candidate key becomes a `PatchField` so the preview can also show
//! entries that are already correct; only fields whose current value differs
//! from the desired one are written, which makes re-planning a patched file
//! produce an empty write set.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::StretchProfile;
use crate::document::ConfigDocument;
use crate::error::PlanWarning;
use crate::validator::ValidatedPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldReason {
    ResolutionWidth,
    ResolutionHeight,
    FullscreenMode,
    HdrDisable,
    AspectFill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchField {
    pub file: PathBuf,
    pub key: String,
    /// Value of the first matching pair
    pub current_value: Option<String>,
    /// Values of later pairs with the same key, in file order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicate_values: Vec<String>,
    pub desired_value: String,
    pub reason: FieldReason,
}

impl PatchField {
    /// True when any copy of the key is missing or differs from the desired value
    pub fn is_change(&self) -> bool {
        self.stale_value().is_some() || self.current_value.is_none()
    }

    /// First existing value that still differs from the desired one
    pub fn stale_value(&self) -> Option<&str> {
        self.current_value
            .iter()
            .chain(&self.duplicate_values)
            .map(String::as_str)
            .find(|v| *v != self.desired_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchPlan {
    pub fields: Vec<PatchField>,
    /// Files in apply order, each listed once
    pub target_file_paths: Vec<PathBuf>,
    pub warnings: Vec<PlanWarning>,
}

impl PatchPlan {
    /// Fields that will actually be written
    pub fn effective_fields(&self) -> impl Iterator<Item = &PatchField> {
        self.fields.iter().filter(|f| f.is_change())
    }

    pub fn fields_for<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a PatchField> {
        self.fields.iter().filter(move |f| f.file == path)
    }

    pub fn is_noop(&self) -> bool {
        self.effective_fields().next().is_none()
    }

    /// Append another plan, keeping target paths unique and in order
    pub fn merge(&mut self, other: PatchPlan) {
        for path in other.target_file_paths {
            if !self.target_file_paths.contains(&path) {
                self.target_file_paths.push(path);
            }
        }
        self.fields.extend(other.fields);
        self.warnings.extend(other.warnings);
    }
}

/// Candidate keys with their reason and desired value, duplicates removed
fn candidates(profile: &StretchProfile, pair: &ValidatedPair) -> Vec<(String, FieldReason, String)> {
    let width = pair.target.width.to_string();
    let height = pair.target.height.to_string();

    let all = profile
        .width_keys
        .iter()
        .map(|k| (k, FieldReason::ResolutionWidth, width.clone()))
        .chain(
            profile
                .height_keys
                .iter()
                .map(|k| (k, FieldReason::ResolutionHeight, height.clone())),
        )
        .chain(std::iter::once((
            &profile.fullscreen_key,
            FieldReason::FullscreenMode,
            profile.fullscreen_value.clone(),
        )))
        .chain(std::iter::once((
            &profile.hdr_key,
            FieldReason::HdrDisable,
            profile.hdr_disabled_value.clone(),
        )))
        .chain(
            profile
                .aspect_fill_keys
                .iter()
                .map(|k| (k, FieldReason::AspectFill, profile.aspect_fill_value.clone())),
        );

    let mut out: Vec<(String, FieldReason, String)> = Vec::new();
    for (key, reason, desired) in all {
        if key.is_empty() || out.iter().any(|(k, _, _)| k.eq_ignore_ascii_case(key)) {
            continue;
        }
        out.push((key.clone(), reason, desired));
    }
    out
}

/// Plan the edits for one parsed settings file
///
/// A document that contains none of the candidate keys yields a warning and
/// contributes nothing; otherwise missing keys are planned as additions.
pub fn plan(doc: &ConfigDocument, path: &Path, pair: &ValidatedPair, profile: &StretchProfile) -> PatchPlan {
    let candidates = candidates(profile, pair);

    if !profile.all_keys().any(|key| doc.contains_key(key)) {
        warn!(path = %path.display(), "None of the expected keys found");
        return PatchPlan {
            warnings: vec![PlanWarning::NoRecognizedKeys {
                path: path.to_path_buf(),
            }],
            ..PatchPlan::default()
        };
    }

    let fields: Vec<PatchField> = candidates
        .into_iter()
        .map(|(key, reason, desired_value)| {
            let mut values = doc.values(&key).map(str::to_string);
            PatchField {
                file: path.to_path_buf(),
                current_value: values.next(),
                duplicate_values: values.collect(),
                key,
                desired_value,
                reason,
            }
        })
        .collect();

    let changes = fields.iter().filter(|f| f.is_change()).count();
    debug!(path = %path.display(), candidates = fields.len(), changes, "Planned file");

    PatchPlan {
        fields,
        target_file_paths: vec![path.to_path_buf()],
        warnings: Vec::new(),
    }
}

/// Read and plan every file in order; unreadable or missing files become warnings
pub fn plan_files(paths: &[PathBuf], pair: &ValidatedPair, profile: &StretchProfile) -> PatchPlan {
    let mut combined = PatchPlan::default();
    let mut seen: Vec<&PathBuf> = Vec::new();

    for path in paths {
        if seen.contains(&path) {
            continue;
        }
        seen.push(path);

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Skipping (not found)");
                combined.warnings.push(PlanWarning::MissingFile { path: path.clone() });
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                combined.warnings.push(PlanWarning::Unreadable {
                    path: path.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let doc = ConfigDocument::parse(&text);
        combined.merge(plan(&doc, path, pair, profile));
    }

    info!(
        files = combined.target_file_paths.len(),
        changes = combined.effective_fields().count(),
        warnings = combined.warnings.len(),
        "Built patch plan"
    );
    combined
}

/// Apply the desired values of `fields` to `doc`
///
/// Every copy of a key is set; lines already holding the desired value are
/// left byte-identical.
pub fn patched_document<'a>(
    doc: &ConfigDocument,
    fields: impl IntoIterator<Item = &'a PatchField>,
) -> ConfigDocument {
    fields
        .into_iter()
        .fold(doc.clone(), |acc, field| acc.with_set_value(&field.key, &field.desired_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::ResolutionSpec;

    fn pair(native: &str, target: &str) -> ValidatedPair {
        crate::validator::validate(native.parse().unwrap(), target.parse().unwrap(), None, false)
            .unwrap()
    }

    fn simple_profile() -> StretchProfile {
        StretchProfile {
            width_keys: vec!["Resolution.Width".to_string()],
            height_keys: vec!["Resolution.Height".to_string()],
            fullscreen_key: "FullscreenMode".to_string(),
            fullscreen_value: "Fullscreen".to_string(),
            hdr_key: "HDR".to_string(),
            hdr_disabled_value: "Off".to_string(),
            aspect_fill_keys: Vec::new(),
            aspect_fill_value: "False".to_string(),
        }
    }

    const FOUR_KEYS: &str = "\
# display settings
Resolution.Width=2560
Resolution.Height=1440
FullscreenMode=Windowed
HDR=On
Volume=80
";

    #[test]
    fn test_plan_four_keys() {
        let doc = ConfigDocument::parse(FOUR_KEYS);
        let path = Path::new("settings.ini");
        let plan = plan(&doc, path, &pair("2560x1440", "1280x1024"), &simple_profile());

        let summary: Vec<(&str, Option<&str>, &str, FieldReason)> = plan
            .fields
            .iter()
            .map(|f| (f.key.as_str(), f.current_value.as_deref(), f.desired_value.as_str(), f.reason))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Resolution.Width", Some("2560"), "1280", FieldReason::ResolutionWidth),
                ("Resolution.Height", Some("1440"), "1024", FieldReason::ResolutionHeight),
                ("FullscreenMode", Some("Windowed"), "Fullscreen", FieldReason::FullscreenMode),
                ("HDR", Some("On"), "Off", FieldReason::HdrDisable),
            ]
        );
        assert_eq!(plan.target_file_paths, vec![path.to_path_buf()]);
        assert_eq!(plan.effective_fields().count(), 4);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let doc = ConfigDocument::parse(FOUR_KEYS);
        let path = Path::new("settings.ini");
        let pair = pair("2560x1440", "1280x1024");
        let first = plan(&doc, path, &pair, &simple_profile());

        let patched = patched_document(&doc, &first.fields);
        let second = plan(&patched, path, &pair, &simple_profile());

        assert_eq!(second.fields.len(), first.fields.len());
        assert!(second.fields.iter().all(|f| !f.is_change()));
        assert!(second.is_noop());
        assert_eq!(patched_document(&patched, &second.fields), patched);
    }

    #[test]
    fn test_plan_keeps_unchanged_fields_visible() {
        let doc = ConfigDocument::parse("Resolution.Width=1280\nResolution.Height=1440\n");
        let plan = plan(&doc, Path::new("a.ini"), &pair("2560x1440", "1280x1024"), &simple_profile());
        let width = plan.fields.iter().find(|f| f.key == "Resolution.Width").unwrap();
        assert!(!width.is_change());
        assert_eq!(plan.fields.len(), 4);
    }

    #[test]
    fn test_missing_keys_planned_as_additions() {
        let doc = ConfigDocument::parse("Resolution.Width=2560\n");
        let plan = plan(&doc, Path::new("a.ini"), &pair("2560x1440", "1280x1024"), &simple_profile());
        let hdr = plan.fields.iter().find(|f| f.key == "HDR").unwrap();
        assert_eq!(hdr.current_value, None);
        assert!(hdr.is_change());
    }

    #[test]
    fn test_no_recognized_keys_warns_and_skips() {
        let doc = ConfigDocument::parse("[Audio]\nVolume=80\n");
        let path = Path::new("audio.ini");
        let plan = plan(&doc, path, &pair("2560x1440", "1280x1024"), &simple_profile());
        assert!(plan.fields.is_empty());
        assert!(plan.target_file_paths.is_empty());
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::NoRecognizedKeys {
                path: path.to_path_buf()
            }]
        );
    }

    #[test]
    fn test_duplicate_profile_keys_planned_once() {
        let mut profile = simple_profile();
        profile.width_keys.push("resolution.width".to_string());
        let doc = ConfigDocument::parse(FOUR_KEYS);
        let plan = plan(&doc, Path::new("a.ini"), &pair("2560x1440", "1280x1024"), &profile);
        assert_eq!(plan.fields.len(), 4);
    }

    #[test]
    fn test_default_profile_valorant_keys() {
        let doc = ConfigDocument::parse(
            "ResolutionSizeX=2560\nResolutionSizeY=1440\nHDRDisplayOutputNits=1000\n",
        );
        let plan = plan(
            &doc,
            Path::new("GameUserSettings.ini"),
            &pair("2560x1440", "1280x1024"),
            &StretchProfile::default(),
        );
        assert_eq!(plan.fields.len(), 8);
        let fs_field = plan.fields.iter().find(|f| f.reason == FieldReason::FullscreenMode).unwrap();
        assert_eq!(fs_field.desired_value, "2");
        let width: Vec<&str> = plan
            .fields
            .iter()
            .filter(|f| f.reason == FieldReason::ResolutionWidth)
            .map(|f| f.desired_value.as_str())
            .collect();
        assert_eq!(width, vec!["1280", "1280"]);
    }

    #[test]
    fn test_plan_files_reports_missing_and_reads_present() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.ini");
        let missing = dir.path().join("missing.ini");
        fs::write(&present, FOUR_KEYS).unwrap();

        let plan = plan_files(
            &[present.clone(), missing.clone(), present.clone()],
            &pair("2560x1440", "1280x1024"),
            &simple_profile(),
        );
        assert_eq!(plan.target_file_paths, vec![present.clone()]);
        assert_eq!(plan.warnings, vec![PlanWarning::MissingFile { path: missing }]);
        assert_eq!(plan.fields_for(&present).count(), 4);
    }

    #[test]
    fn test_duplicate_key_with_stale_later_copy_is_a_change() {
        let doc = ConfigDocument::parse(
            "[A]\nResolution.Width=1280\nResolution.Height=1024\nFullscreenMode=Fullscreen\nHDR=Off\n[B]\nHDR=On\n",
        );
        let path = Path::new("a.ini");
        let pair = pair("2560x1440", "1280x1024");
        let plan = plan(&doc, path, &pair, &simple_profile());

        let hdr = plan.fields.iter().find(|f| f.key == "HDR").unwrap();
        assert_eq!(hdr.current_value.as_deref(), Some("Off"));
        assert_eq!(hdr.duplicate_values, vec!["On".to_string()]);
        assert_eq!(hdr.stale_value(), Some("On"));
        assert!(!plan.is_noop());
        assert_eq!(plan.effective_fields().count(), 1);

        let patched = patched_document(&doc, &plan.fields);
        assert_eq!(patched.values("HDR").collect::<Vec<_>>(), vec!["Off", "Off"]);
        assert!(super::plan(&patched, path, &pair, &simple_profile()).is_noop());
    }

    #[test]
    fn test_target_resolution_used_not_native() {
        let doc = ConfigDocument::parse(FOUR_KEYS);
        let pair = ValidatedPair {
            native: ResolutionSpec::new(1920, 1080),
            target: ResolutionSpec::new(1440, 1080),
            warnings: Vec::new(),
        };
        let plan = plan(&doc, Path::new("a.ini"), &pair, &simple_profile());
        assert_eq!(plan.fields[0].desired_value, "1440");
        assert_eq!(plan.fields[1].desired_value, "1080");
    }
}

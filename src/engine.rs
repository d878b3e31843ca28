//! VERIFY -> PREVIEW -> APPLY entry points shared by every front end

use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::apply::{self, ApplyResult};
use crate::config::StretchProfile;
use crate::diff::{self, DiffLine};
use crate::display::{DisplayQuery, UnknownDisplay};
use crate::document::ConfigDocument;
use crate::error::ValidationError;
use crate::planner::{self, PatchPlan};
use crate::resolution::ResolutionSpec;
use crate::validator::{self, ValidatedPair};

pub struct StretchEngine {
    targets: Vec<PathBuf>,
    profile: StretchProfile,
    display: Box<dyn DisplayQuery>,
    native_check: bool,
}

impl StretchEngine {
    /// `targets[0]` is the primary settings file used by the native check
    pub fn new(targets: Vec<PathBuf>, profile: StretchProfile) -> Self {
        Self {
            targets,
            profile,
            display: Box::new(UnknownDisplay),
            native_check: true,
        }
    }

    pub fn with_display(mut self, display: impl DisplayQuery + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    /// Toggle the check that the primary file was last saved at native fullscreen + fill
    pub fn with_native_check(mut self, enabled: bool) -> Self {
        self.native_check = enabled;
        self
    }

    pub fn verify(
        &self,
        native: ResolutionSpec,
        target: ResolutionSpec,
        force: bool,
    ) -> Result<ValidatedPair, ValidationError> {
        let actual = self.display.active_resolution();
        let pair = validator::validate(native, target, actual, force)?;

        if !self.native_check {
            return Ok(pair);
        }
        let Some(primary) = self.targets.first() else {
            return Ok(pair);
        };
        match fs::read_to_string(primary) {
            Ok(text) => {
                let doc = ConfigDocument::parse(&text);
                let pair = validator::check_native_config(&doc, pair, &self.profile, force)?;
                info!(native = %native, target = %target, warnings = pair.warnings.len(), "Verified");
                Ok(pair)
            }
            Err(e) => {
                // the planner reports the unreadable file
                debug!(path = %primary.display(), error = %e, "Skipping native check");
                Ok(pair)
            }
        }
    }

    /// Build the plan from the files as they are on disk right now
    pub fn plan(&self, pair: &ValidatedPair) -> PatchPlan {
        planner::plan_files(&self.targets, pair, &self.profile)
    }

    pub fn preview(&self, pair: &ValidatedPair) -> Vec<DiffLine> {
        diff::render(&self.plan(pair))
    }

    pub fn apply(&self, plan: &PatchPlan) -> ApplyResult {
        apply::apply(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MismatchOrigin;

    const NATIVE_GUS: &str = "\
[/Script/ShooterGame.ShooterGameUserSettings]
bShouldLetterbox=False
bLastConfirmedShouldLetterbox=False
ResolutionSizeX=2560
ResolutionSizeY=1440
LastUserConfirmedResolutionSizeX=2560
LastUserConfirmedResolutionSizeY=1440
FullscreenMode=0
bUseHDRDisplayOutput=True
AudioQualityLevel=0
";

    fn res(s: &str) -> ResolutionSpec {
        s.parse().unwrap()
    }

    fn setup() -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("GameUserSettings.ini");
        let user = dir.path().join("user").join("GameUserSettings.ini");
        fs::create_dir_all(user.parent().unwrap()).unwrap();
        fs::write(&root, NATIVE_GUS).unwrap();
        fs::write(&user, NATIVE_GUS).unwrap();
        (dir, vec![root, user])
    }

    #[test]
    fn test_verify_preview_apply_flow() {
        let (_dir, targets) = setup();
        let engine = StretchEngine::new(targets.clone(), StretchProfile::default())
            .with_display(|| Some(ResolutionSpec::new(2560, 1440)));

        let pair = engine.verify(res("2560x1440"), res("1280x1024"), false).unwrap();
        assert!(pair.warnings.is_empty());

        let lines = engine.preview(&pair);
        assert_eq!(lines.len(), 16);
        // letterbox flags already correct
        assert_eq!(lines.iter().filter(|l| l.changed).count(), 12);

        let plan = engine.plan(&pair);
        let result = engine.apply(&plan);
        assert!(result.succeeded);
        assert_eq!(result.files_written, targets);

        for path in &targets {
            let doc = ConfigDocument::parse(&fs::read_to_string(path).unwrap());
            assert_eq!(doc.get_value("ResolutionSizeX"), Some("1280"));
            assert_eq!(doc.get_value("LastUserConfirmedResolutionSizeY"), Some("1024"));
            assert_eq!(doc.get_value("FullscreenMode"), Some("2"));
            assert_eq!(doc.get_value("bUseHDRDisplayOutput"), Some("False"));
            assert_eq!(doc.get_value("AudioQualityLevel"), Some("0"));
        }

        // after patching, the primary file no longer sits at native
        let err = engine.verify(res("2560x1440"), res("1280x1024"), false).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NativeMismatch {
                origin: MismatchOrigin::ConfigKey(_),
                ..
            }
        ));
    }

    #[test]
    fn test_verify_display_mismatch() {
        let (_dir, targets) = setup();
        let engine = StretchEngine::new(targets, StretchProfile::default())
            .with_display(|| Some(ResolutionSpec::new(1920, 1080)));

        let err = engine.verify(res("2560x1440"), res("1280x1024"), false).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NativeMismatch {
                origin: MismatchOrigin::ActiveDisplay,
                ..
            }
        ));

        let pair = engine.verify(res("2560x1440"), res("1280x1024"), true).unwrap();
        assert_eq!(pair.warnings.len(), 1);
    }

    #[test]
    fn test_verify_without_native_check_ignores_file() {
        let (_dir, targets) = setup();
        let engine = StretchEngine::new(targets, StretchProfile::default()).with_native_check(false);
        let pair = engine.verify(res("1920x1080"), res("1280x1024"), false).unwrap();
        assert!(pair.warnings.is_empty());
    }

    #[test]
    fn test_verify_missing_primary_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StretchEngine::new(
            vec![dir.path().join("nope.ini")],
            StretchProfile::default(),
        );
        assert!(engine.verify(res("2560x1440"), res("1280x1024"), false).is_ok());
    }
}

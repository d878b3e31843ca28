//! Precondition checks for a (native, target) pair
//!
//! Rules run in a fixed order and the first hard failure wins. With `force`
//! the exceeds-native and native-mismatch rules are downgraded to warnings,
//! which travel on the `ValidatedPair` so the preview can show them.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::StretchProfile;
use crate::document::ConfigDocument;
use crate::error::{MismatchOrigin, ValidationError};
use crate::resolution::ResolutionSpec;

/// A pair that passed validation, plus any forced-through findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedPair {
    pub native: ResolutionSpec,
    pub target: ResolutionSpec,
    pub warnings: Vec<ValidationError>,
}

impl ValidatedPair {
    fn downgrade(&mut self, err: ValidationError, force: bool) -> Result<(), ValidationError> {
        if !force {
            return Err(err);
        }
        warn!(warning = %err, "Continuing despite failed check (force)");
        self.warnings.push(err);
        Ok(())
    }
}

pub fn validate(
    native: ResolutionSpec,
    target: ResolutionSpec,
    actual_display: Option<ResolutionSpec>,
    force: bool,
) -> Result<ValidatedPair, ValidationError> {
    for res in [native, target] {
        if !res.is_positive() {
            return Err(ValidationError::MalformedResolution {
                input: res.to_string(),
            });
        }
    }

    let mut pair = ValidatedPair {
        native,
        target,
        warnings: Vec::new(),
    };

    if target.exceeds(&native) {
        pair.downgrade(ValidationError::TargetExceedsNative { native, target }, force)?;
    }

    match actual_display {
        Some(actual) if actual != native => {
            pair.downgrade(
                ValidationError::NativeMismatch {
                    origin: MismatchOrigin::ActiveDisplay,
                    expected: native.to_string(),
                    found: actual.to_string(),
                },
                force,
            )?;
        }
        Some(_) => {}
        None => debug!("Active display resolution unknown, skipping display check"),
    }

    if native == target {
        return Err(ValidationError::NoOp(native));
    }

    Ok(pair)
}

/// Check that the primary settings file was last saved at native fullscreen + fill
///
/// Resolution keys must hold the native dimensions and the aspect-fill keys
/// the fill value. The first offending key is reported.
pub fn check_native_config(
    doc: &ConfigDocument,
    mut pair: ValidatedPair,
    profile: &StretchProfile,
    force: bool,
) -> Result<ValidatedPair, ValidationError> {
    let width = pair.native.width.to_string();
    let height = pair.native.height.to_string();

    let expectations = profile
        .width_keys
        .iter()
        .map(|k| (k, width.as_str()))
        .chain(profile.height_keys.iter().map(|k| (k, height.as_str())))
        .chain(
            profile
                .aspect_fill_keys
                .iter()
                .map(|k| (k, profile.aspect_fill_value.as_str())),
        );

    for (key, expected) in expectations {
        let found = doc.get_value(key);
        if found.is_some_and(|v| v.eq_ignore_ascii_case(expected)) {
            continue;
        }
        let err = ValidationError::NativeMismatch {
            origin: MismatchOrigin::ConfigKey(key.clone()),
            expected: expected.to_string(),
            found: found.unwrap_or("<missing>").to_string(),
        };
        pair.downgrade(err, force)?;
        break;
    }

    Ok(pair)
}

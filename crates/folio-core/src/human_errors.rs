// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language descriptions of conversion errors.
//
// Every technical error maps to a short message and a suggestion the person
// who uploaded the images can act on.

use crate::error::{FolioError, ItemError, ItemFailure};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retrying the same input may succeed (timeouts).
    Transient,
    /// The user has to change something (different file, different settings).
    ActionRequired,
    /// The input cannot be used as it is.
    Permanent,
}

/// A human-readable error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether retrying the same input makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Describe a batch-level error.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::EmptyBatch => HumanError {
            message: "No images were uploaded.".into(),
            suggestion: "Pick at least one JPG, PNG or WebP image and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        FolioError::NoPagesProduced { failures } => HumanError {
            message: format!(
                "None of your {} images could be turned into pages.",
                failures.len()
            ),
            suggestion: "Check that the files are real JPG, PNG or WebP photos and not renamed documents.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        FolioError::Serialization(detail) => HumanError {
            message: "We couldn't finish writing the PDF.".into(),
            suggestion: format!("Try again with fewer images. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        },
        FolioError::Inspect(detail) => HumanError {
            message: "The PDF couldn't be opened.".into(),
            suggestion: format!("Make sure the file is a complete PDF. (Detail: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        FolioError::Cancelled => HumanError {
            message: "The conversion was stopped before it finished.".into(),
            suggestion: "Start the conversion again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        FolioError::Config(detail) => HumanError {
            message: "The conversion settings are not valid.".into(),
            suggestion: format!("Fix the settings and try again. (Detail: {detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        FolioError::Io(io_err) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check the file exists and that you have permission to use it. ({io_err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        FolioError::Json(json_err) => HumanError {
            message: "The settings file is not valid JSON.".into(),
            suggestion: format!("Fix the file and try again. ({json_err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

/// Describe why a single image was skipped.
pub fn humanize_item_error(err: &ItemError) -> HumanError {
    match err {
        ItemError::Decode(_) => HumanError {
            message: "This file isn't a readable image.".into(),
            suggestion: "It may be damaged or only partly uploaded. Try exporting it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        ItemError::UnsupportedFormat(_) => HumanError {
            message: "This type of image can't be added to the PDF.".into(),
            suggestion: "Save the image as JPG or PNG first, then add it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ItemError::TimedOut { .. } => HumanError {
            message: "This image took too long to process.".into(),
            suggestion: "Try again, or use a smaller version of the image.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        ItemError::Encode(_) => HumanError {
            message: "This image couldn't be converted for the PDF.".into(),
            suggestion: "Save the image as JPG or PNG and add it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ItemError::Embed(_) => HumanError {
            message: "This image couldn't be placed in the PDF.".into(),
            suggestion: "Save the image as JPG and add it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ItemError::Cancelled => HumanError {
            message: "This image was not processed because the conversion was stopped.".into(),
            suggestion: "Start the conversion again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// One-line descriptor for a skipped item: position (1-based for people) and
/// reason.
pub fn describe_failure(failure: &ItemFailure) -> String {
    let human = humanize_item_error(&failure.error);
    format!("Image {} was skipped: {}", failure.index + 1, human.message)
}

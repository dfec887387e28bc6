//! Migration-file artifacts for unsafe operations.
//!
//! Unsafe operations are never applied automatically. They are listed in a
//! generated JavaScript migration stub for a developer to complete and
//! review; the stub itself is never executed by schemasync.

use super::operation::MigrationOperation;
use chrono::{DateTime, Utc};

/// Slug used in generated migration file names.
pub const ARTIFACT_SLUG: &str = "schemasync_unsafe_changes";

/// A rendered migration stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationArtifact {
    /// File name, `{unix_seconds}_{slug}.js`.
    pub file_name: String,
    /// File contents.
    pub contents: String,
}

impl MigrationArtifact {
    /// Render a stub for the given unsafe operations.
    ///
    /// Returns `None` when there is nothing to defer.
    pub fn render(operations: &[MigrationOperation], timestamp: DateTime<Utc>) -> Option<Self> {
        if operations.is_empty() {
            return None;
        }

        let mut up = String::new();
        for op in operations {
            up.push_str("  // ");
            up.push_str(&single_line(op.summary()));
            if op.requires_data_migration() {
                up.push_str(" (requires data migration)");
            }
            up.push('\n');
        }

        let contents = format!(
            "/// Generated by schemasync on {}.\n\
             /// These changes were not applied automatically because they may\n\
             /// destroy data or violate constraints on existing records.\n\
             migrate((app) => {{\n\
             {}  // TODO: implement the changes above and migrate existing records.\n\
             }}, (app) => {{\n  // TODO: revert the changes above.\n}})\n",
            timestamp.to_rfc3339(),
            up
        );

        Some(Self {
            file_name: format!("{}_{}.js", timestamp.timestamp(), ARTIFACT_SLUG),
            contents,
        })
    }

    /// Render with the current time.
    pub fn render_now(operations: &[MigrationOperation]) -> Option<Self> {
        Self::render(operations, Utc::now())
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

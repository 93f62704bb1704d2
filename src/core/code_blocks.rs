//! Per-block policy for fenced code in the lite variant.
//!
//! Blocks are numbered 1.. in document order and matched to
//! [`CodeBlockSpec`]s by that number.

use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};

use super::models::{CodeAction, CodeBlockSpec};
use crate::error::{Result, Warning};

/// Result of applying code-block policy to a text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBlockOutcome {
    pub text: String,
    /// Blocks that were summarized, removed or extracted
    pub processed: usize,
    pub warnings: Vec<Warning>,
}

/// Applies [`CodeAction`]s to fenced code blocks.
///
/// # Example
///
/// ```rust
/// use distill::core::code_blocks::CodeBlockProcessor;
/// use distill::core::models::{CodeAction, CodeBlockSpec};
///
/// let processor = CodeBlockProcessor::new().unwrap();
/// let text = "Try this:\n```python\nprint('hi')\n```\nDone.";
/// let specs = [CodeBlockSpec::new(1, CodeAction::Summarize).with_description("greeting script")];
///
/// let outcome = processor.process(text, &specs);
/// assert_eq!(outcome.text, "Try this:\n\n[Code: greeting script]\n\nDone.");
/// ```
#[derive(Debug, Clone)]
pub struct CodeBlockProcessor {
    fence: Regex,
    output_dir: Option<PathBuf>,
}

/// Artifact paths must stay below the output directory.
fn is_contained(path: &Path) -> bool {
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl CodeBlockProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fence: Regex::new(r"(?s)```(\w*)\n(.*?)```")?,
            output_dir: None,
        })
    }

    /// Sets the directory extracted artifacts are written under.
    #[must_use]
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Applies `specs` to the blocks of `text`.
    ///
    /// Blocks are handled last to first so earlier offsets stay valid.
    /// Blocks without a spec are left alone.
    pub fn process(&self, text: &str, specs: &[CodeBlockSpec]) -> CodeBlockOutcome {
        let mut outcome = CodeBlockOutcome {
            text: text.to_string(),
            ..CodeBlockOutcome::default()
        };
        if specs.is_empty() {
            return outcome;
        }

        let blocks: Vec<_> = self.fence.captures_iter(text).collect();
        for (position, caps) in blocks.iter().enumerate().rev() {
            let id = position + 1;
            let Some(spec) = specs.iter().find(|s| s.id == id) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let language = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|l| !l.is_empty())
                .unwrap_or(&spec.language);
            let code = caps.get(2).map_or("", |m| m.as_str());

            let replacement = match spec.action {
                CodeAction::Keep => None,
                CodeAction::Summarize => {
                    let summary = spec.description.clone().unwrap_or_else(|| {
                        let language = if language.is_empty() { "code" } else { language };
                        let lines = if spec.lines > 0 {
                            spec.lines
                        } else {
                            code.lines().count()
                        };
                        format!("{language} code block ({lines} lines)")
                    });
                    debug!(id, %summary, "summarized code block");
                    Some(format!("\n[Code: {summary}]\n"))
                }
                CodeAction::Remove => {
                    debug!(id, "removed code block");
                    Some(String::new())
                }
                CodeAction::Extract => self.extract(spec, code, &mut outcome.warnings),
            };

            if let Some(replacement) = replacement {
                outcome.text.replace_range(whole.range(), &replacement);
                outcome.processed += 1;
            }
        }

        outcome
    }

    /// Writes one block out; returns its replacement, or `None` to keep it.
    fn extract(&self, spec: &CodeBlockSpec, code: &str, warnings: &mut Vec<Warning>) -> Option<String> {
        let mut record = |warning: Warning| {
            warn!("{warning}");
            warnings.push(warning);
        };

        let Some(artifact) = spec.artifact_path.as_deref().filter(|p| !p.trim().is_empty()) else {
            record(Warning::MissingArtifactPath { id: spec.id });
            return None;
        };
        if !is_contained(Path::new(artifact)) {
            record(Warning::ArtifactWriteUnavailable {
                path: artifact.to_string(),
            });
            return None;
        }
        let Some(dir) = &self.output_dir else {
            record(Warning::ArtifactWriteUnavailable {
                path: artifact.to_string(),
            });
            return Some(format!("\n[Code not extracted: no output directory for {artifact}]\n"));
        };

        let target = dir.join(artifact);
        let written = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&target, format!("{}\n", code.trim_end_matches('\n'))));

        match written {
            Ok(()) => {
                info!(id = spec.id, path = %target.display(), "extracted code block");
                Some(format!("\n[Code extracted to {artifact}]\n"))
            }
            Err(err) => {
                record(Warning::ArtifactWriteFailed {
                    path: artifact.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Removal of conflicting `format` declarations from `declare-styleable` attrs.

use crate::document::{self, Document};
use crate::error::ResolveError;
use crate::locator::locate;
use crate::policy::ExclusionPolicy;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const DECLARE_STYLEABLE: &str = "declare-styleable";
const ATTR: &str = "attr";
const NAME: &str = "name";
const FORMAT: &str = "format";

/// Location of the resource document inside a candidate root
pub fn values_document_path(root: &Path) -> PathBuf {
    root.join("res").join("values").join("values.xml")
}

/// When a parsed document is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Only when at least one `format` was removed
    #[default]
    OnChange,
    /// Every parsed document is rewritten, even with nothing removed
    Always,
}

/// Options controlling how documents are rewritten
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub write_mode: WriteMode,
    /// Report what would change without touching any file
    pub dry_run: bool,
}

/// What happened to a single candidate root
#[derive(Debug)]
pub enum Outcome {
    /// Excluded by the policy's owner-path filter
    FilteredOut,
    /// No `res/values/values.xml` under the root
    NoFile,
    /// Parsed, nothing to remove, not rewritten
    Unchanged,
    /// Rewritten (or would be, in a dry run) with this many `format` attributes removed.
    /// The count is zero when `WriteMode::Always` rewrote an untouched document.
    Modified(usize),
    Failed(ResolveError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Number of `format` attributes removed
    pub fn removed(&self) -> usize {
        match self {
            Outcome::Modified(count) => *count,
            _ => 0,
        }
    }
}

/// Outcome of one candidate root
#[derive(Debug)]
pub struct RootReport {
    pub root: PathBuf,
    pub outcome: Outcome,
}

/// Outcomes of a batch, in processing order
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub roots: Vec<RootReport>,
}

impl ResolveReport {
    /// Roots that passed the owner filter
    pub fn processed(&self) -> usize {
        self.count(|o| !matches!(o, Outcome::FilteredOut))
    }

    pub fn filtered_out(&self) -> usize {
        self.count(|o| matches!(o, Outcome::FilteredOut))
    }

    pub fn without_document(&self) -> usize {
        self.count(|o| matches!(o, Outcome::NoFile))
    }

    /// Documents rewritten (or that would be, in a dry run)
    pub fn modified(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Modified(_)))
    }

    pub fn failures(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    /// Total `format` attributes removed across all roots
    pub fn removed(&self) -> usize {
        self.roots.iter().map(|r| r.outcome.removed()).sum()
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.roots.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Remove the excluded `format` attributes from a document.
///
/// For each `declare-styleable` directly under the root element whose name is listed in
/// the policy, the first `attr` child with the listed name loses its `format` attribute.
/// Everything else in the document is left alone. Returns the number of removals.
pub fn strip_excluded_formats(document: &mut Document, policy: &ExclusionPolicy) -> usize {
    let mut removed = 0;

    for group in document
        .root
        .child_elements_mut()
        .filter(|element| element.name == DECLARE_STYLEABLE)
    {
        let Some(group_name) = group.attribute(NAME).map(str::to_string) else {
            continue;
        };
        let Some(target) = policy.excluded_attr(&group_name) else {
            continue;
        };

        let attr = group
            .child_elements_mut()
            .find(|child| child.name == ATTR && child.attribute(NAME) == Some(target));

        if let Some(attr) = attr {
            if let Some(format) = attr.remove_attribute(FORMAT) {
                debug!(styleable = %group_name, attr = target, format = %format, "removed attr format");
                removed += 1;
            }
        }
    }

    removed
}

/// Process one candidate root: load its resource document, strip excluded formats, write it back.
///
/// Failures are logged and returned as `Outcome::Failed`; they never panic or propagate.
pub fn process_one(root: &Path, policy: &ExclusionPolicy, options: ResolveOptions) -> Outcome {
    let path = values_document_path(root);
    if !path.is_file() {
        debug!(root = %root.display(), "no values.xml, skipping");
        return Outcome::NoFile;
    }

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(source) => return failed(ResolveError::Read { path, source }),
    };

    let mut document = match document::parse(&source) {
        Ok(document) => document,
        Err(source) => return failed(ResolveError::Parse { path, source }),
    };

    let removed = strip_excluded_formats(&mut document, policy);

    if removed == 0 && options.write_mode == WriteMode::OnChange {
        debug!(path = %path.display(), "nothing to remove");
        return Outcome::Unchanged;
    }

    if options.dry_run {
        info!(path = %path.display(), removed, "would rewrite resource document");
        return Outcome::Modified(removed);
    }

    if let Err(source) = replace_file(&path, &document.to_pretty_string()) {
        return failed(ResolveError::Write { path, source });
    }

    info!(path = %path.display(), removed, "rewrote resource document");
    Outcome::Modified(removed)
}

/// Write `content` to a sibling temp file and rename it over `path`.
/// A failure at any point leaves the original document intact.
fn replace_file(path: &Path, content: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|err| err.error)?;

    Ok(())
}

fn failed(err: ResolveError) -> Outcome {
    warn!(path = %err.path().display(), error = %err, "leaving resource document unresolved");
    Outcome::Failed(err)
}

/// Process every candidate root in order. Roots rejected by the owner filter are
/// recorded as `FilteredOut`; a failure on one root never stops the others.
pub fn resolve<I>(roots: I, policy: &ExclusionPolicy, options: ResolveOptions) -> ResolveReport
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut report = ResolveReport::default();

    for root in roots {
        let outcome = if policy.is_eligible(&root) {
            process_one(&root, policy, options)
        } else {
            debug!(root = %root.display(), "filtered out by owner path");
            Outcome::FilteredOut
        };
        report.roots.push(RootReport { root, outcome });
    }

    report
}

/// Locate the variant's resource roots under `exploded_dir` and resolve them
pub fn resolve_variant(
    exploded_dir: &Path,
    variant: &str,
    policy: &ExclusionPolicy,
    options: ResolveOptions,
) -> ResolveReport {
    let roots = locate(exploded_dir, variant);
    debug!(variant, candidates = roots.len(), "located variant resource roots");
    resolve(roots, policy, options)
}

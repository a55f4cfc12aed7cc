//! Model discovery and loading.
//!
//! Patterns use `globset` syntax with literal separators: `*` stays inside one
//! path component, `**` spans directories. Directories and dot-prefixed entries
//! below a pattern's literal prefix are never returned.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::CastorError;
use crate::model::{Associations, ModelDefinition, ModelMap, import_manifest};

/// Builds one model definition from the absolute path of its file.
pub type ModelFactory = Arc<dyn Fn(&Path) -> Result<ModelDefinition, CastorError> + Send + Sync>;

/// Factory reading TOML model manifests.
pub fn default_factory() -> ModelFactory {
    Arc::new(import_manifest)
}

/// Compiles every pattern, surfacing the first syntax error.
pub fn check_patterns<P: AsRef<str>>(patterns: &[P]) -> Result<(), CastorError> {
    for pattern in patterns {
        compile(pattern.as_ref())?;
    }
    Ok(())
}

/// Expands `patterns` in order, dropping anything matched by `ignore`.
///
/// A pattern without matches contributes nothing.
pub fn discover_files<P, I>(patterns: &[P], ignore: &[I]) -> Result<Vec<PathBuf>, CastorError>
where
    P: AsRef<str>,
    I: AsRef<str>,
{
    let ignore = ignore_set(ignore)?;
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matched = expand(pattern, &ignore)?;
        debug!(pattern, files = matched.len(), "expanded model pattern");
        files.extend(matched);
    }
    Ok(files)
}

/// Runs `factory` for each file and indexes the results by model name.
///
/// A later file declaring an already-loaded name replaces the earlier model.
pub fn load_models(files: &[PathBuf], factory: &ModelFactory) -> Result<ModelMap, CastorError> {
    let mut models = ModelMap::with_capacity(files.len());
    for file in files {
        let path = std::path::absolute(file).map_err(|err| {
            CastorError::configuration(format!(
                "cannot resolve model path {}: {err}",
                file.display()
            ))
        })?;
        let model = factory(&path)?;
        let name = model.name().to_string();
        if models.insert(name.clone(), Arc::new(model)).is_some() {
            warn!(
                model = %name,
                path = %path.display(),
                "duplicate model name; the later definition replaces the earlier one"
            );
        }
    }
    Ok(models)
}

/// Invokes every associate hook with the complete model set.
pub fn apply_associations(models: ModelMap) -> Result<ModelMap, CastorError> {
    if let Some((key, model)) = models.iter().find(|(key, model)| key.as_str() != model.name()) {
        return Err(CastorError::InvalidModelSet(format!(
            "entry `{key}` holds model `{}`",
            model.name()
        )));
    }

    let view = Associations::new(&models);
    for model in models.values() {
        if let Some(hook) = model.associate_hook() {
            hook(&view)?;
        }
    }
    Ok(models)
}

fn compile(pattern: &str) -> Result<Glob, CastorError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|err| CastorError::configuration(format!("invalid glob pattern `{pattern}`: {err}")))
}

fn ignore_set<I: AsRef<str>>(ignore: &[I]) -> Result<GlobSet, CastorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in ignore {
        builder.add(compile(pattern.as_ref())?);
    }
    builder
        .build()
        .map_err(|err| CastorError::configuration(format!("invalid ignore patterns: {err}")))
}

fn expand(pattern: &str, ignore: &GlobSet) -> Result<Vec<PathBuf>, CastorError> {
    let matcher = compile(pattern)?.compile_matcher();
    let (base, has_wildcards) = literal_prefix(pattern);

    if !has_wildcards {
        let path = PathBuf::from(pattern);
        let keep = path.is_file() && !ignore.is_match(&path);
        return Ok(if keep { vec![path] } else { Vec::new() });
    }

    let relative = base.as_os_str().is_empty();
    let root = if relative { Path::new(".") } else { base.as_path() };
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(root).sort_by_file_name();
    if let Some(depth) = walk_depth(pattern, &base) {
        walker = walker.max_depth(depth);
    }

    Ok(walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(pattern, error = %err, "failed to read model directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            let stripped = relative
                .then(|| path.strip_prefix(".").ok().map(Path::to_path_buf))
                .flatten();
            let candidate = stripped.unwrap_or(path);
            is_candidate(&candidate, &matcher, ignore).then_some(candidate)
        })
        .collect())
}

fn is_candidate(path: &Path, matcher: &GlobMatcher, ignore: &GlobSet) -> bool {
    matcher.is_match(path) && !ignore.is_match(path)
}

/// Splits off the leading components that contain no wildcard characters.
fn literal_prefix(pattern: &str) -> (PathBuf, bool) {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        if let Component::Normal(part) = component
            && has_wildcard(&part.to_string_lossy())
        {
            return (base, true);
        }
        base.push(component);
    }
    (base, false)
}

/// How deep below its literal prefix a pattern can match; `None` when it is unbounded.
///
/// Alternations may hide separators, so they are treated like `**`.
fn walk_depth(pattern: &str, base: &Path) -> Option<usize> {
    if pattern.contains("**") || pattern.contains('{') {
        return None;
    }
    let total = Path::new(pattern).components().count();
    Some(total.saturating_sub(base.components().count()))
}

fn has_wildcard(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

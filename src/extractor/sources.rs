use std::path::PathBuf;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::content::decode_entities;

static TEXTAREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<textarea[^>]*>(.*?)</textarea>").unwrap());

/// Known editor surfaces, highest priority first. Each pattern locates the
/// surface; the first `<textarea>` at or after that point holds its text.
static EDITOR_SURFACES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (".CodeMirror textarea", r#"(?i)<[a-z]+[^>]*\sclass=["'][^"']*\bCodeMirror\b"#),
        (".ace_text-input", r#"(?i)<textarea[^>]*\sclass=["'][^"']*\bace_text-input\b"#),
        ("#editor textarea", r#"(?i)<[a-z]+[^>]*\sid=["']editor["']"#),
        (".monaco-editor textarea", r#"(?i)<[a-z]+[^>]*\sclass=["'][^"']*\bmonaco-editor\b"#),
        (
            "[data-cy=\"code-editor\"] textarea",
            r#"(?i)<[a-z]+[^>]*\sdata-cy=["']code-editor["']"#,
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// One ranked way of recovering the solution text when no submission exists.
pub trait CodeStrategy {
    fn name(&self) -> &str;
    fn try_extract(&self) -> Option<String>;
}

/// A local source file, e.g. the buffer the user is editing.
pub struct CodeFile {
    path: PathBuf,
    label: String,
}

impl CodeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("file:{}", path.display());
        Self { path, label }
    }
}

impl CodeStrategy for CodeFile {
    fn name(&self) -> &str {
        &self.label
    }

    fn try_extract(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => non_empty(text.trim()),
            Err(e) => {
                warn!("Cannot read {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// An editor surface inside a saved snapshot of the page.
pub struct EditorSurface {
    index: usize,
    snapshot: Rc<str>,
}

impl CodeStrategy for EditorSurface {
    fn name(&self) -> &str {
        EDITOR_SURFACES[self.index].0
    }

    fn try_extract(&self) -> Option<String> {
        let (_, locator) = &EDITOR_SURFACES[self.index];
        let start = locator.find(&self.snapshot)?.start();
        let caps = TEXTAREA_RE.captures_at(&self.snapshot, start)?;
        non_empty(decode_entities(&caps[1]).trim())
    }
}

/// All editor surfaces over one snapshot, in priority order.
pub fn editor_surfaces(snapshot: &str) -> Vec<EditorSurface> {
    let snapshot: Rc<str> = Rc::from(snapshot);
    (0..EDITOR_SURFACES.len())
        .map(|index| EditorSurface {
            index,
            snapshot: Rc::clone(&snapshot),
        })
        .collect()
}

/// First non-empty result of the strategies, with the winner's name.
pub fn first_code(strategies: &[Box<dyn CodeStrategy>]) -> Option<(String, String)> {
    strategies
        .iter()
        .find_map(|s| s.try_extract().map(|code| (s.name().to_string(), code)))
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

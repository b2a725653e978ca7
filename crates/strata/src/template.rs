// File: src/template.rs
// Purpose: Page/layout/component composition into one Tera namespace

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

use crate::helpers::TemplateHelpers;
use crate::hook::HookData;
use crate::Params;

/// Name of the template that is executed to produce a response
pub const LAYOUT_TEMPLATE: &str = "layout";

/// Name under which the page (or error page) is registered
pub const PAGE_TEMPLATE: &str = "page";

/// Default layout, as a component name relative to the components root
pub const DEFAULT_LAYOUT: &str = "layouts/layout.html";

/// Extension of composable template files
pub const TEMPLATE_EXTENSION: &str = "html";

static LAYOUT_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!-- layout:(.*)-->$").expect("layout declaration regex"));

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template error: {}", describe(.0))]
    Parse(tera::Error),

    #[error("template execution error: {}", describe(.0))]
    Execute(tera::Error),
}

/// Flattens a Tera error and its causes into one line
///
/// Tera's top-level message only names the failing template; the useful
/// detail lives in the source chain.
pub fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

/// Returns the layout path declared by `<!-- layout: path -->`, if any
///
/// Lines are trimmed before matching; the first declaration wins.
///
/// ```
/// use strata::template::declared_layout;
///
/// let page = "<!-- layout: components/layouts/blog.html -->\n<h1>Hi</h1>";
/// assert_eq!(declared_layout(page).as_deref(), Some("components/layouts/blog.html"));
/// assert_eq!(declared_layout("<h1>Hi</h1>"), None);
/// ```
pub fn declared_layout(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        LAYOUT_DECLARATION
            .captures(line.trim())
            .map(|caps| caps[1].trim().to_string())
    })
}

/// Removes the winning layout declaration line so it never reaches clients
///
/// Every other line, including later declarations, is kept as written.
pub fn strip_layout_declaration(content: &str) -> String {
    let mut stripped = String::with_capacity(content.len());
    let mut found = false;

    for line in content.split_inclusive('\n') {
        if !found && LAYOUT_DECLARATION.is_match(line.trim()) {
            found = true;
            continue;
        }
        stripped.push_str(line);
    }

    stripped
}

/// A reusable sub-template found under the components root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Path relative to the components root, `/`-separated (e.g. `nav.html`)
    pub name: String,
    pub path: PathBuf,
}

/// Recursively collects `*.html` files under the components root
///
/// Sorted by name. A missing root yields no components.
pub fn collect_components(root: &Path) -> Vec<Component> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut components: Vec<Component> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|s| s.to_str()) == Some(TEMPLATE_EXTENSION)
        })
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            Some(Component {
                name,
                path: entry.path().to_path_buf(),
            })
        })
        .collect();

    components.sort_by(|a, b| a.name.cmp(&b.name));
    components
}

/// The template set for one render: declared layout, page and components
#[derive(Debug, Clone)]
pub struct Composition {
    pub page: PathBuf,
    pub page_source: String,
    /// Declared layout, resolved against the site root
    pub layout: Option<PathBuf>,
    pub components: Vec<Component>,
}

impl Composition {
    /// Reads the page, detects its layout and gathers the components
    ///
    /// The declaration line itself is dropped from `page_source`.
    pub fn load(page: &Path, site_root: &Path, components_root: &Path) -> Result<Self, CompositionError> {
        let source = read(page)?;
        let layout = declared_layout(&source).map(|decl| site_root.join(decl));
        let page_source = match layout {
            Some(_) => strip_layout_declaration(&source),
            None => source,
        };

        Ok(Self {
            page: page.to_path_buf(),
            page_source,
            layout,
            components: collect_components(components_root),
        })
    }

    pub fn has_declared_layout(&self) -> bool {
        self.layout.is_some()
    }

    /// Drops the default layout component from the set
    pub fn without_default_layout(mut self) -> Self {
        self.components.retain(|c| c.name != DEFAULT_LAYOUT);
        self
    }

    /// Parses every template into one namespace
    ///
    /// `layout` is the declared layout, else the default layout component,
    /// else the page itself.
    pub fn compile(&self, helpers: &TemplateHelpers) -> Result<Tera, CompositionError> {
        let mut templates: Vec<(String, String)> = self
            .components
            .iter()
            .map(|c| Ok((c.name.clone(), read(&c.path)?)))
            .collect::<Result<_, CompositionError>>()?;

        let layout_source = match &self.layout {
            Some(path) => read(path)?,
            None => templates
                .iter()
                .find(|(name, _)| name == DEFAULT_LAYOUT)
                .map(|(_, source)| source.clone())
                .unwrap_or_else(|| self.page_source.clone()),
        };

        templates.push((PAGE_TEMPLATE.to_string(), self.page_source.clone()));
        templates.push((LAYOUT_TEMPLATE.to_string(), layout_source));

        let mut tera = Tera::default();
        tera.autoescape_on(vec![""]);
        helpers.install(&mut tera);
        tera.add_raw_templates(templates)
            .map_err(CompositionError::Parse)?;

        Ok(tera)
    }

    /// Compiles and executes `layout` against a context
    pub fn render(&self, helpers: &TemplateHelpers, context: &Context) -> Result<String, CompositionError> {
        let tera = self.compile(helpers)?;
        tera.render(LAYOUT_TEMPLATE, context)
            .map_err(CompositionError::Execute)
    }
}

/// Render context for a page: hook data at top level plus `params`
pub fn page_context(params: &Params, data: &HookData) -> Context {
    let mut context = Context::new();
    context.insert("params", params);

    for (key, value) in data {
        context.insert(key.as_str(), value);
    }

    context
}

fn read(path: &Path) -> Result<String, CompositionError> {
    fs::read_to_string(path).map_err(|source| CompositionError::Read {
        path: path.to_path_buf(),
        source,
    })
}

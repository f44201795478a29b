use std::collections::BTreeMap;

use crate::ast::Ast;
use crate::builder::build;
use crate::error::{RtmlError, RtmlResult};
use crate::interface::{CompileOptions, RtmlInterface, TemplateFile};
use crate::lexer::tokenize;
use crate::output::{assemble, generated_path, normalize_reference, page_key};
use crate::signature::{Param, SignatureCollector};

/// `Compiler` is the primary implementation of the `RtmlInterface` trait,
/// turning a set of named templates into one Rust source unit.
///
/// Pages are parsed as they are added. Nothing is generated until
/// [`RtmlInterface::compile`] is called, since a page's signature depends on
/// every page it includes.
///
/// # Examples
///
/// ```
/// use rtml::{Compiler, RtmlInterface};
///
/// let mut compiler = Compiler::new();
/// compiler
///     .add_template("greeting", "<r-require name=\"name\" type=\"&str\"/>Hello, <r-value of=\"name\"/>!")
///     .unwrap();
///
/// let code = compiler.compile();
/// assert!(code.contains("pub fn greeting(name: &str) -> ::std::string::String {"));
/// ```
#[derive(Debug, Default)]
pub struct Compiler {
    templates: BTreeMap<String, Ast>,
    shared: Vec<Param>,
    options: CompileOptions,
}

impl Compiler {
    /// Creates a new compiler with default options and no templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new compiler with the given options.
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Adds a parameter every page takes, after its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtml::{Compiler, Param, RtmlInterface};
    ///
    /// let mut compiler = Compiler::new();
    /// compiler.add_shared_param(Param::new("request", "&Request"));
    /// compiler.add_template("index", "home").unwrap();
    ///
    /// assert_eq!(compiler.params("index"), vec![Param::new("request", "&Request")]);
    /// ```
    pub fn add_shared_param(&mut self, param: Param) -> &mut Self {
        if self.shared.iter().any(|p| p.name == param.name) {
            tracing::warn!(param = param.name.as_str(), "shared parameter declared twice");
        } else {
            self.shared.push(param);
        }
        self
    }

    /// Names of the registered pages, sorted.
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// A registered page whose `page()` or `page_tree()` function would share
    /// a name with one generated for `page`.
    fn colliding_page(&self, page: &str) -> Option<&str> {
        let path = generated_path(page);
        let tree = format!("{path}_tree");
        self.page_names().find(|other| {
            let other_path = generated_path(other);
            other_path == path || other_path == tree || format!("{other_path}_tree") == path
        })
    }

    fn insert(&mut self, page: String, content: &str) -> RtmlResult<()> {
        if self.templates.contains_key(&page) {
            return Err(RtmlError::TemplateExists { page_name: page });
        }
        if let Some(existing) = self.colliding_page(&page) {
            return Err(RtmlError::PageNameCollision {
                page_name: page,
                existing: existing.to_string(),
            });
        }
        let ast = build(tokenize(content));
        tracing::debug!(page = page.as_str(), "parsed template");
        self.templates.insert(page, ast);
        Ok(())
    }
}

impl RtmlInterface for Compiler {
    /// Adds a new template to the compiler under the given page name.
    ///
    /// # Arguments
    ///
    /// * `name` - The page name, `/`-separated. A file extension is dropped,
    ///   so `blog/post.rtml` and `blog/post` name the same page.
    /// * `content` - The template source
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the template was successfully added
    /// * `Err(RtmlError::TemplateExists)` if a page with the given name already exists
    /// * `Err(RtmlError::PageNameCollision)` if another page generates the
    ///   same function names, such as `dash-page` and `dash_page`
    /// * `Err(RtmlError::InvalidTemplatePath)` if the name is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use rtml::{Compiler, RtmlError, RtmlInterface};
    ///
    /// let mut compiler = Compiler::new();
    /// compiler.add_template("blog/post", "<article></article>").unwrap();
    ///
    /// let again = compiler.add_template("blog/post.rtml", "<p></p>");
    /// assert!(matches!(again, Err(RtmlError::TemplateExists { .. })));
    /// ```
    fn add_template<N: AsRef<str>, C: AsRef<str>>(
        &mut self,
        name: N,
        content: C,
    ) -> RtmlResult<()> {
        let page = normalize_reference(name.as_ref());
        if page.is_empty() {
            return Err(RtmlError::invalid_path(name.as_ref(), "page name is empty"));
        }
        self.insert(page, content.as_ref())
    }

    /// Adds a template file, naming the page after its path relative to the
    /// template root.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtml::{Compiler, RtmlInterface, TemplateFile};
    ///
    /// let mut compiler = Compiler::new();
    /// compiler.add_file(&TemplateFile::new("layouts/base.rtml", "<html></html>")).unwrap();
    /// compiler.add_file(&TemplateFile::new("notes.md", "# not a template")).unwrap();
    ///
    /// assert_eq!(compiler.page_names().collect::<Vec<_>>(), vec!["layouts/base"]);
    /// ```
    fn add_file(&mut self, file: &TemplateFile) -> RtmlResult<()> {
        match page_key(&file.path, &self.options.extension)? {
            Some(page) => self.insert(page, &file.content),
            None => {
                tracing::debug!(path = ?file.path, "skipping file without template extension");
                Ok(())
            }
        }
    }

    /// Returns the parameters of a page's render function, in order: its own
    /// required parameters, those it inherits from included pages, then the
    /// shared ones.
    ///
    /// Returns an empty vector if the page doesn't exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtml::{Compiler, RtmlInterface};
    ///
    /// let mut compiler = Compiler::new();
    /// compiler.add_template("card", "<r-require name=\"title\" type=\"&str\"/>").unwrap();
    /// compiler.add_template("list", "<r-include name=\"card\"/>").unwrap();
    ///
    /// let params = compiler.params("list");
    /// assert_eq!(params.len(), 1);
    /// assert_eq!(params[0].name, "title");
    /// ```
    fn params<N: AsRef<str>>(&self, page: N) -> Vec<Param> {
        let page = normalize_reference(page.as_ref());
        if !self.templates.contains_key(&page) {
            return Vec::new();
        }
        let mut collector = SignatureCollector::default();
        for (name, ast) in &self.templates {
            collector.collect(name, ast, &self.shared);
        }
        collector.freeze().resolved(&page).to_vec()
    }

    /// Generates the Rust source for every page: a pair of functions per
    /// page, nested in modules that mirror the page directories.
    ///
    /// The output depends only on the templates, the shared parameters and
    /// the options, never on insertion order.
    fn compile(&self) -> String {
        assemble(&self.templates, &self.shared, &self.options)
    }
}

/// Compiles a set of template files in one call.
///
/// Files whose extension is not `options.extension` are skipped.
///
/// # Errors
/// - If a path is absolute, leaves the template root, or is not UTF-8.
/// - If two files map to the same page, or to the same generated names.
///
/// # Examples
///
/// ```
/// use rtml::{CompileOptions, TemplateFile, compile};
///
/// let files = [
///     TemplateFile::new("layouts/base.rtml", "<main><r-slot/></main>"),
///     TemplateFile::new("index.rtml", "<r-extend name=\"layouts/base\"/>Hi"),
/// ];
/// let code = compile(&files, &[], &CompileOptions::default()).unwrap();
/// assert!(code.contains("pub mod layouts {"));
/// assert!(code.contains("pub fn index() -> ::std::string::String {"));
/// ```
pub fn compile(
    files: &[TemplateFile],
    shared: &[Param],
    options: &CompileOptions,
) -> RtmlResult<String> {
    let mut compiler = Compiler::with_options(options.clone());
    for param in shared {
        compiler.add_shared_param(param.clone());
    }
    for file in files {
        compiler.add_file(file)?;
    }
    Ok(compiler.compile())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_duplicate_page() {
        let mut compiler = Compiler::new();
        compiler.add_template("index", "a").unwrap();
        let err = compiler.add_template("./index", "b").unwrap_err();
        assert!(matches!(err, RtmlError::TemplateExists { page_name } if page_name == "index"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_sanitised_names_collide() {
        let mut compiler = Compiler::new();
        compiler.add_template("dash-page", "dash").unwrap();
        let err = compiler.add_template("dash_page", "underscore").unwrap_err();
        assert!(matches!(
            err,
            RtmlError::PageNameCollision { page_name, existing }
                if page_name == "dash_page" && existing == "dash-page"
        ));
        assert_eq!(compiler.page_names().collect::<Vec<_>>(), vec!["dash-page"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_sanitised_directories_collide() {
        let mut compiler = Compiler::new();
        compiler.add_template("my-blog/post", "a").unwrap();
        assert!(matches!(
            compiler.add_template("my_blog/post", "b"),
            Err(RtmlError::PageNameCollision { .. })
        ));
        compiler.add_template("my_blog/other", "c").unwrap();
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_tree_function_names_collide() {
        let mut compiler = Compiler::new();
        compiler.add_template("card", "a").unwrap();
        assert!(matches!(
            compiler.add_template("card_tree", "b"),
            Err(RtmlError::PageNameCollision { .. })
        ));

        let mut compiler = Compiler::new();
        compiler.add_template("list_tree", "a").unwrap();
        assert!(matches!(
            compiler.add_template("list", "b"),
            Err(RtmlError::PageNameCollision { .. })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_name() {
        let mut compiler = Compiler::new();
        assert!(matches!(
            compiler.add_template(" / ", "a"),
            Err(RtmlError::InvalidTemplatePath { .. })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_custom_extension() {
        let mut compiler =
            Compiler::with_options(CompileOptions::default().with_extension("html"));
        compiler
            .add_file(&TemplateFile::new("a.html", "a"))
            .unwrap();
        compiler
            .add_file(&TemplateFile::new("b.rtml", "b"))
            .unwrap();
        assert_eq!(compiler.page_names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_file_and_name_collide() {
        let mut compiler = Compiler::new();
        compiler.add_template("blog/post", "a").unwrap();
        let err = compiler.add_file(&TemplateFile::new("blog/post.rtml", "b"));
        assert!(matches!(err, Err(RtmlError::TemplateExists { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_params_of_unknown_page() {
        let compiler = Compiler::new();
        assert!(compiler.params("nope").is_empty());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_shared_params_are_deduplicated() {
        let mut compiler = Compiler::new();
        compiler
            .add_shared_param(Param::new("request", "&Request"))
            .add_shared_param(Param::new("request", "&Other"));
        compiler.add_template("index", "").unwrap();
        assert_eq!(
            compiler.params("index"),
            vec![Param::new("request", "&Request")]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_insertion_order_does_not_matter() {
        let pages = [
            ("layouts/base", "<main><r-slot/></main>"),
            ("index", "<r-extend name=\"layouts/base\"/>Hi"),
            ("card", "<r-require name=\"t\" type=\"&str\"/><b><r-value of=\"t\"/></b>"),
        ];

        let mut forward = Compiler::new();
        for (name, content) in pages {
            forward.add_template(name, content).unwrap();
        }
        let mut backward = Compiler::new();
        for (name, content) in pages.iter().rev() {
            backward.add_template(name, content).unwrap();
        }
        assert_eq!(forward.compile(), backward.compile());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_compile_rejects_escaping_paths() {
        let files = [TemplateFile::new("../outside.rtml", "x")];
        assert!(matches!(
            compile(&files, &[], &CompileOptions::default()),
            Err(RtmlError::InvalidTemplatePath { .. })
        ));
    }
}

//! The static index of example policies.
//!
//! A catalog maps a category either to a list of template files or to a map of subcategory to a
//! list of template files.  Nothing deeper is allowed.  Order is preserved from the source so that
//! listings and path resolution are deterministic.

use std::path::Path;

use crate::CatalogError;

const BUNDLED_CATALOG: &str = include_str!("../catalog/policy_structure.json");

//////////////////////////////////////////// CatalogNode ///////////////////////////////////////////

/// The value stored under one top-level category.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CatalogNode {
    /// Template files directly under the category.
    Templates(Vec<String>),
    /// Subcategories, each with its own template files.
    Subcategories(Vec<(String, Vec<String>)>),
}

//////////////////////////////////////////// CatalogEntry //////////////////////////////////////////

/// One template in the flattened view of a catalog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogEntry {
    /// The category, `parent/child` for templates under a subcategory.
    pub category: String,
    /// The template file name without its extension.
    pub template_name: String,
    /// The template's path relative to the template source.
    pub path: String,
}

/////////////////////////////////////////// PolicyCatalog //////////////////////////////////////////

/// A read-only catalog of example policies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyCatalog {
    categories: Vec<(String, CatalogNode)>,
}

impl PolicyCatalog {
    /// Build a catalog from already-parsed categories.
    pub fn new(categories: Vec<(String, CatalogNode)>) -> Self {
        Self { categories }
    }

    /// The minimal catalog used when the real one cannot be loaded.
    pub fn builtin() -> Self {
        Self::new(vec![
            (
                "authn".to_string(),
                CatalogNode::Templates(vec!["authn-jwt-github.yml".to_string()]),
            ),
            (
                "ci".to_string(),
                CatalogNode::Subcategories(vec![(
                    "github".to_string(),
                    vec!["actions.yml".to_string()],
                )]),
            ),
            (
                "cloud".to_string(),
                CatalogNode::Subcategories(vec![("aws".to_string(), vec!["aws.yml".to_string()])]),
            ),
            (
                "web".to_string(),
                CatalogNode::Templates(vec!["conjur-oidc-demo.yml".to_string()]),
            ),
        ])
    }

    /// The catalog compiled into this crate.
    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_CATALOG) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::error!(error = %err, "bundled catalog is malformed; using built-in");
                Self::builtin()
            }
        }
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(object) = value else {
            return Err(CatalogError::shape("top level must be an object"));
        };
        let mut categories = Vec::with_capacity(object.len());
        for (category, node) in object.into_iter() {
            let node = match node {
                serde_json::Value::Array(files) => {
                    CatalogNode::Templates(string_list(&category, files)?)
                }
                serde_json::Value::Object(subcategories) => {
                    let mut subs = Vec::with_capacity(subcategories.len());
                    for (sub, files) in subcategories.into_iter() {
                        let serde_json::Value::Array(files) = files else {
                            return Err(CatalogError::shape(format!(
                                "subcategory \"{category}/{sub}\" must be a list of files"
                            )));
                        };
                        let files = string_list(&format!("{category}/{sub}"), files)?;
                        subs.push((sub, files));
                    }
                    CatalogNode::Subcategories(subs)
                }
                _ => {
                    return Err(CatalogError::shape(format!(
                        "category \"{category}\" must be a list or an object"
                    )));
                }
            };
            categories.push((category, node));
        }
        Ok(Self { categories })
    }

    /// Read a catalog file, failing on any problem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| CatalogError::Io {
            path: path.display().to_string(),
            err,
        })?;
        Self::from_json(&json)
    }

    /// Read a catalog file, falling back to [`PolicyCatalog::builtin`] when it is unreadable or
    /// malformed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(catalog) => {
                tracing::info!(
                    path = %path.display(),
                    categories = catalog.categories.len(),
                    "loaded policy catalog"
                );
                catalog
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "using built-in catalog");
                Self::builtin()
            }
        }
    }

    /// The top-level categories in catalog order.
    pub fn categories(&self) -> &[(String, CatalogNode)] {
        &self.categories
    }

    /// The node stored under a top-level category.
    pub fn get(&self, category: &str) -> Option<&CatalogNode> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, node)| node)
    }

    /// The names of the top-level categories.
    pub fn policy_types(&self) -> Vec<String> {
        self.categories.iter().map(|(name, _)| name.clone()).collect()
    }

    /// A short listing of templates per category.
    ///
    /// Flat categories list their first two templates; nested categories list the first template
    /// of each subcategory as `sub/name`.
    pub fn template_examples(&self) -> Vec<(String, Vec<String>)> {
        self.categories
            .iter()
            .map(|(category, node)| {
                let examples = match node {
                    CatalogNode::Templates(files) => {
                        files.iter().take(2).map(|f| strip_extension(f)).collect()
                    }
                    CatalogNode::Subcategories(subs) => subs
                        .iter()
                        .filter_map(|(sub, files)| {
                            files.first().map(|f| format!("{sub}/{}", strip_extension(f)))
                        })
                        .collect(),
                };
                (category.clone(), examples)
            })
            .collect()
    }

    /// Flatten the catalog into one entry per template.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let mut entries = vec![];
        for (category, node) in self.categories.iter() {
            match node {
                CatalogNode::Templates(files) => {
                    for file in files {
                        entries.push(CatalogEntry {
                            category: category.clone(),
                            template_name: strip_extension(file),
                            path: format!("{category}/{file}"),
                        });
                    }
                }
                CatalogNode::Subcategories(subs) => {
                    for (sub, files) in subs {
                        for file in files {
                            entries.push(CatalogEntry {
                                category: format!("{category}/{sub}"),
                                template_name: strip_extension(file),
                                path: format!("{category}/{sub}/{file}"),
                            });
                        }
                    }
                }
            }
        }
        entries
    }

    /// Resolve a template to its path relative to the template source.
    ///
    /// `category` may name a top-level category or a `parent/child` subcategory.  When a nested
    /// category is named without its subcategory, every subcategory is searched in order.  A file
    /// whose stem equals `template_name` wins over one that merely contains it.
    pub fn resolve_path(&self, category: &str, template_name: &str) -> Option<String> {
        if template_name.is_empty() {
            return None;
        }
        let (parent, child) = match category.split_once('/') {
            Some((parent, child)) => (parent, Some(child)),
            None => (category, None),
        };
        match (self.get(parent)?, child) {
            (CatalogNode::Templates(files), None) => {
                find_file(files, template_name).map(|f| format!("{parent}/{f}"))
            }
            (CatalogNode::Templates(_), Some(_)) => None,
            (CatalogNode::Subcategories(subs), Some(child)) => subs
                .iter()
                .find(|(sub, _)| sub == child)
                .and_then(|(sub, files)| {
                    find_file(files, template_name).map(|f| format!("{parent}/{sub}/{f}"))
                }),
            (CatalogNode::Subcategories(subs), None) => {
                subs.iter().find_map(|(sub, files)| {
                    find_file(files, template_name).map(|f| format!("{parent}/{sub}/{f}"))
                })
            }
        }
    }
}

impl Default for PolicyCatalog {
    fn default() -> Self {
        Self::bundled()
    }
}

fn string_list(
    context: &str,
    values: Vec<serde_json::Value>,
) -> Result<Vec<String>, CatalogError> {
    values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(CatalogError::shape(format!(
                "\"{context}\" must only list file names"
            ))),
        })
        .collect()
}

fn strip_extension(file: &str) -> String {
    file.strip_suffix(".yml")
        .or_else(|| file.strip_suffix(".yaml"))
        .unwrap_or(file)
        .to_string()
}

fn find_file<'a>(files: &'a [String], template_name: &str) -> Option<&'a str> {
    let exact = format!("{template_name}.");
    files
        .iter()
        .find(|f| f.starts_with(&exact))
        .or_else(|| files.iter().find(|f| f.contains(template_name)))
        .map(String::as_str)
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

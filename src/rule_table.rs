/// Extension-based categorization rules.
///
/// A [`RuleTable`] is an ordered list of categories, each owning a set of file
/// extensions. Classification walks the table in declaration order and returns
/// the first category that lists the extension, or [`OTHERS_CATEGORY`] when
/// nothing matches.
///
/// # Examples
///
/// ```
/// use pipeline_organizer::rule_table::RuleTable;
///
/// let rules = RuleTable::default();
/// assert_eq!(rules.classify("png"), "Textures");
/// assert_eq!(rules.classify(".MA"), "Maya");
/// assert_eq!(rules.classify("unknownext"), "Others");
/// ```
use crate::error::Result;
use crate::profile::validate_name;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Category used for files no rule claims.
pub const OTHERS_CATEGORY: &str = "Others";

/// One category and the extensions it recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    /// Category name, also the name of the destination subfolder.
    pub name: String,
    /// Normalized extensions (leading dot, lowercase).
    pub extensions: Vec<String>,
}

impl CategoryRule {
    fn matches(&self, normalized_ext: &str) -> bool {
        self.extensions.iter().any(|e| e == normalized_ext)
    }
}

/// Normalizes an extension to a lowercase string with a leading dot.
///
/// Returns `None` for empty input, which never matches any category.
///
/// ```
/// use pipeline_organizer::rule_table::normalize_extension;
///
/// assert_eq!(normalize_extension("PNG").as_deref(), Some(".png"));
/// assert_eq!(normalize_extension(".tiff").as_deref(), Some(".tiff"));
/// assert_eq!(normalize_extension("  "), None);
/// ```
pub fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if bare.is_empty() {
        return None;
    }
    Some(format!(".{}", bare.to_lowercase()))
}

/// Ordered mapping of category name to recognized extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    categories: Vec<CategoryRule>,
}

impl RuleTable {
    /// Creates an empty rule table. Every file classifies as [`OTHERS_CATEGORY`].
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Builds the default table used when a profile is created without rules.
    pub fn default_rules() -> Self {
        let mut table = Self::new();
        table.set("Maya", [".ma", ".mb"]);
        table.set("Models", [".fbx", ".obj"]);
        table.set("Textures", [".png", ".jpg", ".tiff"]);
        table.set("Renders", [".exr", ".tga"]);
        table.set("Substance", [".sbsar", ".spp"]);
        table.set("Zbrush Scenes", [".zpr", ".ztl"]);
        table
    }

    /// Adds a category, or replaces the extensions of an existing one in place.
    ///
    /// Replacing keeps the category's original position so classification order
    /// does not change when a rule is edited. The category name becomes a folder
    /// name, so it must be a single path component.
    pub fn insert<I, S>(&mut self, category: &str, extensions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_name("Category", category)?;
        self.set(category, extensions);
        Ok(())
    }

    fn set<I, S>(&mut self, category: &str, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            if let Some(ext) = normalize_extension(ext.as_ref())
                && !normalized.contains(&ext)
            {
                normalized.push(ext);
            }
        }

        match self.categories.iter_mut().find(|c| c.name == category) {
            Some(existing) => existing.extensions = normalized,
            None => self.categories.push(CategoryRule {
                name: category.to_string(),
                extensions: normalized,
            }),
        }
    }

    /// Returns the category for an extension, with or without its leading dot.
    ///
    /// Comparison is case-insensitive and the first declared category wins when
    /// two categories list the same extension.
    pub fn classify(&self, ext: &str) -> &str {
        let Some(normalized) = normalize_extension(ext) else {
            return OTHERS_CATEGORY;
        };
        self.categories
            .iter()
            .find(|c| c.matches(&normalized))
            .map(|c| c.name.as_str())
            .unwrap_or(OTHERS_CATEGORY)
    }

    /// Classifies a file by the extension of its path.
    pub fn classify_path(&self, path: &Path) -> &str {
        match path.extension() {
            Some(ext) => self.classify(&ext.to_string_lossy()),
            None => OTHERS_CATEGORY,
        }
    }

    /// Category names in declaration order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Extensions registered for a category, if it exists.
    pub fn extensions(&self, category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.extensions.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::default_rules()
    }
}

impl Serialize for RuleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for rule in &self.categories {
            map.serialize_entry(&rule.name, &rule.extensions)?;
        }
        map.end()
    }
}

// Reads entries in document order so the table keeps its declaration order
// without relying on an ordered map type.
struct RuleTableVisitor;

impl<'de> Visitor<'de> for RuleTableVisitor {
    type Value = RuleTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of category name to a list of extensions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut table = RuleTable::new();
        while let Some((category, extensions)) = access.next_entry::<String, Vec<String>>()? {
            table
                .insert(&category, extensions)
                .map_err(<A::Error as de::Error>::custom)?;
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RuleTableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_category_order() {
        let table = RuleTable::default_rules();
        assert_eq!(
            table.category_names(),
            vec![
                "Maya",
                "Models",
                "Textures",
                "Renders",
                "Substance",
                "Zbrush Scenes"
            ]
        );
    }

    #[test]
    fn test_classify_every_default_extension() {
        let table = RuleTable::default_rules();
        for rule in table.iter() {
            for ext in &rule.extensions {
                let bare = ext.trim_start_matches('.');
                assert_eq!(table.classify(ext), rule.name);
                assert_eq!(table.classify(bare), rule.name);
                assert_eq!(table.classify(&bare.to_uppercase()), rule.name);
            }
        }
    }

    #[test]
    fn test_classify_unknown_is_others() {
        let table = RuleTable::default_rules();
        assert_eq!(table.classify("unknownext"), OTHERS_CATEGORY);
        assert_eq!(table.classify(".docx"), OTHERS_CATEGORY);
        assert_eq!(table.classify(""), OTHERS_CATEGORY);
        assert_eq!(table.classify("."), OTHERS_CATEGORY);
    }

    #[test]
    fn test_classify_path() {
        let table = RuleTable::default_rules();
        assert_eq!(table.classify_path(Path::new("/src/c.MA")), "Maya");
        assert_eq!(table.classify_path(Path::new("a.png")), "Textures");
        assert_eq!(table.classify_path(Path::new("README")), OTHERS_CATEGORY);
        assert_eq!(table.classify_path(Path::new(".hidden")), OTHERS_CATEGORY);
    }

    #[test]
    fn test_first_declared_category_wins() {
        let mut table = RuleTable::new();
        table.insert("First", ["psd"]).unwrap();
        table.insert("Second", [".PSD", ".kra"]).unwrap();
        assert_eq!(table.classify("psd"), "First");
        assert_eq!(table.classify("kra"), "Second");
    }

    #[test]
    fn test_insert_normalizes_and_dedups() {
        let mut table = RuleTable::new();
        table.insert("Textures", ["png", ".PNG", " .jpg ", ""]).unwrap();
        assert_eq!(
            table.extensions("Textures"),
            Some(&[".png".to_string(), ".jpg".to_string()][..])
        );
    }

    #[test]
    fn test_insert_existing_keeps_position() {
        let mut table = RuleTable::default_rules();
        table.insert("Maya", [".mel"]).unwrap();
        assert_eq!(table.category_names()[0], "Maya");
        assert_eq!(table.classify("mel"), "Maya");
        assert_eq!(table.classify("ma"), OTHERS_CATEGORY);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_category_must_be_single_folder_name() {
        let mut table = RuleTable::new();
        for bad in ["../../escaped", "a/b", "..", "", "  ", "c:\\x"] {
            assert!(
                matches!(
                    table.insert(bad, [".png"]),
                    Err(crate::error::OrganizerError::InvalidArgument(_))
                ),
                "'{}' should be rejected",
                bad
            );
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_path_like_category() {
        let json = r#"{"Textures": [".png"], "../escaped": [".exr"]}"#;
        let result: serde_json::Result<RuleTable> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_preserves_declaration_order() {
        let json = r#"{"Zeta": [".z"], "Alpha": ["a"], "Mid": [".m"]}"#;
        let table: RuleTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.category_names(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(table.extensions("Alpha"), Some(&[".a".to_string()][..]));

        let written = serde_json::to_string(&table).unwrap();
        assert_eq!(written, r#"{"Zeta":[".z"],"Alpha":[".a"],"Mid":[".m"]}"#);
    }

    #[test]
    fn test_empty_table() {
        let table = RuleTable::new();
        assert!(table.is_empty());
        assert_eq!(table.classify("png"), OTHERS_CATEGORY);
    }
}

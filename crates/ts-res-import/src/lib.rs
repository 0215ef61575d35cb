//! Traverses an abstract filesystem and turns path-encoded conditions
//! into resource candidate declarations.

use fxhash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use ts_res::builder::{ConditionDecl, ResourceManagerBuilder};
use ts_res::error::{Error, Result};

/// `ignoreFileTypes` plus the extension → resource-type mapping. `.json`
/// always selects the `json` resource type; everything else must be
/// named here or in `ignore_file_types`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub ignore_file_types: Vec<String>,
    pub extension_resource_types: HashMap<String, String>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        let mut extension_resource_types = HashMap::default();
        extension_resource_types.insert("json".to_string(), "json".to_string());
        Self {
            ignore_file_types: Vec::new(),
            extension_resource_types,
        }
    }
}

impl ImporterConfig {
    /// Loads config from `path`, dispatching on its extension (`.toml` or
    /// `.json`; anything else is read as JSON).
    pub fn from_file(path: &Path) -> Result<Self> {
        ts_res::load_config_file(path)
    }
}

/// A raw file as the importer sees it: a path for diagnostics, and its
/// contents.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    pub contents: Vec<u8>,
}

/// One file turned into an importable record. `context` is the condition
/// set inherited from enclosing directories; `conditions` is what the
/// file's own basename encoded. Callers choose whether to merge them
/// before handing the result to the builder. `tagged_processed` is set
/// when the extension had no configured mapping and the file was
/// imported as an opaque blob by default.
#[derive(Debug, Clone)]
pub struct Importable {
    pub base_name: String,
    pub item: FileEntry,
    pub conditions: Vec<ConditionDecl>,
    pub context: Vec<ConditionDecl>,
    pub resource_type: String,
    pub tagged_processed: bool,
}

/// Imports a directory tree into a flat list of `Importable` records.
/// Holds a reference to the builder's registries purely to validate and
/// canonicalize condition values as they're parsed; it does not itself
/// mutate the builder.
pub struct PathImporter<'a> {
    builder: &'a ResourceManagerBuilder,
    config: ImporterConfig,
}

impl<'a> PathImporter<'a> {
    pub fn new(builder: &'a ResourceManagerBuilder) -> Self {
        Self {
            builder,
            config: ImporterConfig::default(),
        }
    }

    pub fn with_config(builder: &'a ResourceManagerBuilder, config: ImporterConfig) -> Self {
        Self { builder, config }
    }

    /// Recursively imports every file under `root`.
    pub fn import_path(&self, root: &Path) -> Result<Vec<Importable>> {
        let mut out = Vec::new();
        self.walk(root, &[], &mut out)
            .map_err(|e| Error::WhileImporting {
                path: root.display().to_string(),
                source: Box::new(e),
            })?;
        Ok(out)
    }

    fn walk(&self, dir: &Path, inherited: &[ConditionDecl], out: &mut Vec<Importable>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|_| Error::NotFound(dir.display().to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::MalformedImportable(e.to_string()))?;
            let path = entry.path();
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| Error::MalformedImportable(path.display().to_string()))?;

            if path.is_dir() {
                let mut context = inherited.to_vec();
                context.extend(self.parse_segment(&name)?);
                self.walk(&path, &context, out)?;
                continue;
            }

            let Some((base_name, conditions, extension)) = self.parse_file_name(&name)? else {
                continue;
            };
            if self.config.ignore_file_types.iter().any(|e| e == &extension) {
                tracing::debug!(file = name, extension, "ignoring file type");
                continue;
            }
            let (resource_type, tagged_processed) = match self.config.extension_resource_types.get(&extension) {
                Some(mapped) => (mapped.clone(), false),
                None => {
                    tracing::debug!(file = name, extension, "unmapped extension, importing as blob");
                    ("blob".to_string(), true)
                }
            };

            let contents = fs::read(&path).map_err(|_| Error::NotFound(path.display().to_string()))?;
            out.push(Importable {
                base_name,
                item: FileEntry {
                    path: path.display().to_string(),
                    contents,
                },
                conditions,
                context: inherited.to_vec(),
                resource_type,
                tagged_processed,
            });
        }
        Ok(())
    }

    /// Splits a filename into `(base_name, conditions, extension)`. Every
    /// dot-separated component between the base name and the final
    /// extension that parses as condition syntax is consumed as a
    /// condition (e.g. `resources.home=CA.json`). Returns `None` if the
    /// filename has no extension at all (nothing to import).
    fn parse_file_name(&self, name: &str) -> Result<Option<(String, Vec<ConditionDecl>, String)>> {
        let mut parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 2 {
            return Ok(None);
        }
        let extension = parts.pop().unwrap().to_string();

        let mut conditions = Vec::new();
        while parts.len() > 1 && parts.last().is_some_and(|p| p.contains('=')) {
            let segment = parts.pop().unwrap();
            conditions.splice(0..0, self.parse_segment(segment)?);
        }
        Ok(Some((parts.join("."), conditions, extension)))
    }

    /// Parses one comma-separated path segment or basename extension
    /// into conditions. Each comma-delimited piece is either `k=v` or a
    /// terse token matching exactly one token-optional qualifier's value
    /// space.
    fn parse_segment(&self, segment: &str) -> Result<Vec<ConditionDecl>> {
        segment.split(',').map(|piece| self.parse_piece(piece)).collect()
    }

    fn parse_piece(&self, piece: &str) -> Result<ConditionDecl> {
        if let Some((k, v)) = piece.split_once('=') {
            let qualifier = self.builder.qualifiers().get_by_name_or_token(k)?;
            let qtype = self.builder.qualifier_types().get(qualifier.type_name())?;
            qtype.validate(v)?;
            return Ok(ConditionDecl::new(qualifier.name().to_string(), v.to_string()));
        }

        let matches: Vec<&ts_res::Qualifier> = self
            .builder
            .qualifiers()
            .iter()
            .filter(|q| q.token_is_optional())
            .filter(|q| {
                self.builder
                    .qualifier_types()
                    .get(q.type_name())
                    .map(|t| t.validate(piece).is_ok())
                    .unwrap_or(false)
            })
            .collect();

        match matches.as_slice() {
            [] => Err(Error::MalformedImportable(piece.to_string())),
            [one] => Ok(ConditionDecl::new(one.name().to_string(), piece.to_string())),
            many => Err(Error::AmbiguousTerseToken(
                piece.to_string(),
                many.iter().map(|q| q.name().to_string()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use ts_res::qualifier::{Qualifier, QualifierType, QualifierTypeKind};
    use ts_res::resource::{ResourceType, ResourceTypeKind};

    fn builder_with_home() -> ResourceManagerBuilder {
        let mut b = ResourceManagerBuilder::new();
        b.register_qualifier_type(QualifierType::new(
            "territory",
            QualifierTypeKind::Territory {
                regions: Default::default(),
            },
            false,
        ))
        .unwrap();
        b.register_qualifier(Qualifier::new("home", "territory", 100, None, true).unwrap())
            .unwrap();
        b.register_resource_type(ResourceType::new("json", ResourceTypeKind::Json))
            .unwrap();
        b
    }

    #[test]
    fn parses_directory_and_basename_conditions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("home=CA");
        fs::create_dir(&nested).unwrap();
        let mut f = fs::File::create(nested.join("resources.language=fr.json")).unwrap();
        write!(f, "{{}}").unwrap();
        drop(f);

        let builder = builder_with_home();
        let importer = PathImporter::new(&builder);
        let err = importer.import_path(dir.path()).unwrap_err();
        // "language" isn't registered, so the basename condition fails
        // and the whole walk is wrapped as a WhileImporting error.
        assert!(matches!(err, Error::WhileImporting { .. }));
    }

    #[test]
    fn terse_token_resolves_to_its_qualifier() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("CA");
        fs::create_dir(&nested).unwrap();
        let mut f = fs::File::create(nested.join("resources.json")).unwrap();
        write!(f, "{{}}").unwrap();
        drop(f);

        let builder = builder_with_home();
        let importer = PathImporter::new(&builder);
        let imported = importer.import_path(dir.path()).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].context, vec![ConditionDecl::new("home", "CA")]);
        assert_eq!(imported[0].base_name, "resources");
        assert_eq!(imported[0].resource_type, "json");
    }

    #[test]
    fn unmapped_extension_imports_as_a_tagged_blob() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("notes.txt")).unwrap();
        write!(f, "hi").unwrap();
        drop(f);

        let builder = builder_with_home();
        let importer = PathImporter::new(&builder);
        let imported = importer.import_path(dir.path()).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, "blob");
        assert!(imported[0].tagged_processed);
    }

    #[test]
    fn ignored_extension_is_skipped_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("README.md")).unwrap();
        write!(f, "hi").unwrap();
        drop(f);

        let builder = builder_with_home();
        let config = ImporterConfig {
            ignore_file_types: vec!["md".to_string()],
            ..ImporterConfig::default()
        };
        let importer = PathImporter::with_config(&builder, config);
        assert!(importer.import_path(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn importer_config_loads_from_a_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.toml");
        fs::write(&path, "ignore_file_types = [\"md\"]\n").unwrap();
        let config = ImporterConfig::from_file(&path).unwrap();
        assert_eq!(config.ignore_file_types, vec!["md".to_string()]);
    }

    #[test]
    fn comma_separated_conditions_on_a_single_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("resources.home=CA.json")).unwrap();
        write!(f, "{{}}").unwrap();
        drop(f);

        let builder = builder_with_home();
        let importer = PathImporter::new(&builder);
        let imported = importer.import_path(dir.path()).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].conditions, vec![ConditionDecl::new("home", "CA")]);
    }
}

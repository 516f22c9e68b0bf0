use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::errors::SchemaError;
use crate::protocol::MessageId;
use crate::schema::xml::{parse_definition, RawDefinition};
use crate::schema::{Dialect, Enum, Message};

/// Source of MAVLink definition files.
///
/// Resolvers are asked for the root definition and then for every name that appears in
/// `<include>` elements.
pub trait Resolve {
    /// Returns XML contents of a definition.
    fn fetch(&self, name: &str) -> Result<String, SchemaError>;
}

/// Resolves definitions from an ordered list of directories.
///
/// The first directory containing the requested file wins. Names without extension are also
/// looked up with `.xml` appended.
#[derive(Clone, Debug, Default)]
pub struct FsResolver {
    dirs: Vec<PathBuf>,
}

/// Resolves definitions from in-memory sources.
///
/// # Usage
///
/// ```rust
/// use mavkit::schema::{DialectLoader, MemoryResolver};
///
/// let resolver = MemoryResolver::new().with(
///     "tiny.xml",
///     r#"<mavlink><messages>
///         <message id="1" name="PING"><field type="uint8_t" name="value"/></message>
///     </messages></mavlink>"#,
/// );
///
/// let dialect = DialectLoader::new(resolver).load("tiny.xml").unwrap();
/// assert_eq!(dialect.name(), "tiny");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryResolver {
    sources: HashMap<String, String>,
}

/// Loads a [`Dialect`] from a root definition and all its includes.
///
/// Includes are resolved depth-first. A definition reachable through several paths is loaded only
/// once, a definition that includes itself (directly or not) is an error. Definitions are merged
/// with includes first, so a dialect extends the definitions it includes.
#[derive(Clone, Debug)]
pub struct DialectLoader<R: Resolve> {
    resolver: R,
}

impl FsResolver {
    /// Creates a resolver that searches the given directories in order.
    pub fn new<P: Into<PathBuf>>(dirs: impl IntoIterator<Item = P>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a directory to the end of the search list.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Search directories.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut names = vec![name.to_string()];
        if Path::new(name).extension().is_none() {
            names.push(format!("{name}.xml"));
        }

        self.dirs
            .iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .collect()
    }
}

impl Resolve for FsResolver {
    fn fetch(&self, name: &str) -> Result<String, SchemaError> {
        for path in self.candidates(name) {
            if path.is_file() {
                log::trace!("[{name}] reading {}", path.display());
                return std::fs::read_to_string(&path).map_err(|err| SchemaError::Fetch {
                    name: name.to_string(),
                    reason: err.to_string(),
                });
            }
        }

        Err(SchemaError::Fetch {
            name: name.to_string(),
            reason: format!("not found in {} directories", self.dirs.len()),
        })
    }
}

impl MemoryResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition source.
    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Adds or replaces a definition source.
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }
}

impl Resolve for MemoryResolver {
    fn fetch(&self, name: &str) -> Result<String, SchemaError> {
        self.sources
            .get(name)
            .or_else(|| self.sources.get(&format!("{name}.xml")))
            .cloned()
            .ok_or_else(|| SchemaError::Fetch {
                name: name.to_string(),
                reason: "no such definition".to_string(),
            })
    }
}

impl<R: Resolve> DialectLoader<R> {
    /// Creates a loader backed by the provided resolver.
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Underlying resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Loads dialect starting from the `root` definition.
    ///
    /// Returns either a complete and validated [`Dialect`] or the first error encountered.
    pub fn load(&self, root: &str) -> Result<Dialect, SchemaError> {
        let mut resolved: Vec<(String, RawDefinition)> = Vec::new();
        let mut visited = HashSet::new();
        let mut chain = Vec::new();

        self.visit(root, &mut chain, &mut visited, &mut resolved)?;

        let root_definition = resolved
            .last()
            .map(|(_, def)| (def.version, def.dialect))
            .unwrap_or_default();

        let mut dialect = Dialect {
            name: dialect_name(root),
            version: root_definition.0,
            dialect: root_definition.1,
            includes: Vec::new(),
            messages: BTreeMap::new(),
            enums: BTreeMap::new(),
        };

        let mut names: HashMap<String, MessageId> = HashMap::new();
        let last = resolved.len().saturating_sub(1);
        for (idx, (name, definition)) in resolved.into_iter().enumerate() {
            if idx != last {
                dialect.includes.push(name.clone());
            }
            merge_enums(&mut dialect.enums, definition.enums, &name)?;
            merge_messages(
                &mut dialect.messages,
                &mut names,
                definition.messages,
                &name,
            )?;
        }

        validate_enum_references(&dialect)?;

        log::debug!(
            "[{}] loaded dialect: {} messages, {} enums",
            dialect.name,
            dialect.messages.len(),
            dialect.enums.len()
        );

        Ok(dialect)
    }

    fn visit(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        visited: &mut HashSet<String>,
        resolved: &mut Vec<(String, RawDefinition)>,
    ) -> Result<(), SchemaError> {
        let name = name.trim().to_string();

        if chain.contains(&name) {
            let mut cycle = chain.clone();
            cycle.push(name);
            return Err(SchemaError::IncludeCycle(cycle));
        }
        if visited.contains(&name) {
            return Ok(());
        }

        let source = self.resolver.fetch(&name)?;
        let definition = parse_definition(&name, &source)?;
        log::debug!(
            "[{name}] resolved definition: {} messages, {} enums, {} includes",
            definition.messages.len(),
            definition.enums.len(),
            definition.includes.len()
        );

        chain.push(name.clone());
        for include in &definition.includes {
            self.visit(include, chain, visited, resolved)?;
        }
        chain.pop();

        visited.insert(name.clone());
        resolved.push((name, definition));

        Ok(())
    }
}

fn dialect_name(root: &str) -> String {
    Path::new(root.trim())
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string())
}

fn merge_enums(
    enums: &mut BTreeMap<String, Enum>,
    incoming: Vec<Enum>,
    file: &str,
) -> Result<(), SchemaError> {
    for mav_enum in incoming {
        match enums.entry(mav_enum.name.clone()) {
            Entry::Vacant(entry) => {
                log::trace!("[{file}] adding enum {}", mav_enum.name);
                entry.insert(mav_enum);
            }
            Entry::Occupied(mut entry) => {
                log::trace!("[{file}] extending enum {}", mav_enum.name);
                entry.get_mut().merge(mav_enum)?;
            }
        }
    }
    Ok(())
}

fn merge_messages(
    messages: &mut BTreeMap<MessageId, Message>,
    names: &mut HashMap<String, MessageId>,
    incoming: Vec<Message>,
    file: &str,
) -> Result<(), SchemaError> {
    for message in incoming {
        if let Some(existing) = messages.get(&message.id) {
            if existing.name != message.name {
                return Err(SchemaError::DuplicateMessageId {
                    id: message.id,
                    name: existing.name.clone(),
                    other: message.name,
                });
            }
            if !existing.same_layout(&message) {
                return Err(SchemaError::ConflictingMessage {
                    name: message.name,
                    id: message.id,
                });
            }
            log::trace!("[{file}] skipping identical message {}", message.name);
            continue;
        }

        if let Some(&id) = names.get(&message.name) {
            return Err(SchemaError::DuplicateMessageName {
                name: message.name,
                id,
                other: message.id,
            });
        }

        log::trace!("[{file}] adding message {} #{}", message.name, message.id);
        names.insert(message.name.clone(), message.id);
        messages.insert(message.id, message);
    }
    Ok(())
}

fn validate_enum_references(dialect: &Dialect) -> Result<(), SchemaError> {
    for message in dialect.messages.values() {
        for field in &message.fields {
            if let Some(name) = field.enum_name() {
                if !dialect.enums.contains_key(name) {
                    return Err(SchemaError::UnknownEnum {
                        message: message.name.clone(),
                        field: field.name.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod loader_tests {
    use super::*;

    const BASE: &str = r#"<mavlink>
  <enums>
    <enum name="MAV_STATE">
      <entry value="0" name="MAV_STATE_UNINIT"/>
    </enum>
  </enums>
  <messages>
    <message id="0" name="PING">
      <field type="uint8_t" name="state" enum="MAV_STATE"/>
    </message>
  </messages>
</mavlink>"#;

    fn message(id: u32, name: &str, field_type: &str) -> String {
        format!(
            r#"<message id="{id}" name="{name}"><field type="{field_type}" name="value"/></message>"#
        )
    }

    fn definition(includes: &[&str], body: &str) -> String {
        let includes: String = includes
            .iter()
            .map(|name| format!("<include>{name}</include>"))
            .collect();
        format!("<mavlink>{includes}<messages>{body}</messages></mavlink>")
    }

    #[test]
    fn diamond_includes_are_loaded_once() {
        let resolver = MemoryResolver::new()
            .with("base.xml", BASE)
            .with("left.xml", definition(&["base.xml"], &message(1, "LEFT", "uint8_t")))
            .with("right.xml", definition(&["base.xml"], &message(2, "RIGHT", "uint8_t")))
            .with(
                "top.xml",
                definition(&["left.xml", "right.xml"], &message(3, "TOP", "uint8_t")),
            );

        let dialect = DialectLoader::new(resolver).load("top.xml").unwrap();

        assert_eq!(dialect.name(), "top");
        assert_eq!(
            dialect.includes().collect::<Vec<_>>(),
            vec!["base.xml", "left.xml", "right.xml"]
        );
        assert_eq!(dialect.messages().count(), 4);
        assert!(dialect.enum_by_name("MAV_STATE").is_some());
    }

    #[test]
    fn include_cycles_are_rejected() {
        let resolver = MemoryResolver::new()
            .with("a.xml", definition(&["b.xml"], &message(1, "A", "uint8_t")))
            .with("b.xml", definition(&["a.xml"], &message(2, "B", "uint8_t")));

        let err = DialectLoader::new(resolver).load("a.xml").unwrap_err();
        assert_eq!(
            err,
            SchemaError::IncludeCycle(vec![
                "a.xml".to_string(),
                "b.xml".to_string(),
                "a.xml".to_string()
            ])
        );
    }

    #[test]
    fn duplicate_messages() {
        let same = MemoryResolver::new()
            .with("base.xml", BASE)
            .with("top.xml", definition(&["base.xml"], &message(0, "PING", "uint8_t")));
        // Same name, same ID, different layout
        assert!(matches!(
            DialectLoader::new(same).load("top.xml"),
            Err(SchemaError::ConflictingMessage { id: 0, .. })
        ));

        let id_clash = MemoryResolver::new()
            .with("base.xml", BASE)
            .with("top.xml", definition(&["base.xml"], &message(0, "PONG", "uint8_t")));
        assert!(matches!(
            DialectLoader::new(id_clash).load("top.xml"),
            Err(SchemaError::DuplicateMessageId { id: 0, .. })
        ));

        let name_clash = MemoryResolver::new()
            .with("base.xml", BASE)
            .with("top.xml", definition(&["base.xml"], &message(7, "PING", "uint8_t")));
        assert!(matches!(
            DialectLoader::new(name_clash).load("top.xml"),
            Err(SchemaError::DuplicateMessageName { id: 0, other: 7, .. })
        ));
    }

    #[test]
    fn identical_messages_are_merged() {
        let resolver = MemoryResolver::new().with("base.xml", BASE).with(
            "top.xml",
            r#"<mavlink><include>base.xml</include><messages>
                <message id="0" name="PING">
                  <description>Same message, other docs</description>
                  <field type="uint8_t" name="state" enum="MAV_STATE"/>
                </message>
            </messages></mavlink>"#,
        );

        let dialect = DialectLoader::new(resolver).load("top").unwrap();
        assert_eq!(dialect.messages().count(), 1);
    }

    #[test]
    fn unknown_enums_and_missing_files() {
        let resolver = MemoryResolver::new().with(
            "top.xml",
            r#"<mavlink><messages>
                <message id="1" name="A"><field type="uint8_t" name="a" enum="NOPE"/></message>
            </messages></mavlink>"#,
        );
        assert!(matches!(
            DialectLoader::new(resolver).load("top.xml"),
            Err(SchemaError::UnknownEnum { .. })
        ));

        let resolver = MemoryResolver::new().with("top.xml", definition(&["gone.xml"], ""));
        assert!(matches!(
            DialectLoader::new(resolver).load("top.xml"),
            Err(SchemaError::Fetch { .. })
        ));
    }

    #[test]
    fn enums_are_merged_across_files() {
        let resolver = MemoryResolver::new().with("base.xml", BASE).with(
            "top.xml",
            r#"<mavlink><include>base.xml</include><enums>
                <enum name="MAV_STATE"><entry value="1" name="MAV_STATE_BOOT"/></enum>
            </enums></mavlink>"#,
        );

        let dialect = DialectLoader::new(resolver).load("top.xml").unwrap();
        let state = dialect.enum_by_name("MAV_STATE").unwrap();
        assert_eq!(state.entries().len(), 2);
    }
}

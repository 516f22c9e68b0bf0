//! # Code generation
//!
//! Renders typed encode and decode routines for every message of a [`Dialect`].
//!
//! Each target language is implemented as a [`Backend`]. Backends are stateless and only read the
//! dialect, so [`Generator`] runs them in parallel on scoped threads.
//!
//! ```rust
//! use mavkit::codegen::{Generator, Target};
//! use mavkit::schema::{DialectLoader, MemoryResolver};
//!
//! let resolver = MemoryResolver::new().with(
//!     "minimal.xml",
//!     r#"<mavlink><messages>
//!         <message id="0" name="HEARTBEAT">
//!             <field type="uint32_t" name="custom_mode">Custom mode</field>
//!         </message>
//!     </messages></mavlink>"#,
//! );
//! let dialect = DialectLoader::new(resolver).load("minimal.xml").unwrap();
//!
//! let generator = Generator::builder()
//!     .target(Target::Rust)
//!     .target(Target::Python)
//!     .build();
//! let sources = generator.render(&dialect).unwrap();
//!
//! assert_eq!(sources[0].file_name(), "minimal.rs");
//! assert_eq!(sources[1].file_name(), "minimal.py");
//! ```

mod code;
mod naming;
mod python;
mod rust;

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;

use crate::errors::{CodegenError, Result};
use crate::schema::Dialect;

pub use python::PythonBackend;
pub use rust::RustBackend;

/// Code generation backend for a target language.
pub trait Backend: Send + Sync {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Renders a dialect into a single source file.
    fn render(&self, dialect: &Dialect) -> core::result::Result<SourceText, CodegenError>;
}

/// Rendered source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceText {
    file_name: String,
    text: String,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Supported code generation targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    /// Rust module built on [`crate::protocol`].
    Rust,
    /// Self-contained Python module.
    Python,
}

/// Runs code generation backends over a dialect.
///
/// Use [`Generator::builder`] to create a generator.
pub struct Generator {
    backends: Vec<Box<dyn Backend>>,
}

/// Builder for [`Generator`].
#[derive(Default)]
pub struct GeneratorBuilder {
    backends: Vec<Box<dyn Backend>>,
}

impl SourceText {
    /// Creates source text.
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }

    /// Suggested file name.
    #[inline]
    pub fn file_name(&self) -> &str {
        self.file_name.as_str()
    }

    /// Source code.
    #[inline]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Returns source code consuming [`SourceText`].
    pub fn into_text(self) -> String {
        self.text
    }
}

impl Target {
    /// All supported targets.
    pub const ALL: [Target; 2] = [Target::Rust, Target::Python];

    /// Target identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Python => "python",
        }
    }

    /// Backend that renders this target.
    pub fn backend(&self) -> Box<dyn Backend> {
        match self {
            Target::Rust => Box::new(RustBackend),
            Target::Python => Box::new(PythonBackend),
        }
    }
}

impl FromStr for Target {
    type Err = CodegenError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Target::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| CodegenError::UnknownTarget(s.to_string()))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Generator {
    /// Instantiates an empty [`GeneratorBuilder`].
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    /// Names of configured backends.
    pub fn backends(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.name())
    }

    /// Renders dialect with all backends.
    ///
    /// Sources are returned in the order backends were added. The first backend error is
    /// returned.
    pub fn render(&self, dialect: &Dialect) -> core::result::Result<Vec<SourceText>, CodegenError> {
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .backends
                .iter()
                .map(|backend| {
                    scope.spawn(move || {
                        log::debug!("[{}] rendering dialect `{}`", backend.name(), dialect.name());
                        backend.render(dialect)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        results.into_iter().collect()
    }

    /// Renders dialect and writes sources into `dir`.
    ///
    /// Directory is created if missing. Returns paths of written files.
    pub fn write(&self, dialect: &Dialect, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let sources = self.render(dialect)?;

        std::fs::create_dir_all(dir)?;

        let mut paths = Vec::with_capacity(sources.len());
        for source in sources {
            let path = dir.join(source.file_name());
            std::fs::write(&path, source.text())?;
            log::debug!("written {}", path.display());
            paths.push(path);
        }

        Ok(paths)
    }
}

impl GeneratorBuilder {
    /// Adds a backend for a supported target.
    pub fn target(self, target: Target) -> Self {
        self.boxed(target.backend())
    }

    /// Adds a custom backend.
    pub fn backend<B: Backend + 'static>(self, backend: B) -> Self {
        self.boxed(Box::new(backend))
    }

    fn boxed(mut self, backend: Box<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Builds [`Generator`].
    pub fn build(self) -> Generator {
        Generator {
            backends: self.backends,
        }
    }
}

#[cfg(test)]
mod codegen_tests {
    use super::*;
    use crate::schema::{DialectLoader, MemoryResolver};

    struct Failing;

    impl Backend for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn render(&self, _: &Dialect) -> core::result::Result<SourceText, CodegenError> {
            Err(CodegenError::UnknownTarget("failing".to_string()))
        }
    }

    fn dialect() -> Dialect {
        let resolver = MemoryResolver::new().with(
            "minimal.xml",
            r#"<mavlink><messages>
                <message id="0" name="HEARTBEAT">
                    <field type="uint32_t" name="custom_mode"/>
                </message>
            </messages></mavlink>"#,
        );
        DialectLoader::new(resolver).load("minimal").unwrap()
    }

    #[test]
    fn parse_targets() {
        assert_eq!("rust".parse::<Target>(), Ok(Target::Rust));
        assert_eq!(" Python ".parse::<Target>(), Ok(Target::Python));
        assert_eq!(
            "cobol".parse::<Target>(),
            Err(CodegenError::UnknownTarget("cobol".to_string()))
        );
        assert_eq!(Target::Python.to_string(), "python");
    }

    #[test]
    fn render_in_order() {
        let generator = Generator::builder()
            .target(Target::Python)
            .target(Target::Rust)
            .build();
        assert_eq!(
            generator.backends().collect::<Vec<_>>(),
            vec!["python", "rust"]
        );

        let sources = generator.render(&dialect()).unwrap();
        assert_eq!(sources[0].file_name(), "minimal.py");
        assert_eq!(sources[1].file_name(), "minimal.rs");
    }

    #[test]
    fn backend_errors_are_returned() {
        let generator = Generator::builder()
            .target(Target::Rust)
            .backend(Failing)
            .build();

        assert_eq!(
            generator.render(&dialect()),
            Err(CodegenError::UnknownTarget("failing".to_string()))
        );
    }
}

use std::fmt;

/// Classification of storage failures.
///
/// `NotFound` is the only kind callers are expected to branch on: absent
/// keys are a normal outcome for the stores built on top of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// The key (or the driver root) does not exist.
    NotFound,
    /// The driver was denied access by the operating system.
    PermissionDenied,
    /// Any other I/O level failure.
    Io,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErrorKind::NotFound => f.write_str("not found"),
            StorageErrorKind::PermissionDenied => f.write_str("permission denied"),
            StorageErrorKind::Io => f.write_str("i/o error"),
        }
    }
}

/// Error produced by a storage [`Driver`][crate::Driver].
#[derive(Debug, thiserror::Error)]
#[error("storage error ({engine}): {kind}: {context}")]
pub struct StorageError {
    kind: StorageErrorKind,
    engine: &'static str,
    context: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StorageError {
    /// New error with an explicit kind and a human readable context.
    pub fn new<C: Into<String>>(engine: &'static str, kind: StorageErrorKind, context: C) -> Self {
        Self {
            kind,
            engine,
            context: context.into(),
            source: None,
        }
    }

    /// Attach an underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Missing key error for the given engine.
    pub fn not_found(engine: &'static str, key: &camino::Utf8Path) -> Self {
        Self::new(
            engine,
            StorageErrorKind::NotFound,
            format!("key not found: {key}"),
        )
    }

    /// Wrap an [`std::io::Error`], classifying its kind.
    pub fn io(engine: &'static str, context: &str, err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            _ => StorageErrorKind::Io,
        };
        Self::new(engine, kind, context.to_owned()).with_source(err)
    }

    /// The error kind.
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    /// The driver that produced this error.
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// True when the error means the key is absent.
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }
}

//! Caller-supplied resource openers.
//!
//! Opening a path is the only place the library touches the outside world,
//! and the only place it may suspend. Both shapes exist: a synchronous
//! opener returning a reader directly, and an asynchronous one resolving to
//! a reader. Closures over paths adapt to the synchronous shape through
//! [`from_fn`].

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Synchronous "open path → byte stream" boundary.
pub trait ResourceOpener {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;
}

/// Adapt a closure over paths into a [`ResourceOpener`].
pub fn from_fn<F, R>(open: F) -> FnOpener<F>
where
    F: Fn(&str) -> io::Result<R>,
    R: Read + 'static,
{
    FnOpener(open)
}

/// Wrapper produced by [`from_fn`].
pub struct FnOpener<F>(F);

impl<F, R> ResourceOpener for FnOpener<F>
where
    F: Fn(&str) -> io::Result<R>,
    R: Read + 'static,
{
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new((self.0)(path)?))
    }
}

/// Asynchronous opener: resolves to a pending byte stream.
#[async_trait]
pub trait AsyncResourceOpener: Send + Sync {
    async fn open(&self, path: &str) -> io::Result<Pin<Box<dyn AsyncRead + Send>>>;
}

/// Opens resource paths relative to a base directory.
#[derive(Debug, Clone)]
pub struct DirectoryOpener {
    base_dir: PathBuf,
}

impl DirectoryOpener {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self { base_dir: base_dir.as_ref().to_path_buf() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ResourceOpener for DirectoryOpener {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(self.base_dir.join(path))?))
    }
}

#[async_trait]
impl AsyncResourceOpener for DirectoryOpener {
    async fn open(&self, path: &str) -> io::Result<Pin<Box<dyn AsyncRead + Send>>> {
        let file = tokio::fs::File::open(self.base_dir.join(path)).await?;
        Ok(Box::pin(file))
    }
}

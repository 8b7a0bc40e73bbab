//! `file` module: line-oriented file writer and reader.
//!
//! Exposes `file.writer`, `file.reader`, `file.rename` and `file.mkdir`.
//! Relative paths resolve against the configured file root, if any.

use crate::bridge::Bridge;
use crate::error::NativeError;
use crate::modules::console::render_line;
use crate::registry::{Module, NativeFunction, TypeDefinition};
use crate::value::MarshaledValue;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

enum Stream {
    Closed,
    Write(BufWriter<File>),
    Read(BufReader<File>),
}

/// State shared by writers and readers
pub struct FileBase {
    stream: Stream,
    good: bool,
    eof: bool,
    root: Option<PathBuf>,
}

impl FileBase {
    fn new(root: Option<PathBuf>) -> Self {
        Self {
            stream: Stream::Closed,
            good: false,
            eof: false,
            root,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        resolve(self.root.as_deref(), path)
    }

    /// Check if a stream is open
    pub fn is_open(&self) -> bool {
        !matches!(self.stream, Stream::Closed)
    }

    /// Check if the last operation succeeded
    pub fn good(&self) -> bool {
        self.good
    }

    /// Check if a reader reached end of file
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Flush and close the stream
    pub fn close(&mut self) -> std::io::Result<()> {
        let stream = std::mem::replace(&mut self.stream, Stream::Closed);
        self.good = false;
        if let Stream::Write(mut writer) = stream {
            writer.flush()?;
        }
        Ok(())
    }

    /// Open a new stream; `Ok(false)` when the path can not be opened.
    ///
    /// A failed flush of the previous stream is reported and nothing is
    /// opened.
    fn open_with(
        &mut self,
        path: &str,
        open: impl FnOnce(&Path) -> std::io::Result<Stream>,
    ) -> Result<bool, NativeError> {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to flush file before reopening");
            return Err(e.into());
        }
        let path = self.resolve(path);
        self.eof = false;
        match open(&path) {
            Ok(stream) => {
                debug!(path = %path.display(), "Opened file");
                self.stream = stream;
                self.good = true;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to open file");
                self.good = false;
            }
        }
        Ok(self.good)
    }
}

fn resolve(root: Option<&Path>, path: &str) -> PathBuf {
    let path = Path::new(path);
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

fn not_open() -> NativeError {
    NativeError::new("NotConnected", "file is not open")
}

/// `file.writer`
pub struct FileWriter {
    base: FileBase,
}

impl FileWriter {
    fn new(root: Option<PathBuf>) -> Self {
        Self {
            base: FileBase::new(root),
        }
    }

    /// Open `path` for writing, truncating it
    pub fn open(&mut self, path: &str) -> Result<bool, NativeError> {
        self.base.open_with(path, |path| {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            Ok(Stream::Write(BufWriter::new(file)))
        })
    }

    /// Write arguments separated by a space
    pub fn print(&mut self, args: &[MarshaledValue]) -> Result<(), NativeError> {
        let writer = match &mut self.base.stream {
            Stream::Write(writer) => writer,
            _ => return Err(not_open()),
        };
        let result = writer.write_all(render_line(args).as_bytes());
        self.base.good = result.is_ok();
        result.map_err(NativeError::from)
    }

    /// Write arguments separated by a space, then a newline, then flush
    pub fn println(&mut self, args: &[MarshaledValue]) -> Result<(), NativeError> {
        self.print(args)?;
        let writer = match &mut self.base.stream {
            Stream::Write(writer) => writer,
            _ => return Err(not_open()),
        };
        let result = writer.write_all(b"\n").and_then(|_| writer.flush());
        self.base.good = result.is_ok();
        result.map_err(NativeError::from)
    }
}

impl AsRef<FileBase> for FileWriter {
    fn as_ref(&self) -> &FileBase {
        &self.base
    }
}

impl AsMut<FileBase> for FileWriter {
    fn as_mut(&mut self) -> &mut FileBase {
        &mut self.base
    }
}

/// `file.reader`
pub struct FileReader {
    base: FileBase,
}

impl FileReader {
    fn new(root: Option<PathBuf>) -> Self {
        Self {
            base: FileBase::new(root),
        }
    }

    /// Open `path` for reading
    pub fn open(&mut self, path: &str) -> Result<bool, NativeError> {
        self.base
            .open_with(path, |path| Ok(Stream::Read(BufReader::new(File::open(path)?))))
    }

    /// Next line without its terminator, or `None` at end of file
    pub fn getln(&mut self) -> Result<Option<String>, NativeError> {
        if !self.base.good || self.base.eof {
            return Ok(None);
        }
        let reader = match &mut self.base.stream {
            Stream::Read(reader) => reader,
            _ => return Ok(None),
        };
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                self.base.eof = true;
                Ok(None)
            }
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Ok(Some(line))
            }
            Err(e) => {
                self.base.good = false;
                Err(e.into())
            }
        }
    }
}

impl AsRef<FileBase> for FileReader {
    fn as_ref(&self) -> &FileBase {
        &self.base
    }
}

impl AsMut<FileBase> for FileReader {
    fn as_mut(&mut self) -> &mut FileBase {
        &mut self.base
    }
}

fn base_definition() -> TypeDefinition<FileBase> {
    TypeDefinition::<FileBase>::new("base")
        .closing_method("close", |this: &mut FileBase, (): ()| {
            this.close()?;
            Ok(())
        })
        .method("good", |this: &mut FileBase, (): ()| Ok(this.good()))
        .method("is_open", |this: &mut FileBase, (): ()| Ok(this.is_open()))
        .method("eof", |this: &mut FileBase, (): ()| Ok(this.eof()))
}

/// Build the `file` module; relative paths resolve against `root`
pub fn module(root: Option<PathBuf>) -> Module {
    let base = base_definition();

    let writer_root = root.clone();
    let writer = TypeDefinition::<FileWriter>::new("writer")
        .constructor(move |(path,): (Option<String>,)| {
            let mut writer = FileWriter::new(writer_root.clone());
            if let Some(path) = path {
                writer.open(&path)?;
            }
            Ok(writer)
        })
        .inherit(&base)
        .method("open", |this: &mut FileWriter, (path,): (String,)| this.open(&path))
        .method_variadic("print", |this: &mut FileWriter, args: &[MarshaledValue]| {
            this.print(args)
        })
        .method_variadic("println", |this: &mut FileWriter, args: &[MarshaledValue]| {
            this.println(args)
        });

    let reader_root = root.clone();
    let reader = TypeDefinition::<FileReader>::new("reader")
        .constructor(move |(path,): (String,)| {
            let mut reader = FileReader::new(reader_root.clone());
            reader.open(&path)?;
            Ok(reader)
        })
        .inherit(&base)
        .method("open", |this: &mut FileReader, (path,): (String,)| this.open(&path))
        .method("getln", |this: &mut FileReader, (): ()| this.getln());

    let rename_root = root.clone();
    let mkdir_root = root;

    Module::new("file")
        .with_type(writer)
        .with_type(reader)
        .with_function(NativeFunction::new(
            "rename",
            move |_bridge: &Bridge, (src, dst): (String, String)| {
                let root = rename_root.as_deref();
                Ok(std::fs::rename(resolve(root, &src), resolve(root, &dst)).is_ok())
            },
        ))
        .with_function(NativeFunction::new(
            "mkdir",
            move |_bridge: &Bridge, (path,): (String,)| {
                Ok(std::fs::create_dir_all(resolve(mkdir_root.as_deref(), &path)).is_ok())
            },
        ))
}

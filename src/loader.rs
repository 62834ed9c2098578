//! Kernel source lookup: working directory first, then the data directory.

use std::{fs::File, io::Read, path::PathBuf};

use log::debug;

use crate::error::SourceError;

pub struct KernelLoader {
    /// `None` follows the process's current directory at load time.
    working_dir: Option<PathBuf>,
    data_dir: PathBuf,
}

impl KernelLoader {
    /// Resolves against the process's current working directory, falling back to `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: None,
            data_dir: data_dir.into(),
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn load(&self, filename: &str) -> Result<String, SourceError> {
        let first = match &self.working_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        };
        let candidates = [first, self.data_dir.join(filename)];

        for path in &candidates {
            let mut file = match File::open(path) {
                Ok(file) => file,
                Err(err) => {
                    debug!("Kernel not at {}: {}", path.display(), err);
                    continue;
                }
            };

            let mut source = String::new();
            file.read_to_string(&mut source)
                .map_err(|source| SourceError::Unreadable {
                    path: path.clone(),
                    source,
                })?;

            debug!("Loaded kernel from {}", path.display());
            return Ok(source);
        }

        Err(SourceError::NotFound {
            filename: filename.to_owned(),
            cwd: self.current_dir(),
        })
    }

    fn current_dir(&self) -> PathBuf {
        if let Some(dir) = &self.working_dir {
            return dir.clone();
        }

        match std::env::current_dir() {
            Ok(dir) => dir,
            Err(err) => {
                debug!("Current working directory is unavailable: {}", err);
                PathBuf::from(".")
            }
        }
    }
}

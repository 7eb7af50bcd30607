use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use tracing::debug;

use crate::error::{Error, ErrorKind};

/// Reads at most `max_len` bytes of UTF-8 source text from `reader`.
pub(crate) fn read_source<R: Read>(reader: R, name: &str, max_len: usize) -> Result<String, Error> {
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX).saturating_add(1);

    let mut buf = Vec::new();
    reader
        .take(limit)
        .read_to_end(&mut buf)
        .map_err(|err| {
            Error::from_kind(ErrorKind::ReadFile {
                name: name.to_owned(),
                err,
            })
        })?;

    if buf.len() > max_len {
        return Err(Error::from_kind(ErrorKind::FileTooLarge {
            name: name.to_owned(),
            max: max_len,
        }));
    }

    debug!(file = name, len = buf.len(), "read source");
    String::from_utf8(buf).map_err(|_| {
        Error::from_kind(ErrorKind::FileInvalidUtf8 {
            name: name.to_owned(),
        })
    })
}

/// Opens and reads the file at `path`.
pub(crate) fn open(path: &Path, max_len: usize) -> Result<String, Error> {
    let map_io_err = |err: io::Error| -> Error {
        Error::from_kind(ErrorKind::OpenFile {
            path: path.to_owned(),
            err,
        })
    };

    let file = fs::File::open(path).map_err(map_io_err)?;
    let metadata = file.metadata().map_err(map_io_err)?;

    let name = path.display().to_string();
    if metadata.len() > u64::try_from(max_len).unwrap_or(u64::MAX) {
        return Err(Error::from_kind(ErrorKind::FileTooLarge {
            name,
            max: max_len,
        }));
    }

    read_source(file, &name, max_len)
}

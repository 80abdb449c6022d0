//! Cgroup v1 freezer channel
//!
//! Used in place of a low frequency when the configured low value is 0: the
//! LOW phase suspends every task in the group instead of slowing the cores.
//! Unlike the frequency channels every failure here is fatal, since a group
//! left in an unknown freeze state cannot be recovered by the next phase.

use crate::error::{Error, FreezerOp};
use log::{debug, trace};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

pub const FREEZER_STATE: &str = "freezer.state";
pub const FROZEN: &str = "FROZEN";
pub const THAWED: &str = "THAWED";

pub struct CgroupFreezeChannel {
    path: PathBuf,
    file: Option<File>,
    frozen: bool,
    dry_run: bool,
}

impl CgroupFreezeChannel {
    /// Open `<cgroup>/freezer.state` for writing
    pub fn open(cgroup: &Path, dry_run: bool) -> Result<Self, Error> {
        let path = cgroup.join(FREEZER_STATE);
        let file = if dry_run {
            debug!("DRY-RUN: would open {}", path.display());
            None
        } else {
            let f = OpenOptions::new()
                .write(true)
                .open(&path)
                .map_err(|e| Error::Freezer {
                    op: FreezerOp::Open,
                    reason: format!("{}: {}", path.display(), e),
                })?;
            Some(f)
        };
        Ok(CgroupFreezeChannel {
            path,
            file,
            frozen: false,
            dry_run,
        })
    }

    pub fn freeze(&mut self) -> Result<(), Error> {
        self.write(FROZEN, FreezerOp::Freeze)?;
        self.frozen = true;
        Ok(())
    }

    pub fn thaw(&mut self) -> Result<(), Error> {
        self.write(THAWED, FreezerOp::Thaw)?;
        self.frozen = false;
        Ok(())
    }

    /// Whether the last successful write froze the group
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn close(&mut self) {
        if self.file.take().is_some() {
            trace!("cgroup: closed {}", self.path.display());
        }
    }

    fn write(&self, token: &str, op: FreezerOp) -> Result<(), Error> {
        if self.dry_run {
            trace!("DRY-RUN: would write '{}' to {}", token, self.path.display());
            return Ok(());
        }
        let file = self.file.as_ref().ok_or_else(|| Error::Freezer {
            op,
            reason: format!("{} is closed", self.path.display()),
        })?;
        match file.write_at(token.as_bytes(), 0) {
            Ok(n) if n == token.len() => Ok(()),
            Ok(n) => Err(Error::Freezer {
                op,
                reason: format!("short write ({} of {} bytes)", n, token.len()),
            }),
            Err(e) => Err(Error::Freezer {
                op,
                reason: format!("{}: {}", self.path.display(), e),
            }),
        }
    }
}

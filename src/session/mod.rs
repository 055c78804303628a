//! Channel session: the call protocol a cache framework drives.
//!
//! One session owns a read handle and a write handle on one cache file.
//! Writing goes `open -> (write_header, write_channel_name, write_*_array)* -> close`,
//! reading goes `open -> (find_channel_name | read_channel_name, read_array_size, read_*_array)* -> close`.
//!
//! Channels are addressed as `<owner>_<channel>`. The owner names the
//! fluid node the data comes from, the channel suffix names the layer.
//! `resolution` and `offset` are never stored as layers: they are answered
//! from the layers' grid size and from the `"Offset"` file metadata.

pub mod time;

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, trace, warn};

pub use time::{frame_file_name, frame_from_path, FRAME_MARKER};

use crate::codec::{
    array_size, channel_id, compose, decode, encode, field_names, fields_resolution, load_field, BoundsCheck,
    ChannelId, ChannelKind, ChannelShape, FieldEncoding, SessionConfig, Source,
};
use crate::field::FieldMeta;
use crate::scene::{FluidNode, NodeRepository, DYNAMIC_OFFSET_ATTRS};
use crate::store::{Field3dInputFile, Field3dOutputFile, FieldInput, FieldOutput};
use crate::util::{DVec3, Error, Result, Sample};

/// File extension of cache files.
pub const CACHE_EXTENSION: &str = "f3d";

/// File metadata key of the dynamic offset.
pub const OFFSET_KEY: &str = "Offset";

/// File metadata key of the informational string.
pub const INFO_KEY: &str = "Info";

pub const INFO_TEXT: &str = "File generated by Maya";

/// Stored offset meaning "no offset was written". Opening such a file fails.
pub const OFFSET_SENTINEL: [f32; 3] = [-999.999, -999.999, -999.999];

// ============================================================================
// Access mode
// ============================================================================

/// How a session opens its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    /// Mode from the host framework's integer code: 0 read, 1 write, 2 read-write.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            2 => Ok(Self::ReadWrite),
            _ => Err(Error::open_failure(
                PathBuf::new(),
                format!("access mode {} is not defined", code),
            )),
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::ReadWrite => 2,
        }
    }

    #[inline]
    pub const fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[inline]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Counters for conditions that succeed silently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Header or array writes skipped because the current channel had no owner.
    pub empty_owner_skips: u64,
}

// ============================================================================
// Session
// ============================================================================

/// A cache session over one file at a time.
///
/// Each `open` starts from fresh store handles; nothing carries over
/// from a previous file except the current channel name.
pub struct ChannelSession<R, I = Field3dInputFile, O = Field3dOutputFile>
where
    R: NodeRepository,
    I: FieldInput + Default,
    O: FieldOutput + Default,
{
    repo: R,
    config: SessionConfig,
    input: I,
    output: O,
    mode: Option<AccessMode>,
    path: Option<PathBuf>,
    current: String,
    offset: [f32; 3],
    names: Option<Vec<String>>,
    diagnostics: Diagnostics,
}

impl<R> ChannelSession<R>
where
    R: NodeRepository,
{
    /// A closed session over the default disk container.
    pub fn new(repo: R, config: SessionConfig) -> Self {
        Self::with_store(repo, config)
    }
}

impl<R, I, O> ChannelSession<R, I, O>
where
    R: NodeRepository,
    I: FieldInput + Default,
    O: FieldOutput + Default,
{
    /// A closed session over any store implementation.
    pub fn with_store(repo: R, config: SessionConfig) -> Self {
        Self {
            repo,
            config,
            input: I::default(),
            output: O::default(),
            mode: None,
            path: None,
            current: String::new(),
            offset: [0.0; 3],
            names: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    /// Read handle of the open file.
    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn mode(&self) -> Option<AccessMode> {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Channel id the next header, array or size call applies to.
    pub fn current_channel(&self) -> &str {
        &self.current
    }

    /// Dynamic offset read at open or computed by the last header write.
    pub fn offset(&self) -> [f32; 3] {
        self.offset
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// File extension of the caches this session reads and writes.
    pub fn extension(&self) -> &'static str {
        CACHE_EXTENSION
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open `path`. Read modes require the `"Offset"` file metadata;
    /// write modes create (and truncate) the file.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: AccessMode) -> Result<()> {
        let path = path.as_ref();

        // Replacing the handles finalizes whatever the old ones held.
        self.input = I::default();
        self.output = O::default();
        self.output.set_compression(self.config.compression);
        self.names = None;
        self.mode = None;
        self.offset = [0.0; 3];
        self.input.set_read_mode(self.config.read_mode);

        if mode.reads() {
            // The write half below truncates the same path, so read-write
            // input must not stay mapped.
            let opened = if mode.writes() {
                self.input.open_detached(path)
            } else {
                self.input.open(path)
            };
            if let Err(e) = opened {
                error!(path = %path.display(), error = %e, "opening cache failed");
                return Err(as_open_failure(path, e));
            }

            let offset = self.input.metadata().vec_float_or(OFFSET_KEY, OFFSET_SENTINEL);
            if offset == OFFSET_SENTINEL {
                error!(path = %path.display(), "cache has no offset metadata");
                return Err(Error::open_failure(path, "missing \"Offset\" metadata"));
            }
            self.offset = offset;
            debug!(path = %path.display(), "opened in read mode");
        }

        if mode.writes() {
            if let Err(e) = self.output.create(path, true) {
                error!(path = %path.display(), error = %e, "creating cache failed");
                return Err(as_open_failure(path, e));
            }
            info!(path = %path.display(), "writing cache");
        }

        self.mode = Some(mode);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Close both handles. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.input.close();
        self.mode = None;
        self.output.close()
    }

    pub fn is_valid(&self) -> bool {
        self.mode.is_some()
    }

    /// Reopen the current file for reading, restarting channel iteration.
    pub fn rewind(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NotOpen)?;
        self.open(path, AccessMode::Read)
    }

    fn require_read(&self) -> Result<()> {
        match self.mode {
            None => Err(Error::NotOpen),
            Some(m) if !m.reads() => Err(Error::WriteOnly),
            Some(_) => Ok(()),
        }
    }

    fn require_write(&self) -> Result<()> {
        match self.mode {
            None => Err(Error::NotOpen),
            Some(m) if !m.writes() => Err(Error::ReadOnly),
            Some(_) => Ok(()),
        }
    }

    fn skip_empty_owner(&mut self, operation: &'static str) {
        self.diagnostics.empty_owner_skips += 1;
        warn!(operation, channel = %self.current, "channel has no owner, nothing written");
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    /// Store the owner's dynamic offset and the info string as file metadata.
    ///
    /// The owner comes from the current channel. Missing `dynamicOffset*`
    /// attributes count as zero (auto-resize off).
    pub fn write_header(&mut self) -> Result<()> {
        self.require_write()?;

        let id = ChannelId::parse(&self.current);
        if !id.has_owner() {
            self.skip_empty_owner("write_header");
            return Ok(());
        }

        let Some(node) = self.repo.find_node(id.owner) else {
            error!(owner = id.owner, "fluid node not found");
            return Err(Error::NotFound(id.owner.to_string()));
        };
        let offset = DYNAMIC_OFFSET_ATTRS.map(|attr| node.float_attribute(attr).unwrap_or(0.0) as f32);
        self.offset = offset;

        let meta = self.output.metadata_mut();
        meta.set_str(INFO_KEY, INFO_TEXT);
        meta.set_vec_float(OFFSET_KEY, offset);
        self.output.flush_global_metadata()?;

        debug!(owner = id.owner, ?offset, "wrote header");
        Ok(())
    }

    /// Set the channel the following writes apply to. Any name is accepted.
    pub fn write_channel_name(&mut self, name: &str) {
        self.current = name.to_string();
    }

    /// Write the current channel. The channel data is taken from the owner
    /// node; `array` only carries the host's call shape.
    pub fn write_float_array(&mut self, array: &[f32]) -> Result<()> {
        trace!(len = array.len(), "write_float_array");
        self.write_array()
    }

    pub fn write_double_array(&mut self, array: &[f64]) -> Result<()> {
        trace!(len = array.len(), "write_double_array");
        self.write_array()
    }

    fn write_array(&mut self) -> Result<()> {
        self.require_write()?;

        let id = ChannelId::parse(&self.current);
        if !id.has_owner() {
            self.skip_empty_owner("write_array");
            return Ok(());
        }

        let Some(kind) = id.kind() else {
            error!(channel = id.channel, "unknown channel");
            return Err(Error::TypeUnsupported(id.channel.to_string()));
        };
        if kind.is_pseudo() {
            trace!(channel = id.channel, "derived channel, not stored");
            return Ok(());
        }

        let Some(node) = self.repo.find_node(id.owner) else {
            error!(owner = id.owner, "fluid node not found");
            return Err(Error::NotFound(id.owner.to_string()));
        };

        let mapping = compose(
            node.world_transform(),
            node.dimensions(),
            DVec3::from(self.offset.map(f64::from)),
        );
        let encoding = FieldEncoding::for_write(kind, self.config.storage)?;
        let source = match kind.shape() {
            ChannelShape::Scalar => Source::Scalar(node.scalar_channel(kind)),
            _ => Source::Vector(node.vector_channel(kind)),
        };

        let field = encode(encoding, FieldMeta::new(id.owner, id.channel, mapping), node.resolution(), source)
            .inspect_err(|e| error!(channel = id.channel, error = %e, "encoding channel failed"))?;
        self.output.write_layer(&field.to_layer())?;

        debug!(channel = id.channel, %encoding, "wrote channel");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Succeeds if the file is open.
    pub fn read_header(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::NotOpen)
        }
    }

    /// Make `name` current if the file holds its channel. `resolution` and
    /// `offset` always exist.
    pub fn find_channel_name(&mut self, name: &str) -> Result<()> {
        self.require_read()?;

        let id = ChannelId::parse(name);
        if id.kind().is_some_and(ChannelKind::is_pseudo) {
            self.current = name.to_string();
            return Ok(());
        }

        if !field_names(&self.input).iter().any(|n| n == id.channel) {
            error!(channel = id.channel, "channel not found in cache");
            return Err(Error::NotFound(id.channel.to_string()));
        }

        self.current = name.to_string();
        debug!(channel = id.channel, "found channel");
        Ok(())
    }

    /// Next channel of the open file, `None` once all were returned.
    ///
    /// The list is built on the first call after `open` or `rewind`, for
    /// the owner of the current channel: every stored layer, then
    /// `offset`, then `resolution`.
    pub fn read_channel_name(&mut self) -> Result<Option<String>> {
        self.require_read()?;

        if self.names.is_none() {
            let owner = ChannelId::parse(&self.current).owner.to_string();
            let mut stack = vec![
                channel_id(&owner, ChannelKind::Resolution.name()),
                channel_id(&owner, ChannelKind::Offset.name()),
            ];
            stack.extend(field_names(&self.input).iter().map(|n| channel_id(&owner, n)));
            self.names = Some(stack);
        }

        match self.names.as_mut().and_then(Vec::pop) {
            Some(name) => {
                debug!(channel = %name, "next channel");
                self.current.clone_from(&name);
                Ok(Some(name))
            }
            None => {
                debug!("no more channels");
                Ok(None)
            }
        }
    }

    /// Number of values the current channel reads into.
    pub fn read_array_size(&self) -> Result<usize> {
        self.require_read()?;

        let id = ChannelId::parse(&self.current);
        let Some(kind) = id.kind() else {
            error!(channel = id.channel, "unknown channel");
            return Err(Error::TypeUnsupported(id.channel.to_string()));
        };
        if kind.is_pseudo() {
            return Ok(3);
        }
        Ok(array_size(kind.shape(), fields_resolution(&self.input)))
    }

    /// Read the current channel into `dst`, resized to `size` values.
    pub fn read_float_array(&self, dst: &mut Vec<f32>, size: usize) -> Result<()> {
        self.read_array(dst, size)
    }

    pub fn read_double_array(&self, dst: &mut Vec<f64>, size: usize) -> Result<()> {
        self.read_array(dst, size)
    }

    fn read_array<D: Sample>(&self, dst: &mut Vec<D>, size: usize) -> Result<()> {
        self.require_read()?;

        let id = ChannelId::parse(&self.current);
        let Some(kind) = id.kind() else {
            error!(channel = id.channel, "unknown channel");
            return Err(Error::TypeUnsupported(id.channel.to_string()));
        };

        dst.clear();
        dst.resize(size, D::default());

        match kind {
            ChannelKind::Resolution => {
                let res = fields_resolution(&self.input).to_array();
                self.put_triple(id.channel, dst, res.map(|v| v as f64))
            }
            ChannelKind::Offset => self.put_triple(id.channel, dst, self.offset.map(f64::from)),
            _ => {
                let field = load_field(&self.input, id.channel)?;
                let encoding = field.encoding();
                if encoding.shape() != kind.shape() {
                    error!(channel = id.channel, %encoding, "stored encoding does not fit the channel");
                    return Err(Error::TypeUnsupported(format!("{} stored as {}", id.channel, encoding)));
                }
                debug!(channel = id.channel, %encoding, size, "reading channel");
                decode(&field, dst, self.config.bounds)
            }
        }
    }

    fn put_triple<D: Sample>(&self, channel: &str, dst: &mut [D], values: [f64; 3]) -> Result<()> {
        let len = dst.len();
        for (index, v) in values.into_iter().enumerate() {
            match dst.get_mut(index) {
                Some(slot) => *slot = D::from_f64(v),
                None if self.config.bounds == BoundsCheck::Strict => {
                    return Err(Error::IndexOutOfBounds {
                        channel: channel.to_string(),
                        index,
                        len,
                    })
                }
                None => trace!(channel, index, "value past end of array skipped"),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------------

    /// Frame of the open file, from its name.
    pub fn read_time(&self) -> Result<i64> {
        let path = self.path.as_deref().ok_or(Error::NotOpen)?;
        frame_from_path(path).ok_or_else(|| {
            debug!(path = %path.display(), "no frame number in file name");
            Error::NotFound(format!("frame number in {}", path.display()))
        })
    }

    /// Each file holds a single time step, so the next time is the file's own.
    pub fn read_next_time(&self) -> Result<i64> {
        self.read_time()
    }

    /// Times are implied by file names; nothing is written.
    pub fn write_time(&mut self, _frame: i64) -> Result<()> {
        Ok(())
    }

    /// Find `frame` exactly, checking the current position and then once
    /// more after a rewind.
    pub fn find_time(&mut self, frame: i64) -> Result<i64> {
        if self.read_time().ok() == Some(frame) {
            return Ok(frame);
        }
        self.rewind()?;
        match self.read_time()? {
            found if found == frame => Ok(found),
            found => {
                debug!(frame, found, "time not in cache");
                Err(Error::NotFound(format!("frame {}", frame)))
            }
        }
    }
}

fn as_open_failure(path: &Path, e: Error) -> Error {
    match e {
        Error::OpenFailure { .. } => e,
        other => Error::open_failure(path, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FluidContainer, SceneGraph};
    use crate::util::Resolution;

    fn scene() -> SceneGraph {
        SceneGraph::new().with(
            FluidContainer::new("fluid1", Resolution::new(2, 1, 1))
                .with_scalar(ChannelKind::Density, vec![0.25, 0.75])
                .with_attribute("dynamicOffsetZ", 3.0),
        )
    }

    #[test]
    fn test_access_mode_codes() {
        for mode in [AccessMode::Read, AccessMode::Write, AccessMode::ReadWrite] {
            assert_eq!(AccessMode::from_code(mode.code()).unwrap(), mode);
        }
        assert!(matches!(AccessMode::from_code(7), Err(Error::OpenFailure { .. })));
        assert!(AccessMode::ReadWrite.reads() && AccessMode::ReadWrite.writes());
        assert!(!AccessMode::Read.writes());
        assert!(!AccessMode::Write.reads());
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut session = ChannelSession::new(scene(), SessionConfig::default());
        assert!(!session.is_valid());
        assert!(matches!(session.read_array_size(), Err(Error::NotOpen)));
        assert!(matches!(session.write_header(), Err(Error::NotOpen)));
        assert!(matches!(session.rewind(), Err(Error::NotOpen)));
        assert!(matches!(session.read_time(), Err(Error::NotOpen)));
        session.close().unwrap();
        assert_eq!(session.extension(), "f3d");
    }

    #[test]
    fn test_mode_guards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fluid1Frame1.f3d");
        let mut session = ChannelSession::new(scene(), SessionConfig::default());

        session.open(&path, AccessMode::Write).unwrap();
        assert!(matches!(session.read_channel_name(), Err(Error::WriteOnly)));
        session.write_channel_name("fluid1_density");
        session.write_header().unwrap();
        session.write_float_array(&[]).unwrap();
        session.close().unwrap();
        session.close().unwrap();

        session.open(&path, AccessMode::Read).unwrap();
        assert!(matches!(session.write_header(), Err(Error::ReadOnly)));
        assert_eq!(session.offset(), [0.0, 0.0, 3.0]);
        assert_eq!(session.read_time().unwrap(), 1);
        session.close().unwrap();
    }

    #[test]
    fn test_read_write_reuses_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fluid1Frame2.f3d");
        let mut session = ChannelSession::new(scene(), SessionConfig::default());

        session.open(&path, AccessMode::Write).unwrap();
        session.write_channel_name("fluid1_density");
        session.write_header().unwrap();
        session.write_float_array(&[]).unwrap();
        session.close().unwrap();

        // Input is read in full before the output truncates the file.
        session.open(&path, AccessMode::ReadWrite).unwrap();
        session.find_channel_name("fluid1_density").unwrap();
        let mut values = Vec::new();
        session.read_float_array(&mut values, 2).unwrap();
        assert_eq!(values, vec![0.25, 0.75]);
        session.write_header().unwrap();
        session.write_float_array(&[]).unwrap();
        session.close().unwrap();

        session.open(&path, AccessMode::Read).unwrap();
        session.find_channel_name("fluid1_density").unwrap();
        session.read_float_array(&mut values, 2).unwrap();
        assert_eq!(values, vec![0.25, 0.75]);
    }

    #[test]
    fn test_pseudo_channel_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fluid1Frame3.f3d");
        let mut session = ChannelSession::new(scene(), SessionConfig::default());
        session.open(&path, AccessMode::Write).unwrap();
        session.write_channel_name("fluid1_density");
        session.write_header().unwrap();
        session.close().unwrap();

        session.open(&path, AccessMode::Read).unwrap();
        session.find_channel_name("fluid1_offset").unwrap();
        let mut values = Vec::new();
        assert!(matches!(
            session.read_float_array(&mut values, 2),
            Err(Error::IndexOutOfBounds { index: 2, len: 2, .. })
        ));

        let mut fast = ChannelSession::new(scene(), SessionConfig::default().with_bounds(BoundsCheck::Fast));
        fast.open(&path, AccessMode::Read).unwrap();
        fast.find_channel_name("fluid1_offset").unwrap();
        fast.read_float_array(&mut values, 2).unwrap();
        assert_eq!(values, vec![0.0, 0.0]);
    }
}

//! Frame numbers recovered from cache file names.
//!
//! Nothing time-related is stored inside a cache file. One file holds one
//! time step and its frame is part of the name: `fluidShape1Frame12.f3d`.

use std::path::Path;

/// Marker preceding the frame number in a cache file name.
pub const FRAME_MARKER: &str = "Frame";

/// Frame number following the last [`FRAME_MARKER`] in the file name of
/// `path`. `None` when there is no marker or no digits after it.
pub fn frame_from_path(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    let (_, tail) = name.rsplit_once(FRAME_MARKER)?;
    let end = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    tail[..end].parse().ok()
}

/// Cache file name for `base` at `frame`.
pub fn frame_file_name(base: &str, frame: i64, extension: &str) -> String {
    format!("{}{}{}.{}", base, FRAME_MARKER, frame, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_path() {
        assert_eq!(frame_from_path(Path::new("/cache/fluidShape1Frame12.f3d")), Some(12));
        assert_eq!(frame_from_path(Path::new("fluidFrame0.f3d")), Some(0));
        assert_eq!(frame_from_path(Path::new("FrameA/Frame3Frame45.f3d")), Some(45));
        assert_eq!(frame_from_path(Path::new("fluidFrame7")), Some(7));
    }

    #[test]
    fn test_frame_missing() {
        assert_eq!(frame_from_path(Path::new("fluid12.f3d")), None);
        assert_eq!(frame_from_path(Path::new("fluidFrame.f3d")), None);
        assert_eq!(frame_from_path(Path::new("Frame9/fluid.f3d")), None);
        assert_eq!(frame_from_path(Path::new("")), None);
    }

    #[test]
    fn test_file_name_parses_back() {
        let name = frame_file_name("fluidShape1", 24, "f3d");
        assert_eq!(name, "fluidShape1Frame24.f3d");
        assert_eq!(frame_from_path(Path::new(&name)), Some(24));
    }
}

//! JSON-lines battle artifacts: a header line, then one line per frame

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{FrameRenderer, RenderError, RenderHeader};
use crate::game::snapshot::FrameSnapshot;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Header(&'a RenderHeader),
    Frame(&'a FrameSnapshot),
}

/// Default renderer writing `battle_<n>.jsonl`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesRenderer;

impl JsonLinesRenderer {
    fn write_lines(header: &RenderHeader, frames: &[FrameSnapshot], path: &Path) -> Result<(), RenderError> {
        let file = File::create(path).map_err(|e| RenderError::io(path, e))?;
        let mut out = BufWriter::new(file);

        serde_json::to_writer(&mut out, &Line::Header(header))?;
        out.write_all(b"\n").map_err(|e| RenderError::io(path, e))?;
        for frame in frames {
            serde_json::to_writer(&mut out, &Line::Frame(frame))?;
            out.write_all(b"\n").map_err(|e| RenderError::io(path, e))?;
        }
        out.flush().map_err(|e| RenderError::io(path, e))
    }
}

impl FrameRenderer for JsonLinesRenderer {
    fn extension(&self) -> &str {
        "jsonl"
    }

    fn render(&self, header: &RenderHeader, frames: &[FrameSnapshot], out: &Path) -> Result<(), RenderError> {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
        }

        // A half-written artifact never takes the final name
        let mut tmp = out.as_os_str().to_owned();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        if let Err(err) = Self::write_lines(header, frames, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, out).map_err(|e| RenderError::io(out, e))?;

        debug!(path = %out.display(), frames = frames.len(), "Rendered battle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RosterCard;
    use crate::store::scratch_dir;

    fn frame(index: u64) -> FrameSnapshot {
        FrameSnapshot {
            index,
            alive: 1,
            sprite_size: 140.0,
            fighters: Vec::new(),
            events: Vec::new(),
            champion: None,
        }
    }

    #[test]
    fn test_writes_header_then_frames() {
        let dir = scratch_dir();
        let out = dir.join("battles/battle_1.jsonl");
        let header = RenderHeader::new(
            1,
            30,
            1080,
            1920,
            vec![RosterCard {
                username: "ana".into(),
                has_avatar: false,
                effect: String::new(),
            }],
        );
        JsonLinesRenderer
            .render(&header, &[frame(0), frame(1)], &out)
            .unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "header");
        assert_eq!(lines[0]["battle_number"], 1);
        assert_eq!(lines[0]["fighters"][0]["username"], "ana");
        assert_eq!(lines[2]["kind"], "frame");
        assert_eq!(lines[2]["index"], 1);
    }
}

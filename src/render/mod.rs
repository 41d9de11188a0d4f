//! Rendering boundary - frame descriptions in, battle artifact out

pub mod archive;
pub mod jsonl;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::game::snapshot::FrameSnapshot;

pub use archive::BattleArchive;
pub use jsonl::JsonLinesRenderer;

/// Overlay text above the arena
pub const TITLE_LINES: [&str; 2] = ["Making my followers fight until", "only one is left"];

/// One roster entry as the renderer sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterCard {
    pub username: String,
    pub has_avatar: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub effect: String,
}

/// Per-artifact metadata written before the frames
#[derive(Debug, Clone, Serialize)]
pub struct RenderHeader {
    pub battle_number: u64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub title: Vec<String>,
    pub caption: String,
    pub fighters: Vec<RosterCard>,
}

impl RenderHeader {
    pub fn new(battle_number: u64, fps: u32, width: u32, height: u32, fighters: Vec<RosterCard>) -> Self {
        Self {
            battle_number,
            fps,
            width,
            height,
            title: TITLE_LINES.iter().map(|line| line.to_string()).collect(),
            caption: format!("Day {battle_number}: {} followers", fighters.len()),
            fighters,
        }
    }
}

/// Turns a finished battle's frames into an artifact on disk
pub trait FrameRenderer {
    /// File extension of the artifacts this renderer writes
    fn extension(&self) -> &str;

    fn render(&self, header: &RenderHeader, frames: &[FrameSnapshot], out: &Path) -> Result<(), RenderError>;
}

/// Render errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RenderError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_caption() {
        let cards = vec![
            RosterCard {
                username: "ana".into(),
                has_avatar: true,
                effect: String::new(),
            },
            RosterCard {
                username: "bo".into(),
                has_avatar: false,
                effect: "Arc Zap".into(),
            },
        ];
        let header = RenderHeader::new(7, 30, 1080, 1920, cards);
        assert_eq!(header.caption, "Day 7: 2 followers");
        assert_eq!(header.title.len(), 2);
    }
}

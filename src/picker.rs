//! File picker modal: the `*.csv` files in a directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ratatui::widgets::ListState;

pub struct FilePicker {
    pub dir: PathBuf,
    pub entries: Vec<PathBuf>,
    pub state: ListState,
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

impl FilePicker {
    pub fn open(dir: &Path) -> io::Result<Self> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_csv(path))
            .collect();
        entries.sort();

        let mut state = ListState::default();
        if !entries.is_empty() {
            state.select(Some(0));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
            state,
        })
    }

    pub fn nav_down(&mut self) {
        let len = self.entries.len();
        if len > 0 {
            let i = self.state.selected().unwrap_or(0);
            self.state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn nav_up(&mut self) {
        let i = self.state.selected().unwrap_or(0);
        self.state.select(Some(i.saturating_sub(1)));
    }

    pub fn selected(&self) -> Option<&PathBuf> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }
}

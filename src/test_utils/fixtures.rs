//! Filesystem fixtures and a recording notifier.

use anyhow::Result;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::notify::Notifier;

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// A small bot-like application tree with a `.git` directory and caches.
pub fn sample_app_tree(root: &Path) {
    write_tree(
        root,
        &[
            ("main.py", "from core import bot\nbot.run()\n"),
            ("core/bot.py", "VERSION = '2.3.0'\n"),
            ("plugins/Update_Plugin/plugin.json", "{\"name\": \"update\"}\n"),
            ("plugins/__pycache__/cache.cpython-311.pyc", "\u{0}\u{1}"),
            (".git/HEAD", "ref: refs/heads/main\n"),
        ],
    );
}

/// Notifier that keeps every message it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// `(target, message)` pairs in send order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, target: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((target.to_string(), message.to_string()));
        Ok(())
    }
}

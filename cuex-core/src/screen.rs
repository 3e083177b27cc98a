/// What the display should show; the renderer turns this into pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// "Press ENTER to start Epoch N", shown before each epoch
    BeginPrompt { epoch: usize, total: usize },
    /// Plain background between cues
    #[default]
    Neutral,
    /// Full-screen cue
    Cue,
    Complete,
}

impl Screen {
    pub fn is_cue(&self) -> bool {
        matches!(self, Screen::Cue)
    }

    pub fn prompt_text(&self) -> Option<String> {
        match self {
            Screen::BeginPrompt { epoch, .. } => Some(format!("Press ENTER to start Epoch {epoch}")),
            Screen::Complete => Some("Experiment complete. Thank you!".to_string()),
            Screen::Neutral | Screen::Cue => None,
        }
    }

    pub fn progress_text(&self) -> Option<String> {
        match self {
            Screen::BeginPrompt { epoch, total } => Some(format!("Epoch {epoch}/{total}")),
            _ => None,
        }
    }
}

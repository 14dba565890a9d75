use plotshelf_core::{LoadRequest, format_filename};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Title, loader and visibility of the displayed image.
///
/// Each `show` bumps the generation; only the completion carrying the latest
/// generation changes what is displayed.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    generation: u64,
    path: Option<String>,
    title: String,
    status: ViewStatus,
}

impl Viewer {
    pub fn show(&mut self, path: &str) -> LoadRequest {
        self.generation += 1;
        self.path = Some(path.to_string());
        self.title = format_filename(path);
        self.status = ViewStatus::Loading;
        tracing::debug!(generation = self.generation, path, "image requested");
        LoadRequest {
            generation: self.generation,
            path: path.to_string(),
        }
    }

    /// Applies a finished load. Returns `false` for stale generations.
    pub fn complete(&mut self, generation: u64, outcome: Result<(), String>) -> bool {
        if generation != self.generation || self.status != ViewStatus::Loading {
            tracing::debug!(
                generation,
                latest = self.generation,
                "discarding stale image load"
            );
            return false;
        }
        self.status = match outcome {
            Ok(()) => ViewStatus::Ready,
            Err(err) => {
                tracing::warn!(path = self.path.as_deref().unwrap_or(""), %err, "image load failed");
                ViewStatus::Failed(err)
            }
        };
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == ViewStatus::Loading
    }

    /// 0.0 while loading or failed, 1.0 once the image is ready.
    pub fn opacity(&self) -> f32 {
        if self.status == ViewStatus::Ready {
            1.0
        } else {
            0.0
        }
    }
}

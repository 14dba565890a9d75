use std::time::Duration;

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

/// Terminal identification read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub term: Option<String>,
    pub kitty_window: bool,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let iterm = non_empty("ITERM_SESSION_ID").is_some()
            || non_empty("TERM_PROGRAM").is_some_and(|v| v.contains("iTerm"))
            || non_empty("LC_TERMINAL").is_some_and(|v| v.contains("iTerm"));
        Self {
            term: non_empty("TERM"),
            kitty_window: non_empty("KITTY_WINDOW_ID").is_some(),
            iterm,
            tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    fn term_is_kitty(&self) -> bool {
        self.term
            .as_deref()
            .is_some_and(|term| term.starts_with("xterm-kitty"))
    }

    /// Querying stdio only pays off when a graphics protocol is likely.
    pub fn should_query_stdio(&self) -> bool {
        self.kitty_window || self.term_is_kitty() || self.iterm || self.tmux
    }

    pub fn query_timeout(&self) -> Duration {
        if self.kitty_window || self.term_is_kitty() || self.iterm {
            Duration::from_millis(1500)
        } else if self.tmux {
            // Passthrough may be off; don't stall startup.
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }

    pub fn kitty_supported(&self, picker: &Picker) -> bool {
        if self.iterm {
            return false;
        }
        self.kitty_window
            || picker
                .capabilities()
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty))
    }
}

/// Builds the picker used to turn decoded charts into terminal images.
pub(crate) fn detect_picker(hints: &TerminalHints) -> Picker {
    if hints.tmux {
        ensure_tmux_allow_passthrough();
    }

    let mut picker = if hints.should_query_stdio() {
        let options = QueryStdioOptions {
            timeout: hints.query_timeout(),
            text_sizing_protocol: false,
        };
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|err| {
            tracing::warn!(%err, "terminal graphics query failed; using halfblocks");
            Picker::halfblocks()
        })
    } else {
        Picker::halfblocks()
    };

    picker.set_background_color(image::Rgba([255u8, 255u8, 255u8, 255u8]));
    if hints.kitty_supported(&picker) {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    tracing::info!(protocol = protocol_label(&picker), "image protocol selected");
    picker
}

fn ensure_tmux_allow_passthrough() {
    // Needed for graphics passthrough; old tmux versions simply refuse.
    let _ = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}

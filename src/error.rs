use std::io;

/// Fatal errors raised while building a switch. Anything reaching `main` through
/// this type is reported and the process exits nonzero (spec §6 exit codes, §7
/// error handling design). Per-frame problems never surface here -- they're
/// dropped silently by the forwarding/STP engines instead.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed config: {0}")]
    ConfigParse(String),

    #[error("link layer initialization failed: {0}")]
    LinkInit(String),
}

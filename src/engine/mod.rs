pub(crate) mod backend;
pub(crate) mod ffmpeg;
pub(crate) mod program;

pub(crate) mod audio;
pub(crate) mod builder;
pub(crate) mod visual;

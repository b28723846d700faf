use std::path::PathBuf;

use thiserror::Error;

use crate::shaders::ShaderStage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Help(String),
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to save image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("image {0} has no pixels")]
    EmptyImage(PathBuf),
    #[error("image is {width}x{height}, textures are limited to {limit}x{limit}")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },
    #[error("no Metal device found")]
    NoDevice,
    #[error("error in '{name}'({stage}):\n{log}")]
    ShaderCompile {
        name: String,
        stage: ShaderStage,
        log: String,
    },
    #[error("'{name}' has no entry point '{entry}': {log}")]
    MissingEntryPoint {
        name: String,
        entry: String,
        log: String,
    },
    #[error("failed to link '{name}':\n{log}")]
    ProgramLink { name: String, log: String },
    #[error("work-group of {requested} threads exceeds the device limit of {limit}")]
    WorkgroupTooLarge { requested: u64, limit: u64 },
    #[error("command buffer failed: {0}")]
    CommandBuffer(String),
    #[error("read back {actual} bytes, expected {expected}")]
    Readback { expected: usize, actual: usize },
    #[error("window error: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window handle error: {0}")]
    WindowHandle(#[from] winit::raw_window_handle::HandleError),
    #[error("window is not backed by an AppKit view")]
    NotAppKit,
    #[error("GPU compute requires Metal, which is only available on macOS")]
    Unsupported,
}

pub mod file;
pub mod files;

pub use files::ServerPaths;

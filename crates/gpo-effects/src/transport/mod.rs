//! Policy object transports

mod filesystem;

pub use filesystem::FilesystemTransport;

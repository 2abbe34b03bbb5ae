//! Non-persistent directory backends

mod memory;

pub use memory::InMemoryUserDirectory;

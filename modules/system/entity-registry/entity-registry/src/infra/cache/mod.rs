//! Cache backends holding derived registry state.

mod in_memory;

pub use in_memory::InMemoryCacheBackend;

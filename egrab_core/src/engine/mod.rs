pub mod engine;
pub mod engine_iterator;
pub mod release;

pub mod code_filter;
pub mod time;
pub mod token_cache;

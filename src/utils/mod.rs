pub mod constants;
pub mod slug;
pub mod string_utils;

pub use constants::*;
pub use slug::slug_for_url;
pub use string_utils::{safe_truncate_boundary, safe_truncate_chars};

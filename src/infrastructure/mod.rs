//! 基础设施层：持有本地持久化资源

pub mod session_store;

pub use session_store::{Clock, SessionStore};

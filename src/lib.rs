pub mod accounts;
pub mod delegation;
pub mod engine;
pub mod export;
pub mod graph;
pub mod io;
pub mod report;
pub mod sessions;

pub mod prelude {
    pub use crate::accounts::{Category, HighValueAccounts};
    pub use crate::engine::Engine;
    pub use crate::graph::Document;
}

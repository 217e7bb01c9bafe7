#![allow(dead_code, unused_imports)]
pub mod app;
pub mod clock;
pub mod fakes;
pub mod test_db;

pub use app::*;
pub use clock::*;
pub use fakes::*;
pub use test_db::*;

pub mod serve;
pub mod tools;

pub mod cat;
pub mod dog;

pub mod copy;
pub mod inspect;
pub mod plan;
pub mod tables;

pub mod archives;
pub mod token;

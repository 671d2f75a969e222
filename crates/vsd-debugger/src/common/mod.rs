pub mod codepage;
pub mod debugger;
pub mod process;
pub mod session;

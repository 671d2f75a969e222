mod exceptions;
mod lifecycle;
mod output;

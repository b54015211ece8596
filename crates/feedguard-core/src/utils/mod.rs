pub mod date_parser;
pub mod deadline;
pub mod hasher;
pub mod operator;

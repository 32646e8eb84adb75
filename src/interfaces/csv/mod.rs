pub mod command_reader;
pub mod result_writer;

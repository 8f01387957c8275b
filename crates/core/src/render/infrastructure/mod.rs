pub mod atomic_file_writer;

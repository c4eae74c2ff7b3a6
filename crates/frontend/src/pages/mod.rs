pub mod tactical;

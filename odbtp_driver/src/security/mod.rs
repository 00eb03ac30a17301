pub mod connect_string;

pub use connect_string::ConnectString;

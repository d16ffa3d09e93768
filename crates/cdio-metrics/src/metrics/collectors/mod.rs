pub mod http;
pub mod price;
pub mod process;
pub mod system;
pub mod watch;

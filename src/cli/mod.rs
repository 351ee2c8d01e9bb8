pub mod config;
pub mod init;
pub mod pick;
pub mod play;

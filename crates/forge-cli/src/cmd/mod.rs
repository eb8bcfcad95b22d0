pub mod auto;
pub mod history;
pub mod init;
pub mod phase;
pub mod provider;
pub mod run;
pub mod session;
pub mod status;

pub mod client;
pub mod cmd;
pub mod error;
pub mod node;
pub mod routing;
pub mod server;
pub mod storage_engine;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

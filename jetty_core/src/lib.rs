//!
//! Access to Jetty
//!
//! Provides the shared pieces every Jetty connector is built from: the
//! resource/entitlement/grant model, resumable pagination state, the
//! syncer and connector traits, and project configuration.
#![deny(missing_docs)]

pub use connectors::{Connector, ResourceSyncer};
pub use jetty::fetch_credentials;

pub mod connectors;
pub mod jetty;
pub mod logging;
pub mod project;

#[macro_export]
/// Time the code inside the macro. Write the elapsed time to debug logs.
/// Derived from https://notes.iveselov.info/programming/time_it-a-case-study-in-rust-macros
macro_rules! log_runtime {
    ($context:literal, $($tt:tt)+) => {
        {
            $crate::logging::debug!("{}: starting", $context);
            let timer = std::time::Instant::now();
            let x =
            $(
                $tt
            )+;
            $crate::logging::debug!("{}: {:?}", $context, timer.elapsed());
            x
        }
    }
}

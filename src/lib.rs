pub mod config;
pub mod fetch;
pub mod geo;
pub mod gtfs;
pub mod output;
pub mod parser;
pub mod query;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

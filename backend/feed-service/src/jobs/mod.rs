pub mod fanout_worker;

pub use fanout_worker::{channel, FanoutDispatcher, FanoutWorker};

pub mod store;
pub mod time;

pub use store::{
    Direction, Document, DocumentStore, FieldUpdate, Fields, Patch, Query, Snapshot, StoreError,
    Subscription,
};
pub use time::TimeProvider;

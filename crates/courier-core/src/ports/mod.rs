//! Ports.

pub mod clock;
pub mod document_store;
pub mod event_sink;
pub mod id_generator;
pub mod identity;
pub mod user_directory;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_store::{
    Document, DocumentStore, Filter, StoreError, TxFn, TxOutcome, TxStep,
};
pub use self::event_sink::{EventSink, RecordingEventSink, TracingEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::identity::{IdentityError, IdentityProvider};
pub use self::user_directory::{DirectoryError, UserDirectory};

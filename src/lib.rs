//! An in-memory RDF quad store with a streaming Turtle/N-Triples reader and a
//! structured writer: one hash-consed node pool, one indexed in-memory model
//! with multiple statement orderings for pattern queries, one resumable
//! streaming reader, and one writer that reconstructs Turtle's `;`/`,`/
//! `[...]`/`(...)` sugar from a stream of events.
//!
//! The store, reader, and writer all communicate through a single
//! polymorphic [`Sink`] trait: the reader produces events from bytes, the
//! writer consumes events and produces bytes, and the model can be both
//! populated (via [`Inserter`]) and queried (via [`Model::describe`])
//! through the same interface.

pub mod alloc;
pub mod canon;
pub mod caret;
pub mod env;
pub mod error;
pub mod filter;
pub mod log;
pub mod model;
pub mod node;
pub mod nodes;
pub mod reader;
pub mod sink;
pub mod writer;
mod xsd;

pub use alloc::{Allocator, FaultingAllocator, SystemAllocator};
pub use canon::CanonSink;
pub use caret::Caret;
pub use env::Environment;
pub use error::{Result, Status};
pub use filter::FilterSink;
pub use log::{LogLevel, LogRecord, Logger, LoggerHandle};
pub use model::{Cursor, Inserter, Model, ModelFlags, Order};
pub use node::{Literal, NodeKind, NodeSpec, NumericForm, Term};
pub use nodes::{NodeId, Nodes};
pub use reader::{ByteSource, ChunkedSource, Reader, SliceSource, Syntax};
pub use sink::{Event, FnSink, Sink, Statement, StatementFlags};
pub use writer::{Writer, WriterBuilder};

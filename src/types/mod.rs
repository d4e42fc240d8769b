//! 类型模块：定义中继请求的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of what the relay sends to the remote
//! text-processing service.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Mode`] | Processing mode (simplify, summarize, analyze) |
//! | [`OptionsBag`] | Per-request options derived from user settings |
//! | [`ProcessRequest`] | Immutable `(mode, text, options)` triple |
//!
//! ## Example
//!
//! ```rust
//! use neurodrive_relay::types::{Mode, OptionsBag, ProcessRequest};
//!
//! let options = OptionsBag::new("8th grade", true, "general");
//! let request = ProcessRequest::new(Mode::Summarize, "The quick brown fox...", options);
//! assert_eq!(request.mode(), Mode::Summarize);
//! ```

pub mod request;

pub use request::{Mode, OptionsBag, ProcessRequest};

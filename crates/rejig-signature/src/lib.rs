//! Validation of proposed signature types by stub compilation.
//!
//! Given replacement parameter/return types as literal source text, this
//! crate answers, per slot: is the text syntactically a type, and does it
//! resolve in the focal method's context, qualifying short names when a
//! unique candidate exists, and reporting structured `NotFound`/`Ambiguous`
//! outcomes otherwise. See [`TypeContextChecker`].

mod checker;
mod stub;

pub use checker::{
    MethodContext, SlotError, SlotKind, SlotOk, SlotResult, SlotState, TypeContextChecker,
    TypeSlot, STUB_METHOD_NAME,
};
pub use stub::{ScratchUnit, StubTypeContext};

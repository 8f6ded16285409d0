//! Refactoring entrypoints for rejig.
//!
//! Today this crate exposes validation for Change Method Signature plans
//! (`validate_signature_change`): per-slot type checking through the stub
//! context plus a constraint-solver pass over the affected bodies. Edit
//! materialization stays with the host IDE.

mod change_signature;

pub use change_signature::{
    validate_signature_change, ParameterOperation, SignatureChange, SignatureChangeError,
    SignatureConflict, ValidatedChange,
};
